//! Event payloads published by the scheduler.

use combat_core::ActorId;
use serde::{Deserialize, Serialize};

use crate::instance::CombatId;

/// Topics for event routing.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Combat creation, merging, and termination.
    Lifecycle,
    /// Per-round results.
    Round,
    /// Combatant defeats, for reward and quest systems.
    Defeat,
}

/// Why a combat instance ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// The fight ran to its natural conclusion.
    Resolved,
    /// Ended by an administrative call.
    Forced,
    /// Folded into another instance.
    Merged,
}

/// Events emitted by [`crate::manager::CombatRoundManager`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CombatEvent {
    CombatStarted {
        combat: CombatId,
        combatants: Vec<ActorId>,
    },
    /// New combatants were pulled into an already-running instance.
    CombatantsMerged {
        combat: CombatId,
        joined: Vec<ActorId>,
    },
    RoundCompleted {
        combat: CombatId,
        round: u32,
        messages: Vec<String>,
        active_fighters: usize,
    },
    ActorDefeated {
        combat: CombatId,
        victim: ActorId,
        victim_name: String,
        attacker: ActorId,
    },
    CombatEnded {
        combat: CombatId,
        reason: EndReason,
    },
}

impl CombatEvent {
    pub fn topic(&self) -> Topic {
        match self {
            CombatEvent::CombatStarted { .. }
            | CombatEvent::CombatantsMerged { .. }
            | CombatEvent::CombatEnded { .. } => Topic::Lifecycle,
            CombatEvent::RoundCompleted { .. } => Topic::Round,
            CombatEvent::ActorDefeated { .. } => Topic::Defeat,
        }
    }
}
