//! One running combat session.

use serde::{Deserialize, Serialize};

use combat_core::{ActorHandle, ActorId, CombatConfig, CombatEngine, RoundReport, WorldOracle};

/// Identifier of a combat instance within one manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CombatId(pub u64);

impl std::fmt::Display for CombatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "combat-{}", self.0)
    }
}

/// An engine bound to an instance id and a lifecycle flag.
#[derive(Debug)]
pub struct CombatInstance {
    id: CombatId,
    engine: CombatEngine,
    ended: bool,
}

impl CombatInstance {
    pub(crate) fn new(id: CombatId, config: CombatConfig, seed: Option<u64>) -> Self {
        let engine = match seed {
            // Derive a per-instance stream from the manager seed.
            Some(seed) => CombatEngine::with_seed(config, seed.wrapping_add(id.0)),
            None => CombatEngine::new(config),
        };
        Self {
            id,
            engine,
            ended: false,
        }
    }

    pub fn id(&self) -> CombatId {
        self.id
    }

    pub fn engine(&self) -> &CombatEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut CombatEngine {
        &mut self.engine
    }

    /// An instance is worth keeping while it has participants and has not
    /// been ended.
    pub fn is_valid(&self) -> bool {
        !self.ended && !self.engine.participants().is_empty()
    }

    /// An instance keeps ticking while two living combatants remain.
    pub fn is_active(&self) -> bool {
        !self.ended && self.engine.is_active()
    }

    /// Register combatants, giving each newcomer without a stored target
    /// an initial opponent so the fight engages from round one.
    pub fn add_combatants(&mut self, combatants: &[ActorHandle]) -> Vec<ActorId> {
        let mut joined = Vec::new();
        for combatant in combatants {
            if self.engine.add_participant(combatant.clone()) {
                joined.push(combatant.id());
            }
        }
        let roster = self.engine.participants();
        for combatant in combatants {
            if combatant.target().is_none()
                && let Some(opponent) = roster
                    .iter()
                    .find(|other| other.id() != combatant.id() && other.alive())
            {
                combatant.set_target(Some(opponent.id()));
            }
        }
        joined
    }

    pub fn process_round(&mut self, world: &dyn WorldOracle) -> RoundReport {
        self.engine.process_round(world)
    }

    /// Tear the instance down, releasing every remaining participant.
    pub(crate) fn end(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        for id in self.engine.participant_ids() {
            self.engine.remove_participant(id);
        }
        tracing::debug!(combat = %self.id, "combat instance ended");
    }
}
