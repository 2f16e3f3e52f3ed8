//! Combat engine façade.
//!
//! Owns the participant registry, the threat table, the round processor,
//! and the session RNG. Hosts construct one engine per combat session and
//! drive it through [`CombatEngine::process_round`]; everything else is
//! bookkeeping around that call.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::action::CombatAction;
use crate::actor::{ActorHandle, ActorId};
use crate::aggro::AggroTracker;
use crate::config::CombatConfig;
use crate::env::WorldOracle;
use crate::error::EngineError;
use crate::math::DamageType;
use crate::round::{DamageProcessor, RoundReport};
use crate::turns::TurnManager;

pub struct CombatEngine {
    turns: TurnManager,
    aggro: AggroTracker,
    processor: DamageProcessor,
    config: CombatConfig,
    rng: ChaCha8Rng,
    round: u32,
}

impl CombatEngine {
    pub fn new(config: CombatConfig) -> Self {
        Self::with_seed(config, rand::random())
    }

    /// Engine with a fixed RNG seed. Two engines built with the same seed
    /// and driven with the same inputs produce identical rounds.
    pub fn with_seed(config: CombatConfig, seed: u64) -> Self {
        Self {
            turns: TurnManager::new(),
            aggro: AggroTracker::new(),
            processor: DamageProcessor::new(),
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            round: 0,
        }
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Rounds processed so far.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn add_participant(&mut self, actor: ActorHandle) -> bool {
        self.turns.add_participant(actor)
    }

    pub fn remove_participant(&mut self, id: ActorId) -> bool {
        self.turns.remove_participant(id)
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.turns.contains(id)
    }

    pub fn participants(&self) -> Vec<ActorHandle> {
        self.turns.handles()
    }

    pub fn participant_ids(&self) -> Vec<ActorId> {
        self.turns.handles().iter().map(|h| h.id()).collect()
    }

    pub fn participant(&self, id: ActorId) -> Option<ActorHandle> {
        self.turns.handle(id)
    }

    /// A session needs two living combatants to keep going.
    pub fn is_active(&self) -> bool {
        self.turns
            .handles()
            .iter()
            .filter(|handle| handle.alive())
            .count()
            >= 2
    }

    /// Accumulated threat of `attacker` against `victim`.
    pub fn threat(&self, victim: ActorId, attacker: ActorId) -> u32 {
        self.aggro.threat(victim, attacker)
    }

    pub fn queue_action(&mut self, actor: ActorId, action: CombatAction) -> Result<u64, EngineError> {
        self.turns.queue_action(actor, action)
    }

    /// Resolve one full round and return its report.
    pub fn process_round(&mut self, world: &dyn WorldOracle) -> RoundReport {
        self.round += 1;
        tracing::debug!(round = self.round, participants = self.turns.len(), "processing round");
        self.processor.process_round(
            &mut self.turns,
            &mut self.aggro,
            &self.config,
            world,
            &mut self.rng,
            self.round,
        )
    }

    /// Distribute the kill reward for `victim` among the contributors still
    /// in the session.
    pub fn award_experience(&mut self, attacker: &ActorHandle, victim: &ActorHandle) {
        let active = self.turns.handles();
        self.aggro.award_experience(attacker, victim, &active, &self.config);
    }

    /// Run full defeat handling for a victim already at zero health:
    /// death hooks, reward distribution, queue purge, retargeting, and
    /// bystander pull-in. Buffered lines go to the victim and every
    /// remaining participant.
    pub fn handle_defeat(
        &mut self,
        world: &dyn WorldOracle,
        victim: &ActorHandle,
        attacker: &ActorHandle,
    ) -> RoundReport {
        let mut report = RoundReport::default();
        self.processor.handle_defeat(
            &mut self.turns,
            &mut self.aggro,
            &self.config,
            world,
            victim,
            attacker,
            &mut report,
        );
        for line in &report.messages {
            victim.send(line);
        }
        for handle in self.turns.handles() {
            for line in &report.messages {
                handle.send(line);
            }
        }
        report
    }

    /// Apply damage from outside the round pipeline (environmental effects,
    /// scripted events). Runs the same threat, low-health, and defeat
    /// handling as an in-round hit. Returns the damage actually dealt.
    pub fn apply_damage(
        &mut self,
        world: &dyn WorldOracle,
        attacker: &ActorHandle,
        target: ActorId,
        amount: i32,
        kind: DamageType,
    ) -> Result<i32, EngineError> {
        let target = self
            .turns
            .handle(target)
            .ok_or(EngineError::ActorNotInCombat(target))?;

        self.aggro.track(&target, attacker);
        let before = target.health();
        let dealt = target.with(|t| t.apply_damage(attacker.id(), amount, kind));

        if target.alive()
            && target.target().is_none()
            && self.turns.contains(attacker.id())
        {
            target.set_target(Some(attacker.id()));
        }

        let after = target.health();
        let threshold = target.max_health() * CombatConfig::LOW_HEALTH_PCT / 100;
        if after > 0 && after <= threshold && before > threshold {
            target.with(|t| t.on_low_health());
        }

        if after <= 0 {
            self.handle_defeat(world, &target, attacker);
        }
        Ok(dealt)
    }
}

impl std::fmt::Debug for CombatEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatEngine")
            .field("round", &self.round)
            .field("participants", &self.turns.len())
            .finish()
    }
}
