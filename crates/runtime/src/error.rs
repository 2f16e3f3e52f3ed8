//! Scheduler error types.

use combat_core::ActorId;

use crate::instance::CombatId;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("combat {0} not found")]
    CombatNotFound(CombatId),

    #[error("actor {0} is not in combat")]
    ActorNotInCombat(ActorId),

    #[error("combat needs at least two combatants")]
    NoCombatants,

    #[error(transparent)]
    Engine(#[from] combat_core::EngineError),
}
