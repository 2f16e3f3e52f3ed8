//! Engine contract errors.
//!
//! Expected game-flow branches (misses, failed validation, dead targets)
//! are values, not errors; see [`crate::action::ActionRejection`] and
//! [`crate::math::HitOutcome`]. The variants here mark caller mistakes.

use crate::actor::ActorId;

/// Errors raised by [`crate::engine::CombatEngine`] mutation calls.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("actor {0} is not a participant of this combat")]
    ActorNotInCombat(ActorId),

    #[error("action actor {action_actor} does not match queue owner {owner}")]
    ActorMismatch {
        action_actor: ActorId,
        owner: ActorId,
    },
}
