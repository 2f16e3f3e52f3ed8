//! World seam consumed by the round pipeline.
//!
//! Room topology, spectators, and hostility decisions live in the host.
//! Every method defaults to "nothing out there", so an engine driven with
//! [`NullWorld`] behaves as a sealed arena.

use crate::actor::{ActorHandle, ActorId, LocationId};

/// Read-mostly view of the world surrounding a combat session.
///
/// Methods are called from inside the round pipeline, which a scheduler may
/// run while holding its own locks. Implementations must not call back into
/// the scheduler that drives them (e.g. `combat_for`, `queue_action`);
/// defer such work to after the round instead.
pub trait WorldOracle: Send + Sync {
    /// Offer a summary line to everyone observing `location`. Participants
    /// always receive their own copy directly; this reaches bystanders.
    fn broadcast(&self, _location: LocationId, _message: &str) {}

    /// Actors in `location` that turn hostile when `fallen` drops, and
    /// should be pulled into the fight against `survivors`.
    fn hostile_bystanders(
        &self,
        _location: LocationId,
        _fallen: ActorId,
        _survivors: &[ActorId],
    ) -> Vec<ActorHandle> {
        Vec::new()
    }
}

/// World with no spectators and no reinforcements.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullWorld;

impl WorldOracle for NullWorld {}
