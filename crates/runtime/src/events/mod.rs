//! Scheduler event types and the topic-based bus.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::{CombatEvent, EndReason, Topic};
