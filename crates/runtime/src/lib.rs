//! Async scheduling layer over `combat-core`.
//!
//! `combat-runtime` hosts running combat sessions: the
//! [`manager::CombatRoundManager`] maps actors to instances, ticks rounds
//! on a tokio timer, and publishes lifecycle, round, and defeat events on
//! a topic-based [`events::EventBus`] for reward, quest, and UI systems.

pub mod error;
pub mod events;
pub mod instance;
pub mod manager;

pub use error::SchedulerError;
pub use events::{CombatEvent, EndReason, EventBus, Topic};
pub use instance::{CombatId, CombatInstance};
pub use manager::{CombatRoundManager, CombatSummary, SchedulerConfig, SchedulerStatus};
