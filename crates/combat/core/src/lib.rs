//! Deterministic turn-based combat logic for a persistent text world.
//!
//! `combat-core` defines the canonical combat rules (actors, actions, hit
//! and damage math, threat tracking, round resolution) and exposes pure
//! APIs reusable by the runtime and offline tools. All session mutation
//! flows through [`engine::CombatEngine`]; the host world plugs in through
//! the [`actor::CombatActor`] and [`env::WorldOracle`] traits.

pub mod action;
pub mod actor;
pub mod aggro;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod math;
pub mod round;
pub mod stats;
pub mod turns;

pub use action::{
    AbilityAction, AbilitySpec, ActionRejection, AttackAction, CombatAction, CombatResult,
    DefendAction, ResolveContext,
};
pub use actor::{ActorHandle, ActorId, BasicActor, CombatActor, LocationId, StatusFlags};
pub use aggro::AggroTracker;
pub use config::CombatConfig;
pub use engine::CombatEngine;
pub use env::{NullWorld, WorldOracle};
pub use error::EngineError;
pub use math::{
    CritRoll, DamageRoll, DamageSource, DamageType, DiceExpr, DiceParseError, HitLocation,
    HitOutcome, MissReason, WeaponSpec, apply_critical, calculate_damage, check_hit,
};
pub use round::{DamageProcessor, Defeat, RoundReport};
pub use stats::CombatStats;
pub use turns::{GatheredActions, Participant, PendingAction, QueuedAction, TurnManager};
