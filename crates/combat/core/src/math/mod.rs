//! Stateless hit, damage, and critical computation.
//!
//! Every function here is a pure mapping from stats and an RNG to a value;
//! nothing in this module touches actors or session state. Feeding the same
//! seeded RNG therefore replays identical rolls.

mod critical;
mod damage;
mod hit;

pub use critical::{CritRoll, apply_critical};
pub use damage::{
    DamageRoll, DamageSource, DamageType, DiceExpr, DiceParseError, HitLocation, WeaponSpec,
    calculate_damage,
};
pub use hit::{HitOutcome, MissReason, check_hit};
