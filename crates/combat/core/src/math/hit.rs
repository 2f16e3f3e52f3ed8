//! Hit chance and defensive roll resolution.

use rand::Rng;

use crate::config::CombatConfig;
use crate::stats::CombatStats;

/// Why an attack failed to land.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MissReason {
    /// The base accuracy roll failed.
    Wide,
    Evaded,
    Parried,
    Blocked,
}

impl MissReason {
    /// Message shown to the attacker for this failure.
    pub fn describe(&self, attacker: &str, target: &str) -> String {
        match self {
            MissReason::Wide => format!("{attacker} swings wide of {target}."),
            MissReason::Evaded => format!("{target} evades {attacker}'s attack."),
            MissReason::Parried => format!("{target} parries {attacker}'s attack."),
            MissReason::Blocked => format!("{target} blocks {attacker}'s attack."),
        }
    }
}

/// Outcome of a hit check. A hit requires the base roll to succeed and all
/// three defensive rolls to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitOutcome {
    Hit,
    Miss(MissReason),
}

impl HitOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, HitOutcome::Hit)
    }
}

/// Check whether an attack lands.
///
/// Base success chance is `base + accuracy + bonus`, clamped to
/// `[HIT_CHANCE_MIN, HIT_CHANCE_MAX]`. Defensive rolls run strictly in
/// evade → parry → block order; the first that triggers decides the single
/// failure message the attacker sees.
pub fn check_hit(
    attacker: &CombatStats,
    target: &CombatStats,
    bonus: i32,
    config: &CombatConfig,
    rng: &mut impl Rng,
) -> HitOutcome {
    let chance = (config.base_hit_chance + attacker.accuracy + bonus)
        .clamp(CombatConfig::HIT_CHANCE_MIN, CombatConfig::HIT_CHANCE_MAX);

    if rng.gen_range(1..=100) > chance {
        return HitOutcome::Miss(MissReason::Wide);
    }

    // Order is load-bearing: it selects which defense message fires.
    let defenses = [
        (target.evade, MissReason::Evaded),
        (target.parry, MissReason::Parried),
        (target.block, MissReason::Blocked),
    ];
    for (defense_chance, reason) in defenses {
        if defense_chance > 0 && rng.gen_range(1..=100) <= defense_chance {
            return HitOutcome::Miss(reason);
        }
    }

    HitOutcome::Hit
}
