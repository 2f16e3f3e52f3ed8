//! Critical strike resolution.

use rand::Rng;

use crate::stats::CombatStats;

/// Damage after the critical check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CritRoll {
    pub amount: i32,
    pub critical: bool,
}

/// Roll for a critical strike.
///
/// Net chance is the attacker's crit chance minus the target's resistance,
/// clamped to `[0, 100]`. On success the amount scales by the attacker's
/// crit bonus.
pub fn apply_critical(
    attacker: &CombatStats,
    target: &CombatStats,
    damage: i32,
    rng: &mut impl Rng,
) -> CritRoll {
    let chance = (attacker.crit_chance - target.crit_resist).clamp(0, 100);
    if chance > 0 && rng.gen_range(1..=100) <= chance {
        CritRoll {
            amount: damage * attacker.crit_bonus_pct as i32 / 100,
            critical: true,
        }
    } else {
        CritRoll {
            amount: damage,
            critical: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn resisted_crit_never_triggers() {
        let attacker = CombatStats {
            crit_chance: 40,
            ..CombatStats::default()
        };
        let target = CombatStats {
            crit_resist: 40,
            ..CombatStats::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..200 {
            let roll = apply_critical(&attacker, &target, 10, &mut rng);
            assert!(!roll.critical);
            assert_eq!(roll.amount, 10);
        }
    }

    #[test]
    fn guaranteed_crit_applies_bonus() {
        let attacker = CombatStats {
            crit_chance: 100,
            crit_bonus_pct: 200,
            ..CombatStats::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let roll = apply_critical(&attacker, &CombatStats::default(), 10, &mut rng);
        assert!(roll.critical);
        assert_eq!(roll.amount, 20);
    }
}
