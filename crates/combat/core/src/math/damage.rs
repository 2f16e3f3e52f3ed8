//! Damage formulas, weapon specs, and hit locations.

use std::collections::BTreeMap;
use std::str::FromStr;

use rand::Rng;
use strum::Display;

use crate::config::CombatConfig;
use crate::stats::CombatStats;

/// Damage type tag carried by every combat result.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DamageType {
    Physical,
    Fire,
    Cold,
    Lightning,
    Poison,
    Arcane,
}

/// Where a blow lands. Each location scales the final amount.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HitLocation {
    Head,
    Torso,
    Arm,
    Leg,
}

impl HitLocation {
    /// (location, selection weight, damage multiplier)
    const TABLE: [(HitLocation, u32, f32); 4] = [
        (HitLocation::Head, 10, 1.5),
        (HitLocation::Torso, 50, 1.0),
        (HitLocation::Arm, 20, 0.8),
        (HitLocation::Leg, 20, 0.9),
    ];

    pub fn multiplier(&self) -> f32 {
        Self::TABLE
            .iter()
            .find(|(location, _, _)| location == self)
            .map(|(_, _, multiplier)| *multiplier)
            .unwrap_or(1.0)
    }

    fn roll(rng: &mut impl Rng) -> HitLocation {
        let total: u32 = Self::TABLE.iter().map(|(_, weight, _)| weight).sum();
        let mut pick = rng.gen_range(0..total);
        for (location, weight, _) in Self::TABLE {
            if pick < weight {
                return location;
            }
            pick -= weight;
        }
        HitLocation::Torso
    }
}

/// Error from parsing a dice formula.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("malformed dice formula {formula:?}")]
pub struct DiceParseError {
    pub formula: String,
}

/// Parsed `NdS`, `NdS+B`, or `NdS-B` roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiceExpr {
    pub count: u32,
    pub sides: u32,
    pub bonus: i32,
}

impl DiceExpr {
    pub fn roll(&self, rng: &mut impl Rng) -> i32 {
        let mut total = self.bonus;
        for _ in 0..self.count {
            if self.sides > 0 {
                total += rng.gen_range(1..=self.sides) as i32;
            }
        }
        total
    }
}

impl FromStr for DiceExpr {
    type Err = DiceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || DiceParseError {
            formula: s.to_owned(),
        };
        let s = s.trim();
        let (dice, bonus) = if let Some((dice, bonus)) = s.split_once('+') {
            (dice, bonus.trim().parse::<i32>().map_err(|_| err())?)
        } else if let Some((dice, penalty)) = s.split_once('-') {
            (dice, -penalty.trim().parse::<i32>().map_err(|_| err())?)
        } else {
            (s, 0)
        };
        let (count, sides) = dice.trim().split_once(['d', 'D']).ok_or_else(err)?;
        let count = count.trim().parse::<u32>().map_err(|_| err())?;
        let sides = sides.trim().parse::<u32>().map_err(|_| err())?;
        if count == 0 || sides == 0 {
            return Err(err());
        }
        Ok(DiceExpr {
            count,
            sides,
            bonus,
        })
    }
}

/// Roll a textual formula, degrading malformed input to zero.
fn roll_formula(formula: &str, rng: &mut impl Rng) -> i32 {
    match formula.parse::<DiceExpr>() {
        Ok(expr) => expr.roll(rng).max(0),
        Err(error) => {
            tracing::warn!(%error, "damage formula rejected, dealing zero");
            0
        }
    }
}

/// How a weapon or ability produces its base amount.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DamageSource {
    /// Always this amount.
    Fixed(i32),
    /// A dice formula such as `"2d6+1"`.
    Formula(String),
    /// Per-type formulas, all rolled and summed. The map's sorted iteration
    /// keeps results independent of construction order.
    ByType(BTreeMap<DamageType, String>),
}

impl DamageSource {
    /// Roll the base amount. For `ByType`, the reported type is the largest
    /// contributor, ties falling to the first in sorted order.
    fn roll(&self, default_type: DamageType, rng: &mut impl Rng) -> (i32, DamageType) {
        match self {
            DamageSource::Fixed(amount) => (*amount, default_type),
            DamageSource::Formula(formula) => (roll_formula(formula, rng), default_type),
            DamageSource::ByType(map) => {
                let mut total = 0;
                let mut dominant: Option<(DamageType, i32)> = None;
                for (damage_type, formula) in map {
                    let rolled = roll_formula(formula, rng);
                    total += rolled;
                    if dominant.is_none_or(|(_, best)| rolled > best) {
                        dominant = Some((*damage_type, rolled));
                    }
                }
                (
                    total,
                    dominant.map(|(damage_type, _)| damage_type).unwrap_or(default_type),
                )
            }
        }
    }
}

/// The contract a wielded weapon exposes to the math layer.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeaponSpec {
    pub name: String,
    pub source: DamageSource,
    pub damage_type: DamageType,
    /// Flat bonus added after the base roll.
    pub bonus: i32,
}

impl WeaponSpec {
    pub fn new(name: impl Into<String>, source: DamageSource) -> Self {
        Self {
            name: name.into(),
            source,
            damage_type: DamageType::Physical,
            bonus: 0,
        }
    }

    pub fn with_damage_type(mut self, damage_type: DamageType) -> Self {
        self.damage_type = damage_type;
        self
    }

    pub fn with_bonus(mut self, bonus: i32) -> Self {
        self.bonus = bonus;
        self
    }
}

/// A fully resolved damage amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageRoll {
    pub amount: i32,
    pub damage_type: DamageType,
    pub location: HitLocation,
}

/// Resolve base damage, scaling, and hit location for one landed blow.
///
/// ```text
/// base   = weapon roll + flat bonus        (unarmed: 1d4 × skill scaling)
/// scaled = base × (1 + STR×0.05 + DEX×0.02)
/// final  = scaled × location multiplier
/// ```
pub fn calculate_damage(
    attacker: &CombatStats,
    weapon: Option<&WeaponSpec>,
    rng: &mut impl Rng,
) -> DamageRoll {
    let (base, damage_type) = match weapon {
        Some(weapon) => {
            let (rolled, damage_type) = weapon.source.roll(weapon.damage_type, rng);
            (rolled + weapon.bonus, damage_type)
        }
        None => {
            let rolled = roll_formula(CombatConfig::UNARMED_FORMULA, rng);
            // Untrained fists land glancing blows; full skill restores the roll.
            let skill = attacker.unarmed_skill.min(100) as f32 / 100.0;
            let scaled = (rolled as f32 * (0.5 + 0.5 * skill)) as i32;
            (scaled, DamageType::Physical)
        }
    };

    let stat_scale = 1.0
        + attacker.strength as f32 * CombatConfig::STRENGTH_SCALE
        + attacker.dexterity as f32 * CombatConfig::DEXTERITY_SCALE;
    let scaled = base.max(0) as f32 * stat_scale.max(0.0);

    let location = HitLocation::roll(rng);
    let amount = (scaled * location.multiplier()).round() as i32;

    DamageRoll {
        amount: amount.max(0),
        damage_type,
        location,
    }
}
