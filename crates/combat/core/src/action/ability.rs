//! Cost/effect contract for skills and spells.
//!
//! Ability *content* (what "Fireball" is, who may learn it, cooldown
//! bookkeeping) lives outside this subsystem. The engine only consumes this
//! contract: what it costs, how far it reaches, and what it rolls.

use crate::config::CombatConfig;
use crate::math::{DamageSource, DamageType};

/// The slice of an ability definition the combat engine needs.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilitySpec {
    pub name: String,
    pub source: DamageSource,
    pub damage_type: DamageType,
    pub stamina_cost: i32,
    pub mana_cost: i32,
    /// 0 requires a shared location; anything higher also reaches targets
    /// whose location differs.
    pub range: u32,
    /// Secondary ordering key within an initiative tie.
    pub priority: i32,
    /// Added to the base hit chance when this ability is used.
    pub hit_bonus: i32,
}

impl AbilitySpec {
    /// A physical skill: stamina-fueled, melee range.
    pub fn skill(name: impl Into<String>, source: DamageSource) -> Self {
        Self {
            name: name.into(),
            source,
            damage_type: DamageType::Physical,
            stamina_cost: CombatConfig::DEFAULT_RESOURCE_REGEN,
            mana_cost: 0,
            range: 0,
            priority: 0,
            hit_bonus: 0,
        }
    }

    /// A spell: mana-fueled, reaches beyond the caster's location.
    pub fn spell(name: impl Into<String>, source: DamageSource, damage_type: DamageType) -> Self {
        Self {
            name: name.into(),
            source,
            damage_type,
            stamina_cost: 0,
            mana_cost: CombatConfig::DEFAULT_RESOURCE_REGEN,
            range: 1,
            priority: 0,
            hit_bonus: 0,
        }
    }

    pub fn with_costs(mut self, stamina: i32, mana: i32) -> Self {
        self.stamina_cost = stamina;
        self.mana_cost = mana;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_hit_bonus(mut self, bonus: i32) -> Self {
        self.hit_bonus = bonus;
        self
    }
}
