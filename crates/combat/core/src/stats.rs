//! Combat stat snapshot consumed by the math layer.
//!
//! Actors expose a [`CombatStats`] value rather than individual accessors so
//! the engine reads a consistent view once per use. How the host derives
//! these numbers (equipment, buffs, species) is outside this subsystem.

/// Flat snapshot of everything the combat math reads from an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatStats {
    pub level: u32,

    /// Scales total damage dealt.
    pub strength: i32,
    /// Secondary damage scaling.
    pub dexterity: i32,

    /// Flat bonus to the base hit chance.
    pub accuracy: i32,

    // Defensive roll chances, percent. Checked strictly in this order.
    pub evade: i32,
    pub parry: i32,
    pub block: i32,

    /// Critical strike chance, percent.
    pub crit_chance: i32,
    /// Subtracted from an attacker's critical chance.
    pub crit_resist: i32,
    /// Damage multiplier on a critical, percent (150 = +50%).
    pub crit_bonus_pct: u32,

    /// Grants extra attacks per round past each configured threshold.
    pub haste: u32,

    /// Added on top of the base point of threat per engagement.
    pub threat: u32,

    /// Base initiative trait.
    pub initiative: i32,
    /// Initiative contribution from equipment.
    pub initiative_bonus: i32,

    /// Unarmed proficiency, 0-100. Scales bare-handed damage.
    pub unarmed_skill: u32,
}

impl Default for CombatStats {
    fn default() -> Self {
        Self {
            level: 1,
            strength: 0,
            dexterity: 0,
            accuracy: 0,
            evade: 0,
            parry: 0,
            block: 0,
            crit_chance: 0,
            crit_resist: 0,
            crit_bonus_pct: 150,
            haste: 0,
            threat: 0,
            initiative: 0,
            initiative_bonus: 0,
            unarmed_skill: 0,
        }
    }
}
