/// Combat configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatConfig {
    /// Base chance (percent) that an attack lands before defensive rolls.
    pub base_hit_chance: i32,

    /// Sort participants by initiative each round. When disabled, join
    /// order is used and initiative only orders the gathered action list.
    pub initiative_ordering: bool,

    /// Upper bound of the random jitter added to initiative each round.
    pub initiative_jitter: i32,

    /// Haste points required per extra attack per round.
    pub haste_per_extra_attack: u32,

    /// Hard cap on attacks a single participant resolves per round.
    pub max_attacks_per_round: u32,

    /// Experience granted per victim level when the victim carries no
    /// explicit reward value.
    pub default_exp_per_level: u32,

    /// Stamina restored to each participant at round start.
    pub stamina_regen: i32,

    /// Mana restored to each participant at round start.
    pub mana_regen: i32,
}

impl CombatConfig {
    // ===== fixed balance constants =====
    /// Hit chance clamp bounds after accuracy and situational bonuses.
    pub const HIT_CHANCE_MIN: i32 = 5;
    pub const HIT_CHANCE_MAX: i32 = 100;

    /// Damage scaling per point of strength / dexterity.
    pub const STRENGTH_SCALE: f32 = 0.05;
    pub const DEXTERITY_SCALE: f32 = 0.02;

    /// Damage formula used when no weapon is wielded.
    pub const UNARMED_FORMULA: &'static str = "1d4";

    /// Minimum share of a group kill reward, as percent of the total.
    pub const MIN_GROUP_SHARE_PCT: u32 = 10;

    /// Health fraction (percent of maximum) below which the low-health
    /// hook fires.
    pub const LOW_HEALTH_PCT: i32 = 25;

    /// Priority of a Defend action relative to the default Attack (0).
    pub const DEFEND_PRIORITY: i32 = 10;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_BASE_HIT_CHANCE: i32 = 85;
    pub const DEFAULT_INITIATIVE_JITTER: i32 = 10;
    pub const DEFAULT_HASTE_PER_EXTRA_ATTACK: u32 = 50;
    pub const DEFAULT_MAX_ATTACKS_PER_ROUND: u32 = 6;
    pub const DEFAULT_EXP_PER_LEVEL: u32 = 25;
    pub const DEFAULT_RESOURCE_REGEN: i32 = 5;

    pub fn new() -> Self {
        Self {
            base_hit_chance: Self::DEFAULT_BASE_HIT_CHANCE,
            initiative_ordering: true,
            initiative_jitter: Self::DEFAULT_INITIATIVE_JITTER,
            haste_per_extra_attack: Self::DEFAULT_HASTE_PER_EXTRA_ATTACK,
            max_attacks_per_round: Self::DEFAULT_MAX_ATTACKS_PER_ROUND,
            default_exp_per_level: Self::DEFAULT_EXP_PER_LEVEL,
            stamina_regen: Self::DEFAULT_RESOURCE_REGEN,
            mana_regen: Self::DEFAULT_RESOURCE_REGEN,
        }
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self::new()
    }
}
