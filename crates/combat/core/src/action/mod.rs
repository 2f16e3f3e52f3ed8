//! Queued combat intent and its resolution.
//!
//! An action validates against the state it will run in, then resolves into
//! exactly one [`CombatResult`]. Validation failures are reported to the
//! acting actor as messages, never raised as errors; see
//! [`ActionRejection`].

mod ability;

pub use ability::AbilitySpec;

use rand::Rng;

use crate::actor::{ActorHandle, ActorId, StatusFlags};
use crate::config::CombatConfig;
use crate::math::{
    DamageType, HitLocation, HitOutcome, WeaponSpec, apply_critical, calculate_damage, check_hit,
};

/// Why an action refused to run. Rendered directly to the acting actor.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ActionRejection {
    #[error("You have no target.")]
    MissingTarget,

    #[error("{target} is already down.")]
    TargetDown { target: String },

    #[error("{target} is out of reach.")]
    OutOfRange { target: String },

    #[error("You are too exhausted.")]
    InsufficientStamina,

    #[error("You don't have the mana.")]
    InsufficientMana,

    #[error("You are stunned and cannot act.")]
    Stunned,
}

/// Everything resolution needs besides the action itself.
pub struct ResolveContext<'a> {
    pub actor: &'a ActorHandle,
    pub target: Option<&'a ActorHandle>,
    pub config: &'a CombatConfig,
}

/// Produced exactly once per successfully resolved action.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatResult {
    pub actor: ActorId,
    pub target: Option<ActorId>,
    pub message: String,
    pub damage: i32,
    pub damage_type: DamageType,
    pub location: Option<HitLocation>,
    pub critical: bool,
}

/// Basic weapon swing.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttackAction {
    pub actor: ActorId,
    pub target: Option<ActorId>,
}

/// Raise guard for the round.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DefendAction {
    pub actor: ActorId,
}

/// Skill use or spell cast against a target.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityAction {
    pub actor: ActorId,
    pub target: Option<ActorId>,
    pub spec: AbilitySpec,
}

/// A queued, resolvable unit of combat intent.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CombatAction {
    Attack(AttackAction),
    Defend(DefendAction),
    UseSkill(AbilityAction),
    CastSpell(AbilityAction),
}

impl CombatAction {
    pub fn attack(actor: ActorId, target: ActorId) -> Self {
        Self::Attack(AttackAction {
            actor,
            target: Some(target),
        })
    }

    pub fn defend(actor: ActorId) -> Self {
        Self::Defend(DefendAction { actor })
    }

    pub fn use_skill(actor: ActorId, target: ActorId, spec: AbilitySpec) -> Self {
        Self::UseSkill(AbilityAction {
            actor,
            target: Some(target),
            spec,
        })
    }

    pub fn cast_spell(actor: ActorId, target: ActorId, spec: AbilitySpec) -> Self {
        Self::CastSpell(AbilityAction {
            actor,
            target: Some(target),
            spec,
        })
    }

    pub fn actor(&self) -> ActorId {
        match self {
            CombatAction::Attack(action) => action.actor,
            CombatAction::Defend(action) => action.actor,
            CombatAction::UseSkill(action) | CombatAction::CastSpell(action) => action.actor,
        }
    }

    pub fn target(&self) -> Option<ActorId> {
        match self {
            CombatAction::Attack(action) => action.target,
            CombatAction::Defend(_) => None,
            CombatAction::UseSkill(action) | CombatAction::CastSpell(action) => action.target,
        }
    }

    /// Secondary sort key within an initiative tie.
    pub fn priority(&self) -> i32 {
        match self {
            CombatAction::Attack(_) => 0,
            CombatAction::Defend(_) => CombatConfig::DEFEND_PRIORITY,
            CombatAction::UseSkill(action) | CombatAction::CastSpell(action) => {
                action.spec.priority
            }
        }
    }

    pub fn stamina_cost(&self) -> i32 {
        match self {
            CombatAction::Attack(_) | CombatAction::Defend(_) => 0,
            CombatAction::UseSkill(action) | CombatAction::CastSpell(action) => {
                action.spec.stamina_cost
            }
        }
    }

    pub fn mana_cost(&self) -> i32 {
        match self {
            CombatAction::Attack(_) | CombatAction::Defend(_) => 0,
            CombatAction::UseSkill(action) | CombatAction::CastSpell(action) => {
                action.spec.mana_cost
            }
        }
    }

    pub fn range(&self) -> u32 {
        match self {
            CombatAction::Attack(_) | CombatAction::Defend(_) => 0,
            CombatAction::UseSkill(action) | CombatAction::CastSpell(action) => action.spec.range,
        }
    }

    pub fn requires_target(&self) -> bool {
        !matches!(self, CombatAction::Defend(_))
    }

    /// Check pre-conditions without mutating anything.
    pub fn validate(&self, ctx: &ResolveContext<'_>) -> Result<(), ActionRejection> {
        if ctx
            .actor
            .statuses()
            .contains(StatusFlags::STUNNED)
        {
            return Err(ActionRejection::Stunned);
        }

        if self.requires_target() {
            let target = ctx.target.ok_or(ActionRejection::MissingTarget)?;
            if !target.alive() {
                return Err(ActionRejection::TargetDown {
                    target: target.name(),
                });
            }
            let in_reach = match (ctx.actor.location(), target.location()) {
                (Some(here), Some(there)) => here == there || self.range() > 0,
                // Locationless actors fight in abstract space.
                _ => true,
            };
            if !in_reach {
                return Err(ActionRejection::OutOfRange {
                    target: target.name(),
                });
            }
        }

        let (stamina, max_stamina, mana, max_mana) = ctx
            .actor
            .with(|a| (a.stamina(), a.max_stamina(), a.mana(), a.max_mana()));
        // Costs against an absent pool always pass.
        if max_stamina > 0 && stamina < self.stamina_cost() {
            return Err(ActionRejection::InsufficientStamina);
        }
        if max_mana > 0 && mana < self.mana_cost() {
            return Err(ActionRejection::InsufficientMana);
        }

        Ok(())
    }

    /// Resolve into a [`CombatResult`]. Deducts resource costs; damage is
    /// applied by the caller, not here.
    pub fn resolve(&self, ctx: &ResolveContext<'_>, rng: &mut impl Rng) -> CombatResult {
        self.pay_costs(ctx);

        match self {
            CombatAction::Defend(action) => {
                ctx.actor.with(|a| a.add_status(StatusFlags::DEFENDING));
                CombatResult {
                    actor: action.actor,
                    target: None,
                    message: format!("{} takes a defensive stance.", ctx.actor.name()),
                    damage: 0,
                    damage_type: DamageType::Physical,
                    location: None,
                    critical: false,
                }
            }
            CombatAction::Attack(_) => {
                let weapon = ctx.actor.with(|a| a.wielded_weapon());
                self.resolve_strike(ctx, weapon.as_ref(), 0, None, rng)
            }
            CombatAction::UseSkill(action) | CombatAction::CastSpell(action) => {
                let weapon = WeaponSpec::new(action.spec.name.clone(), action.spec.source.clone())
                    .with_damage_type(action.spec.damage_type);
                self.resolve_strike(
                    ctx,
                    Some(&weapon),
                    action.spec.hit_bonus,
                    Some(action.spec.name.as_str()),
                    rng,
                )
            }
        }
    }

    fn pay_costs(&self, ctx: &ResolveContext<'_>) {
        let stamina_cost = self.stamina_cost();
        let mana_cost = self.mana_cost();
        if stamina_cost > 0 || mana_cost > 0 {
            ctx.actor.with(|a| {
                if a.max_stamina() > 0 {
                    a.set_stamina(a.stamina() - stamina_cost);
                }
                if a.max_mana() > 0 {
                    a.set_mana(a.mana() - mana_cost);
                }
            });
        }
    }

    fn resolve_strike(
        &self,
        ctx: &ResolveContext<'_>,
        weapon: Option<&WeaponSpec>,
        hit_bonus: i32,
        ability_name: Option<&str>,
        rng: &mut impl Rng,
    ) -> CombatResult {
        let actor_id = self.actor();
        let attacker_name = ctx.actor.name();
        let attacker_stats = ctx.actor.stats();

        // validate() guarantees a live target for strikes.
        let target = ctx.target.expect("strike resolved without a target");
        let target_name = target.name();
        let target_stats = target.stats();

        let default_type = weapon.map(|w| w.damage_type).unwrap_or(DamageType::Physical);

        match check_hit(&attacker_stats, &target_stats, hit_bonus, ctx.config, rng) {
            HitOutcome::Miss(reason) => CombatResult {
                actor: actor_id,
                target: Some(target.id()),
                message: reason.describe(&attacker_name, &target_name),
                damage: 0,
                damage_type: default_type,
                location: None,
                critical: false,
            },
            HitOutcome::Hit => {
                let roll = calculate_damage(&attacker_stats, weapon, rng);
                let crit = apply_critical(&attacker_stats, &target_stats, roll.amount, rng);
                let mut message = match ability_name {
                    Some(name) => format!(
                        "{attacker_name}'s {name} strikes {target_name}'s {} for {} damage!",
                        roll.location, crit.amount
                    ),
                    None => format!(
                        "{attacker_name} hits {target_name}'s {} for {} damage!",
                        roll.location, crit.amount
                    ),
                };
                if crit.critical {
                    message = format!("Critical! {message}");
                }
                CombatResult {
                    actor: actor_id,
                    target: Some(target.id()),
                    message,
                    damage: crit.amount,
                    damage_type: roll.damage_type,
                    location: Some(roll.location),
                    critical: crit.critical,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{BasicActor, LocationId};
    use crate::math::DamageSource;
    use crate::stats::CombatStats;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sure_hit_stats() -> CombatStats {
        CombatStats {
            accuracy: 50,
            ..CombatStats::default()
        }
    }

    #[test]
    fn attack_without_target_is_rejected() {
        let actor = BasicActor::builder(1, "hero").into_handle();
        let config = CombatConfig::default();
        let action = CombatAction::Attack(AttackAction {
            actor: actor.id(),
            target: None,
        });
        let ctx = ResolveContext {
            actor: &actor,
            target: None,
            config: &config,
        };
        assert_eq!(action.validate(&ctx), Err(ActionRejection::MissingTarget));
    }

    #[test]
    fn dead_target_is_rejected() {
        let actor = BasicActor::builder(1, "hero").into_handle();
        let target = BasicActor::builder(2, "goblin").health(0).into_handle();
        let config = CombatConfig::default();
        let action = CombatAction::attack(actor.id(), target.id());
        let ctx = ResolveContext {
            actor: &actor,
            target: Some(&target),
            config: &config,
        };
        assert!(matches!(
            action.validate(&ctx),
            Err(ActionRejection::TargetDown { .. })
        ));
    }

    #[test]
    fn melee_needs_shared_location_but_spells_reach_farther() {
        let actor = BasicActor::builder(1, "hero")
            .location(LocationId(1))
            .into_handle();
        let target = BasicActor::builder(2, "goblin")
            .location(LocationId(2))
            .into_handle();
        let config = CombatConfig::default();
        let ctx = ResolveContext {
            actor: &actor,
            target: Some(&target),
            config: &config,
        };

        let melee = CombatAction::attack(actor.id(), target.id());
        assert!(matches!(
            melee.validate(&ctx),
            Err(ActionRejection::OutOfRange { .. })
        ));

        let spell = CombatAction::cast_spell(
            actor.id(),
            target.id(),
            AbilitySpec::spell("magic dart", DamageSource::Fixed(3), DamageType::Arcane)
                .with_costs(0, 0),
        );
        assert_eq!(spell.validate(&ctx), Ok(()));
    }

    #[test]
    fn insufficient_mana_is_rejected_but_absent_pool_passes() {
        let caster = BasicActor::builder(1, "mage").mana(3).into_handle();
        let poolless = BasicActor::builder(3, "golem").into_handle();
        let target = BasicActor::builder(2, "goblin").into_handle();
        let config = CombatConfig::default();
        let spec =
            AbilitySpec::spell("fireball", DamageSource::Fixed(5), DamageType::Fire).with_costs(0, 5);

        let cast = CombatAction::cast_spell(caster.id(), target.id(), spec.clone());
        let ctx = ResolveContext {
            actor: &caster,
            target: Some(&target),
            config: &config,
        };
        assert_eq!(cast.validate(&ctx), Err(ActionRejection::InsufficientMana));

        let cast = CombatAction::cast_spell(poolless.id(), target.id(), spec);
        let ctx = ResolveContext {
            actor: &poolless,
            target: Some(&target),
            config: &config,
        };
        assert_eq!(cast.validate(&ctx), Ok(()));
    }

    #[test]
    fn resolve_deducts_resource_costs() {
        let caster = BasicActor::builder(1, "mage")
            .mana(10)
            .stats(sure_hit_stats())
            .into_handle();
        let target = BasicActor::builder(2, "goblin").into_handle();
        let config = CombatConfig::default();
        let cast = CombatAction::cast_spell(
            caster.id(),
            target.id(),
            AbilitySpec::spell("fireball", DamageSource::Fixed(5), DamageType::Fire)
                .with_costs(0, 4),
        );
        let ctx = ResolveContext {
            actor: &caster,
            target: Some(&target),
            config: &config,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        cast.resolve(&ctx, &mut rng);
        assert_eq!(caster.with(|a| a.mana()), 6);
    }

    #[test]
    fn defend_raises_guard_and_deals_no_damage() {
        let actor = BasicActor::builder(1, "hero").into_handle();
        let config = CombatConfig::default();
        let action = CombatAction::defend(actor.id());
        let ctx = ResolveContext {
            actor: &actor,
            target: None,
            config: &config,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let result = action.resolve(&ctx, &mut rng);
        assert_eq!(result.damage, 0);
        assert!(actor.statuses().contains(StatusFlags::DEFENDING));
    }

    #[test]
    fn stunned_actor_cannot_act() {
        let actor = BasicActor::builder(1, "hero").into_handle();
        actor.with(|a| a.add_status(StatusFlags::STUNNED));
        let target = BasicActor::builder(2, "goblin").into_handle();
        let config = CombatConfig::default();
        let action = CombatAction::attack(actor.id(), target.id());
        let ctx = ResolveContext {
            actor: &actor,
            target: Some(&target),
            config: &config,
        };
        assert_eq!(action.validate(&ctx), Err(ActionRejection::Stunned));
    }
}
