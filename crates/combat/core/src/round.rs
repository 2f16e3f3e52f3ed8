//! One-round resolution pipeline.
//!
//! Drives a full round: start-of-round upkeep, ordered action resolution,
//! defeat handling, environment cleanup, and message delivery. Per-actor
//! failures are reported and skipped; nothing in here escapes to stop the
//! caller's loop.

use std::collections::HashMap;

use rand::Rng;

use crate::action::{CombatResult, ResolveContext};
use crate::actor::{ActorHandle, ActorId};
use crate::aggro::AggroTracker;
use crate::config::CombatConfig;
use crate::env::WorldOracle;
use crate::turns::TurnManager;

/// A combatant going down, for the report and external subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Defeat {
    pub victim: ActorId,
    pub victim_name: String,
    pub attacker: ActorId,
}

/// Everything that happened in one processed round.
#[derive(Clone, Debug, Default)]
pub struct RoundReport {
    pub round: u32,
    pub results: Vec<CombatResult>,
    pub defeats: Vec<Defeat>,
    pub messages: Vec<String>,
    /// Participants still above zero health after cleanup.
    pub active_fighters: usize,
}

/// Executes rounds against a [`TurnManager`] and [`AggroTracker`].
#[derive(Debug, Default)]
pub struct DamageProcessor;

impl DamageProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Resolve one full round.
    pub fn process_round(
        &self,
        turns: &mut TurnManager,
        aggro: &mut AggroTracker,
        config: &CombatConfig,
        world: &dyn WorldOracle,
        rng: &mut impl Rng,
        round: u32,
    ) -> RoundReport {
        let mut report = RoundReport {
            round,
            ..RoundReport::default()
        };
        let mut damage_totals: HashMap<ActorId, (String, i32)> = HashMap::new();

        turns.start_round(config, rng);
        // Snapshot before resolution: the fallen and the disengaging still
        // hear what happened to them this round.
        let mut recipients = turns.handles();
        let gathered = turns.gather_actions(config);
        report.messages.extend(gathered.notices);

        for pending in gathered.actions {
            // The actor may have been defeated or removed earlier this round.
            let Some(actor) = turns.handle(pending.actor) else {
                continue;
            };
            if actor.health() <= 0 {
                if pending.queued {
                    turns.prune_action(pending.actor, pending.seq);
                }
                continue;
            }

            // Claim the queue slot before doing anything else: each queued
            // action is removed exactly once, then either resolves into one
            // result or is invalidated with a notice.
            if pending.queued && !turns.prune_action(pending.actor, pending.seq) {
                // Already purged by defeat handling earlier this round.
                continue;
            }

            let target = pending.action.target().and_then(|id| turns.handle(id));
            if pending.action.requires_target()
                && !target.as_ref().is_some_and(|t| t.alive())
            {
                actor.send("Your target is no longer there.");
                continue;
            }

            let ctx = ResolveContext {
                actor: &actor,
                target: target.as_ref(),
                config,
            };
            if let Err(rejection) = pending.action.validate(&ctx) {
                actor.send(&rejection.to_string());
                continue;
            }

            let result = pending.action.resolve(&ctx, rng);
            tracing::trace!(actor = %result.actor, damage = result.damage, "action resolved");
            report.messages.push(result.message.clone());

            if pending.queued
                && let Some(target_id) = result.target
                && actor.target().is_none()
            {
                // An explicit strike commits the attacker to that target.
                actor.set_target(Some(target_id));
            }

            self.apply_result(
                turns,
                aggro,
                config,
                world,
                &actor,
                &result,
                &mut damage_totals,
                &mut report,
            );
            report.results.push(result);
        }

        self.cleanup_environment(turns, &mut report.messages);

        if let Some(summary) = summarize(round, &damage_totals) {
            report.messages.push(summary);
        }
        for handle in turns.handles() {
            if !recipients.iter().any(|r| r.id() == handle.id()) {
                recipients.push(handle);
            }
        }
        self.deliver(&recipients, turns, world, &report.messages);

        report.active_fighters = turns
            .handles()
            .iter()
            .filter(|handle| handle.alive())
            .count();
        report
    }

    /// Apply one resolved result: damage, threat, hooks, and defeat.
    #[allow(clippy::too_many_arguments)]
    fn apply_result(
        &self,
        turns: &mut TurnManager,
        aggro: &mut AggroTracker,
        config: &CombatConfig,
        world: &dyn WorldOracle,
        actor: &ActorHandle,
        result: &CombatResult,
        damage_totals: &mut HashMap<ActorId, (String, i32)>,
        report: &mut RoundReport,
    ) {
        let Some(target) = result.target.and_then(|id| turns.handle(id)) else {
            return;
        };

        // Engagement accrues threat whether or not the blow landed.
        aggro.track(&target, actor);

        if result.damage <= 0 {
            return;
        }

        let before = target.health();
        let dealt = target.with(|t| t.apply_damage(result.actor, result.damage, result.damage_type));
        damage_totals
            .entry(result.actor)
            .or_insert_with(|| (actor.name(), 0))
            .1 += dealt;

        if target.with(|t| t.target().is_none()) && target.alive() {
            // Being struck pulls an unengaged victim into the exchange.
            target.set_target(Some(result.actor));
        }

        let after = target.health();
        let threshold = target.max_health() * CombatConfig::LOW_HEALTH_PCT / 100;
        if after > 0 && after <= threshold && before > threshold {
            target.with(|t| t.on_low_health());
        }

        if after <= 0 {
            self.handle_defeat(turns, aggro, config, world, &target, actor, report);
        }
    }

    /// Handle a combatant dropping to zero health.
    pub fn handle_defeat(
        &self,
        turns: &mut TurnManager,
        aggro: &mut AggroTracker,
        config: &CombatConfig,
        world: &dyn WorldOracle,
        victim: &ActorHandle,
        attacker: &ActorHandle,
        report: &mut RoundReport,
    ) {
        tracing::debug!(victim = %victim.id(), attacker = %attacker.id(), "combatant defeated");

        // Corpse and loot generation belong to these hooks.
        victim.with(|v| {
            v.on_defeated(attacker.id());
            v.on_death(attacker.id());
        });

        let active = turns.handles();
        aggro.award_experience(attacker, victim, &active, config);
        aggro.clear_victim(victim.id());

        // Queued intent aimed at the fallen is explicitly invalidated.
        for owner in turns.purge_targeting(victim.id()) {
            if owner != victim.id()
                && let Some(handle) = turns.handle(owner)
            {
                handle.send(&format!("{} has already fallen.", victim.name()));
            }
        }

        let victim_location = victim.location();
        turns.remove_participant(victim.id());

        // Survivors pointing at the fallen pick a new living opponent.
        let survivors = turns.handles();
        for survivor in &survivors {
            let Some(stored) = survivor.target() else {
                continue;
            };
            let stale = !survivors
                .iter()
                .any(|other| other.id() == stored && other.alive());
            if stale {
                let next = survivors
                    .iter()
                    .find(|other| other.id() != survivor.id() && other.alive())
                    .map(|other| other.id());
                survivor.set_target(next);
            }
        }

        // The commotion can pull in hostile bystanders.
        if let Some(location) = victim_location {
            let survivor_ids: Vec<ActorId> = survivors.iter().map(|s| s.id()).collect();
            for bystander in world.hostile_bystanders(location, victim.id(), &survivor_ids) {
                if turns.add_participant(bystander.clone()) {
                    report
                        .messages
                        .push(format!("{} joins the fray!", bystander.name()));
                }
            }
        }

        for witness in turns.handles() {
            if witness.id() != attacker.id() && witness.location() == victim_location {
                witness.with(|w| w.on_ally_defeated(victim.id(), attacker.id()));
            }
        }

        report.messages.push(format!(
            "{} has been defeated by {}!",
            victim.name(),
            attacker.name()
        ));
        report.defeats.push(Defeat {
            victim: victim.id(),
            victim_name: victim.name(),
            attacker: attacker.id(),
        });
    }

    /// Drop participants the session no longer holds: departed actors,
    /// zero-health stragglers, and combatants who signaled disengagement by
    /// clearing their target with nothing queued and no one after them.
    pub fn cleanup_environment(&self, turns: &mut TurnManager, messages: &mut Vec<String>) {
        // Defensive copy: removal mutates the roster.
        let ids: Vec<ActorId> = turns.handles().iter().map(|h| h.id()).collect();
        for id in ids {
            let Some(participant) = turns.participant(id) else {
                continue;
            };
            let handle = participant.actor.clone();
            let joined = participant.joined_location();
            let queue_empty = participant.queue_is_empty();

            if joined.is_some() && handle.location() != joined {
                tracing::debug!(actor = %id, "participant left the location");
                turns.remove_participant(id);
            } else if handle.health() <= 0 {
                tracing::debug!(actor = %id, "zero-health participant swept");
                turns.remove_participant(id);
            } else if handle.target().is_none() && queue_empty && !turns.anyone_targeting(id) {
                messages.push(format!("{} breaks away from the fight.", handle.name()));
                turns.remove_participant(id);
            }
        }
    }

    /// Deliver buffered lines to every recipient (everyone who was in the
    /// round at any point), and offer the summary to the shared location
    /// (if there is one) for bystanders.
    fn deliver(
        &self,
        recipients: &[ActorHandle],
        turns: &TurnManager,
        world: &dyn WorldOracle,
        messages: &[String],
    ) {
        if messages.is_empty() {
            return;
        }
        for handle in recipients {
            for line in messages {
                handle.send(line);
            }
        }

        let handles = turns.handles();
        let mut locations = handles.iter().map(|h| h.location());
        if let Some(Some(shared)) = locations.next()
            && locations.all(|location| location == Some(shared))
        {
            world.broadcast(shared, &messages.join("\n"));
        }
    }
}

fn summarize(round: u32, damage_totals: &HashMap<ActorId, (String, i32)>) -> Option<String> {
    if damage_totals.is_empty() {
        return None;
    }
    let mut entries: Vec<_> = damage_totals.iter().collect();
    entries.sort_by_key(|(id, _)| **id);
    let parts: Vec<String> = entries
        .iter()
        .map(|(_, (name, total))| format!("{name} dealt {total} damage"))
        .collect();
    Some(format!("Round {round}: {}.", parts.join(", ")))
}
