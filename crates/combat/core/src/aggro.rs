//! Threat accounting and kill reward distribution.

use std::collections::HashMap;

use crate::actor::{ActorHandle, ActorId};
use crate::config::CombatConfig;

/// Per-victim threat table: victim → attacker → accumulated score.
///
/// Entries are filtered against the active participant set at distribution
/// time instead of being eagerly pruned, so transient departures never lose
/// credit.
#[derive(Debug, Default)]
pub struct AggroTracker {
    table: HashMap<ActorId, HashMap<ActorId, u32>>,
}

impl AggroTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `attacker` engaged `target`. Self-engagement is a no-op.
    pub fn track(&mut self, target: &ActorHandle, attacker: &ActorHandle) {
        if target.id() == attacker.id() {
            return;
        }
        let score = 1 + attacker.stats().threat;
        *self
            .table
            .entry(target.id())
            .or_default()
            .entry(attacker.id())
            .or_insert(0) += score;
        tracing::trace!(target = %target.id(), attacker = %attacker.id(), score, "threat tracked");
    }

    /// Accumulated threat of `attacker` against `victim`.
    pub fn threat(&self, victim: ActorId, attacker: ActorId) -> u32 {
        self.table
            .get(&victim)
            .and_then(|entries| entries.get(&attacker))
            .copied()
            .unwrap_or(0)
    }

    /// Everyone with threat against `victim` who is still in the fight.
    pub fn contributors(&self, victim: ActorId, active: &[ActorHandle]) -> Vec<ActorHandle> {
        let Some(entries) = self.table.get(&victim) else {
            return Vec::new();
        };
        active
            .iter()
            .filter(|actor| entries.contains_key(&actor.id()))
            .cloned()
            .collect()
    }

    /// Distribute the kill reward for `victim` among contributors.
    ///
    /// The reward is the victim's configured value (or level × default),
    /// scaled by the level gap to the killing attacker, then split with a
    /// floor share of `max(equal split, 10% of total)` so large groups
    /// never hand out near-zero awards.
    pub fn award_experience(
        &self,
        attacker: &ActorHandle,
        victim: &ActorHandle,
        active: &[ActorHandle],
        config: &CombatConfig,
    ) {
        let victim_level = victim.stats().level;
        let base = victim
            .with(|v| v.experience_reward())
            .unwrap_or(victim_level * config.default_exp_per_level);

        let scaled = base * level_gap_pct(attacker.stats().level, victim_level) / 100;
        if scaled == 0 {
            tracing::debug!(victim = %victim.id(), "kill reward scaled to zero");
            return;
        }

        let mut contributors = self.contributors(victim.id(), active);
        if contributors.is_empty() {
            contributors.push(attacker.clone());
        }

        let split = scaled / contributors.len() as u32;
        let floor = scaled * CombatConfig::MIN_GROUP_SHARE_PCT / 100;
        let share = split.max(floor);

        for contributor in &contributors {
            contributor.with(|a| a.grant_experience(share));
        }
        tracing::debug!(
            victim = %victim.id(),
            reward = scaled,
            share,
            contributors = contributors.len(),
            "kill reward distributed"
        );
    }

    /// Drop the table for a victim whose reward has been distributed.
    pub fn clear_victim(&mut self, victim: ActorId) {
        self.table.remove(&victim);
    }
}

/// Reward multiplier (percent) for the attacker/victim level gap.
/// Out-leveling a victim by three or more zeroes the reward.
fn level_gap_pct(attacker_level: u32, victim_level: u32) -> u32 {
    let gap = attacker_level as i64 - victim_level as i64;
    match gap {
        g if g >= 3 => 0,
        2 => 50,
        1 => 75,
        0 => 100,
        -1 => 125,
        _ => 150,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::BasicActor;
    use crate::stats::CombatStats;

    fn actor(id: u64) -> ActorHandle {
        BasicActor::builder(id, format!("fighter-{id}")).into_handle()
    }

    #[test]
    fn threat_accumulates_and_never_decreases() {
        let mut aggro = AggroTracker::new();
        let victim = actor(1);
        let attacker = BasicActor::builder(2, "brute")
            .stats(CombatStats {
                threat: 4,
                ..CombatStats::default()
            })
            .into_handle();

        let mut last = 0;
        for _ in 0..5 {
            aggro.track(&victim, &attacker);
            let now = aggro.threat(victim.id(), attacker.id());
            assert!(now > last);
            last = now;
        }
        assert_eq!(last, 25);
    }

    #[test]
    fn self_engagement_is_ignored() {
        let mut aggro = AggroTracker::new();
        let fighter = actor(1);
        aggro.track(&fighter, &fighter);
        assert_eq!(aggro.threat(fighter.id(), fighter.id()), 0);
    }

    #[test]
    fn contributors_filter_to_active_actors() {
        let mut aggro = AggroTracker::new();
        let victim = actor(1);
        let present = actor(2);
        let departed = actor(3);
        aggro.track(&victim, &present);
        aggro.track(&victim, &departed);

        let active = vec![present.clone(), victim.clone()];
        let contributors = aggro.contributors(victim.id(), &active);
        assert_eq!(contributors, vec![present]);
        // The departed attacker's score is retained, just not distributed.
        assert_eq!(aggro.threat(victim.id(), departed.id()), 1);
    }

    #[test]
    fn group_kill_reward_has_a_floor_share() {
        use std::sync::{Arc, Mutex};

        let mut aggro = AggroTracker::new();
        let config = CombatConfig::default();
        let victim = BasicActor::builder(100, "ogre")
            .experience_reward(100)
            .into_handle();

        let mut shared = Vec::new();
        let mut group = Vec::new();
        for id in 1..=20u64 {
            let member = Arc::new(Mutex::new(
                BasicActor::builder(id, format!("fighter-{id}")).build(),
            ));
            let handle = ActorHandle::from_arc(member.clone());
            aggro.track(&victim, &handle);
            shared.push(member);
            group.push(handle);
        }

        aggro.award_experience(&group[0], &victim, &group, &config);

        // Equal split would be 5; the 10% floor lifts every share to 10.
        for member in &shared {
            assert_eq!(member.lock().unwrap().experience(), 10);
        }
    }

    #[test]
    fn outleveled_victim_awards_nothing() {
        let aggro = AggroTracker::new();
        let config = CombatConfig::default();
        let victim = BasicActor::builder(1, "rat")
            .experience_reward(100)
            .into_handle();
        let killer = std::sync::Arc::new(std::sync::Mutex::new(
            BasicActor::builder(2, "veteran")
                .stats(CombatStats {
                    level: 5,
                    ..CombatStats::default()
                })
                .build(),
        ));
        let handle = ActorHandle::from_arc(killer.clone());

        aggro.award_experience(&handle, &victim, &[handle.clone()], &config);
        assert_eq!(killer.lock().unwrap().experience(), 0);
    }

    #[test]
    fn lone_killer_gets_full_reward_when_table_is_empty() {
        let aggro = AggroTracker::new();
        let config = CombatConfig::default();
        let victim = BasicActor::builder(1, "rat")
            .experience_reward(40)
            .into_handle();
        let killer = std::sync::Arc::new(std::sync::Mutex::new(
            BasicActor::builder(2, "hero").build(),
        ));
        let handle = ActorHandle::from_arc(killer.clone());

        aggro.award_experience(&handle, &victim, &[handle.clone()], &config);
        assert_eq!(killer.lock().unwrap().experience(), 40);
    }
}
