//! Per-session participant registry and turn-order assembly.

use std::cmp::Reverse;
use std::collections::VecDeque;

use rand::Rng;

use crate::action::CombatAction;
use crate::actor::{ActorHandle, ActorId, LocationId, StatusFlags};
use crate::config::CombatConfig;
use crate::error::EngineError;

/// One entry in a participant's action queue.
#[derive(Clone, Debug)]
pub struct QueuedAction {
    pub seq: u64,
    pub action: CombatAction,
}

/// Binds one actor into one combat session.
#[derive(Debug)]
pub struct Participant {
    pub actor: ActorHandle,
    /// Frozen for the round once `start_round` computes it.
    pub initiative: i32,
    joined_location: Option<LocationId>,
    queue: VecDeque<QueuedAction>,
    next_seq: u64,
}

impl Participant {
    fn new(actor: ActorHandle) -> Self {
        let joined_location = actor.location();
        Self {
            actor,
            initiative: 0,
            joined_location,
            queue: VecDeque::new(),
            next_seq: 0,
        }
    }

    /// Location the actor fought from when joining. Wandering off ends the
    /// fight for them at cleanup.
    pub fn joined_location(&self) -> Option<LocationId> {
        self.joined_location
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn queued(&self) -> impl Iterator<Item = &QueuedAction> {
        self.queue.iter()
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn enqueue(&mut self, action: CombatAction) -> u64 {
        let seq = self.bump_seq();
        self.queue.push_back(QueuedAction { seq, action });
        seq
    }

    fn remove_seq(&mut self, seq: u64) -> bool {
        if let Some(pos) = self.queue.iter().position(|q| q.seq == seq) {
            self.queue.remove(pos);
            true
        } else {
            false
        }
    }
}

/// One action scheduled for resolution this round.
#[derive(Clone, Debug)]
pub struct PendingAction {
    pub actor: ActorId,
    pub initiative: i32,
    pub priority: i32,
    pub seq: u64,
    /// Synthesized defaults are not in any queue and are never pruned.
    pub queued: bool,
    pub action: CombatAction,
}

impl PendingAction {
    fn sort_key(&self) -> (i32, i32, Reverse<u64>) {
        (self.initiative, self.priority, Reverse(self.seq))
    }
}

/// Output of action gathering: the ordered execution list plus round
/// notices (hesitation, stuns) for the message buffer.
#[derive(Debug, Default)]
pub struct GatheredActions {
    pub actions: Vec<PendingAction>,
    pub notices: Vec<String>,
}

/// Participant registry for one combat session.
#[derive(Debug, Default)]
pub struct TurnManager {
    participants: Vec<Participant>,
}

impl TurnManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, id: ActorId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.actor.id() == id)
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.participant(id).is_some()
    }

    pub fn handles(&self) -> Vec<ActorHandle> {
        self.participants.iter().map(|p| p.actor.clone()).collect()
    }

    pub fn handle(&self, id: ActorId) -> Option<ActorHandle> {
        self.participant(id).map(|p| p.actor.clone())
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// True if any other participant stores `id` as its current target.
    pub fn anyone_targeting(&self, id: ActorId) -> bool {
        self.participants
            .iter()
            .any(|p| p.actor.id() != id && p.actor.target() == Some(id))
    }

    /// Register an actor. Sets the in-combat flag and fires the enter hook.
    /// Re-adding a present actor is a no-op.
    pub fn add_participant(&mut self, actor: ActorHandle) -> bool {
        if self.contains(actor.id()) {
            return false;
        }
        tracing::debug!(actor = %actor.id(), "participant joins combat");
        actor.with(|a| {
            a.set_in_combat(true);
            a.on_enter_combat();
        });
        self.participants.push(Participant::new(actor));
        true
    }

    /// Remove an actor, clearing the in-combat flag and stored target and
    /// firing the exit hook. Idempotent; queued actions are discarded.
    pub fn remove_participant(&mut self, id: ActorId) -> bool {
        let Some(pos) = self.participants.iter().position(|p| p.actor.id() == id) else {
            return false;
        };
        let participant = self.participants.remove(pos);
        tracing::debug!(actor = %id, dropped_actions = participant.queue.len(), "participant leaves combat");
        participant.actor.with(|a| {
            a.set_in_combat(false);
            a.set_target(None);
            a.on_exit_combat();
        });
        true
    }

    /// Queue an action for a participant. The action's actor must match.
    pub fn queue_action(&mut self, actor: ActorId, action: CombatAction) -> Result<u64, EngineError> {
        if action.actor() != actor {
            return Err(EngineError::ActorMismatch {
                action_actor: action.actor(),
                owner: actor,
            });
        }
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.actor.id() == actor)
            .ok_or(EngineError::ActorNotInCombat(actor))?;
        Ok(participant.enqueue(action))
    }

    /// Remove one queued action by its enqueue sequence.
    pub fn prune_action(&mut self, actor: ActorId, seq: u64) -> bool {
        self.participants
            .iter_mut()
            .find(|p| p.actor.id() == actor)
            .is_some_and(|p| p.remove_seq(seq))
    }

    /// Remove every queued action aimed at `fallen` from all queues.
    /// Returns the owners whose intent was invalidated, for notification.
    pub fn purge_targeting(&mut self, fallen: ActorId) -> Vec<ActorId> {
        let mut owners = Vec::new();
        for participant in &mut self.participants {
            let before = participant.queue.len();
            participant
                .queue
                .retain(|q| q.action.target() != Some(fallen));
            if participant.queue.len() < before {
                owners.push(participant.actor.id());
            }
        }
        owners
    }

    /// Begin a round: regenerate resources, drop round-scoped statuses,
    /// recompute initiative, and re-sort the participant order.
    pub fn start_round(&mut self, config: &CombatConfig, rng: &mut impl Rng) {
        for participant in &mut self.participants {
            participant.actor.with(|a| {
                if a.max_stamina() > 0 {
                    a.set_stamina((a.stamina() + config.stamina_regen).min(a.max_stamina()));
                }
                if a.max_mana() > 0 {
                    a.set_mana((a.mana() + config.mana_regen).min(a.max_mana()));
                }
                a.remove_status(StatusFlags::DEFENDING);
            });
            let stats = participant.actor.stats();
            let jitter = if config.initiative_jitter > 0 {
                rng.gen_range(0..=config.initiative_jitter)
            } else {
                0
            };
            participant.initiative =
                stats.initiative + stats.initiative_bonus + (stats.level / 4) as i32 + jitter;
        }
        if config.initiative_ordering {
            self.participants
                .sort_by(|a, b| b.initiative.cmp(&a.initiative));
        }
    }

    /// Assemble this round's execution list.
    ///
    /// Explicitly queued actions are taken as-is; otherwise a default
    /// Attack is synthesized against the stored target (if alive and in
    /// reach) or the first other living participant. Haste grants extra
    /// synthesized Attack copies. The result is sorted descending by
    /// `(initiative, priority, enqueue order)` — the complete tie-break.
    pub fn gather_actions(&mut self, config: &CombatConfig) -> GatheredActions {
        let mut gathered = GatheredActions::default();
        let roster = self.handles();

        for index in 0..self.participants.len() {
            let (handle, initiative) = {
                let p = &self.participants[index];
                (p.actor.clone(), p.initiative)
            };
            if handle.health() <= 0 {
                continue;
            }
            handle.with(|a| a.on_turn());
            if handle.statuses().contains(StatusFlags::STUNNED) {
                gathered
                    .notices
                    .push(format!("{} is stunned and cannot act.", handle.name()));
                continue;
            }

            let stats = handle.stats();
            let extras = if config.haste_per_extra_attack > 0 {
                (stats.haste / config.haste_per_extra_attack)
                    .min(config.max_attacks_per_round.saturating_sub(1))
            } else {
                0
            };

            let participant = &mut self.participants[index];
            if !participant.queue.is_empty() {
                let mut attack_target = None;
                for q in &participant.queue {
                    if matches!(q.action, CombatAction::Attack(_)) && attack_target.is_none() {
                        attack_target = q.action.target();
                    }
                    gathered.actions.push(PendingAction {
                        actor: handle.id(),
                        initiative,
                        priority: q.action.priority(),
                        seq: q.seq,
                        queued: true,
                        action: q.action.clone(),
                    });
                }
                // Haste rides along with an explicit attack.
                if let Some(target) = attack_target {
                    for _ in 0..extras {
                        let seq = participant.bump_seq();
                        let action = CombatAction::attack(handle.id(), target);
                        gathered.actions.push(PendingAction {
                            actor: handle.id(),
                            initiative,
                            priority: action.priority(),
                            seq,
                            queued: false,
                            action,
                        });
                    }
                }
                continue;
            }

            match default_target(&handle, &roster) {
                Some(target) => {
                    for _ in 0..=extras {
                        let seq = participant.bump_seq();
                        let action = CombatAction::attack(handle.id(), target);
                        gathered.actions.push(PendingAction {
                            actor: handle.id(),
                            initiative,
                            priority: action.priority(),
                            seq,
                            queued: false,
                            action,
                        });
                    }
                }
                None => {
                    let others_living = roster
                        .iter()
                        .any(|other| other.id() != handle.id() && other.alive());
                    if others_living {
                        gathered
                            .notices
                            .push(format!("{} hesitates, finding no one to strike.", handle.name()));
                    }
                }
            }
        }

        gathered
            .actions
            .sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
        gathered
    }
}

/// Default-attack target selection: the stored target when it is a living,
/// reachable participant, otherwise the first other living reachable
/// participant in join order.
fn default_target(actor: &ActorHandle, roster: &[ActorHandle]) -> Option<ActorId> {
    let here = actor.location();
    let reachable = |other: &ActorHandle| match (here, other.location()) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    };

    if let Some(stored) = actor.target()
        && let Some(target) = roster.iter().find(|o| o.id() == stored)
        && target.alive()
        && reachable(target)
    {
        return Some(stored);
    }

    roster
        .iter()
        .find(|other| other.id() != actor.id() && other.alive() && reachable(other))
        .map(|other| other.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{BasicActor, CombatActor};
    use crate::stats::CombatStats;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::{Arc, Mutex};

    fn fighter(id: u64, stats: CombatStats) -> ActorHandle {
        BasicActor::builder(id, format!("fighter-{id}"))
            .health(20)
            .stats(stats)
            .into_handle()
    }

    #[test]
    fn add_and_remove_are_idempotent_and_fire_hooks_once() {
        let shared = Arc::new(Mutex::new(BasicActor::builder(1, "hero").build()));
        let handle = ActorHandle::from_arc(shared.clone());
        let mut turns = TurnManager::new();

        assert!(turns.add_participant(handle.clone()));
        assert!(!turns.add_participant(handle.clone()));
        assert!(turns.remove_participant(handle.id()));
        assert!(!turns.remove_participant(handle.id()));

        let actor = shared.lock().unwrap();
        assert_eq!(actor.hook_calls(), ["on_enter_combat", "on_exit_combat"]);
        assert!(!actor.in_combat());
    }

    #[test]
    fn queue_rejects_foreign_actions() {
        let a = fighter(1, CombatStats::default());
        let b = fighter(2, CombatStats::default());
        let mut turns = TurnManager::new();
        turns.add_participant(a.clone());
        turns.add_participant(b.clone());

        let foreign = CombatAction::attack(b.id(), a.id());
        assert!(matches!(
            turns.queue_action(a.id(), foreign),
            Err(EngineError::ActorMismatch { .. })
        ));
        assert!(matches!(
            turns.queue_action(ActorId(99), CombatAction::defend(ActorId(99))),
            Err(EngineError::ActorNotInCombat(_))
        ));
    }

    #[test]
    fn gather_order_is_deterministic_for_a_fixed_seed() {
        let build = || {
            let mut turns = TurnManager::new();
            turns.add_participant(fighter(1, CombatStats::default()));
            turns.add_participant(fighter(
                2,
                CombatStats {
                    initiative: 5,
                    ..CombatStats::default()
                },
            ));
            turns.add_participant(fighter(3, CombatStats::default()));
            turns
        };
        let config = CombatConfig::default();

        let order = |mut turns: TurnManager| {
            let mut rng = ChaCha8Rng::seed_from_u64(99);
            turns.start_round(&config, &mut rng);
            turns
                .gather_actions(&config)
                .actions
                .iter()
                .map(|p| (p.actor, p.seq))
                .collect::<Vec<_>>()
        };

        assert_eq!(order(build()), order(build()));
    }

    #[test]
    fn initiative_orders_actions_descending() {
        let mut turns = TurnManager::new();
        let slow = fighter(1, CombatStats::default());
        let fast = fighter(
            2,
            CombatStats {
                initiative: 100,
                ..CombatStats::default()
            },
        );
        turns.add_participant(slow.clone());
        turns.add_participant(fast.clone());

        let config = CombatConfig {
            initiative_jitter: 0,
            ..CombatConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        turns.start_round(&config, &mut rng);
        let gathered = turns.gather_actions(&config);
        assert_eq!(gathered.actions[0].actor, fast.id());
        assert_eq!(gathered.actions[1].actor, slow.id());
    }

    #[test]
    fn priority_breaks_initiative_ties_then_enqueue_order() {
        let mut turns = TurnManager::new();
        let brawler = fighter(1, CombatStats::default());
        let dummy = fighter(2, CombatStats::default());
        turns.add_participant(brawler.clone());
        turns.add_participant(dummy.clone());

        turns
            .queue_action(brawler.id(), CombatAction::attack(brawler.id(), dummy.id()))
            .unwrap();
        turns
            .queue_action(brawler.id(), CombatAction::attack(brawler.id(), dummy.id()))
            .unwrap();
        turns
            .queue_action(brawler.id(), CombatAction::defend(brawler.id()))
            .unwrap();

        let config = CombatConfig {
            initiative_jitter: 0,
            initiative_ordering: false,
            ..CombatConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        turns.start_round(&config, &mut rng);
        let gathered = turns.gather_actions(&config);

        let mine: Vec<_> = gathered
            .actions
            .iter()
            .filter(|p| p.actor == brawler.id())
            .collect();
        // Defend (priority 10) first, then the two attacks in enqueue order.
        assert!(matches!(mine[0].action, CombatAction::Defend(_)));
        assert_eq!(mine[1].seq, 0);
        assert_eq!(mine[2].seq, 1);
    }

    #[test]
    fn haste_grants_extra_attacks_up_to_the_cap() {
        let mut turns = TurnManager::new();
        let hasted = fighter(
            1,
            CombatStats {
                haste: 55,
                ..CombatStats::default()
            },
        );
        let dummy = fighter(2, CombatStats::default());
        turns.add_participant(hasted.clone());
        turns.add_participant(dummy.clone());

        let config = CombatConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        turns.start_round(&config, &mut rng);
        let gathered = turns.gather_actions(&config);

        let attacks = gathered
            .actions
            .iter()
            .filter(|p| p.actor == hasted.id())
            .count();
        assert_eq!(attacks, 2);
    }

    #[test]
    fn unreachable_opponents_cause_hesitation() {
        let mut turns = TurnManager::new();
        let here = BasicActor::builder(1, "hero")
            .health(20)
            .location(LocationId(1))
            .into_handle();
        let elsewhere = BasicActor::builder(2, "goblin")
            .health(20)
            .location(LocationId(2))
            .into_handle();
        turns.add_participant(here.clone());
        turns.add_participant(elsewhere.clone());

        let config = CombatConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        turns.start_round(&config, &mut rng);
        let gathered = turns.gather_actions(&config);

        assert!(gathered.actions.is_empty());
        assert_eq!(gathered.notices.len(), 2);
    }

    #[test]
    fn stored_target_wins_over_join_order() {
        let mut turns = TurnManager::new();
        let a = fighter(1, CombatStats::default());
        let b = fighter(2, CombatStats::default());
        let c = fighter(3, CombatStats::default());
        turns.add_participant(a.clone());
        turns.add_participant(b.clone());
        turns.add_participant(c.clone());
        a.set_target(Some(c.id()));

        let config = CombatConfig {
            initiative_jitter: 0,
            ..CombatConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        turns.start_round(&config, &mut rng);
        let gathered = turns.gather_actions(&config);

        let mine = gathered
            .actions
            .iter()
            .find(|p| p.actor == a.id())
            .unwrap();
        assert_eq!(mine.action.target(), Some(c.id()));
    }
}
