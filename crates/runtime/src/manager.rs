//! Process-wide combat scheduler.
//!
//! [`CombatRoundManager`] owns every running [`CombatInstance`], maps each
//! actor to at most one of them, and drives rounds either from a background
//! tokio task or through manual [`CombatRoundManager::tick_once`] calls.
//! It is an explicit service: construct one, clone it, and inject it where
//! combat can start.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;

use combat_core::{ActorHandle, ActorId, CombatAction, CombatConfig, CombatEngine, WorldOracle};

use crate::error::SchedulerError;
use crate::events::{CombatEvent, EndReason, EventBus};
use crate::instance::{CombatId, CombatInstance};

/// Scheduler tuning knobs.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Delay between rounds for the background driver. `None` disables the
    /// driver entirely; rounds then only advance via `tick_once`.
    pub round_interval: Option<Duration>,
    /// Per-topic event channel capacity.
    pub event_capacity: usize,
    /// Engine configuration applied to every new instance.
    pub combat: CombatConfig,
    /// Base RNG seed. Each instance derives its own stream from it; `None`
    /// seeds every instance from entropy.
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            round_interval: Some(Duration::from_secs(2)),
            event_capacity: 100,
            combat: CombatConfig::default(),
            seed: None,
        }
    }
}

/// Snapshot of one running instance for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CombatSummary {
    pub combat: CombatId,
    pub round: u32,
    pub combatants: usize,
    pub active: bool,
}

/// Snapshot of scheduler load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerStatus {
    pub combats: Vec<CombatSummary>,
    pub combatants: usize,
    pub driver_running: bool,
}

#[derive(Default)]
struct ManagerState {
    instances: HashMap<CombatId, CombatInstance>,
    by_actor: HashMap<ActorId, CombatId>,
    next_id: u64,
    driver_running: bool,
}

struct Shared {
    state: Mutex<ManagerState>,
    events: EventBus,
    world: Arc<dyn WorldOracle>,
    config: SchedulerConfig,
}

/// Cheaply cloneable handle to the shared scheduler.
#[derive(Clone)]
pub struct CombatRoundManager {
    shared: Arc<Shared>,
}

impl CombatRoundManager {
    pub fn new(world: Arc<dyn WorldOracle>, config: SchedulerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ManagerState {
                    next_id: 1,
                    ..ManagerState::default()
                }),
                events: EventBus::with_capacity(config.event_capacity),
                world,
                config,
            }),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        // Instance state stays coherent across a panicking round; recover.
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Start (or join) combat between `combatants`.
    ///
    /// If any combatant is already fighting, everyone joins that instance
    /// instead of opening a second one; instances never share an actor.
    /// Combatants from other instances bring their whole roster along.
    pub fn start_combat(&self, combatants: &[ActorHandle]) -> Result<CombatId, SchedulerError> {
        if combatants.len() < 2 {
            return Err(SchedulerError::NoCombatants);
        }

        let (combat, started, joined) = {
            let mut guard = self.lock();
            let state = &mut *guard;

            let existing = combatants
                .iter()
                .find_map(|c| state.by_actor.get(&c.id()).copied());
            let (combat, started) = match existing {
                Some(id) => (id, false),
                None => {
                    let id = CombatId(state.next_id);
                    state.next_id += 1;
                    state.instances.insert(
                        id,
                        CombatInstance::new(
                            id,
                            self.shared.config.combat.clone(),
                            self.shared.config.seed,
                        ),
                    );
                    (id, true)
                }
            };

            // Fold foreign instances into the chosen one.
            let mut foreign: Vec<CombatId> = combatants
                .iter()
                .filter_map(|c| state.by_actor.get(&c.id()).copied())
                .filter(|id| *id != combat)
                .collect();
            foreign.sort();
            foreign.dedup();
            for source_id in foreign {
                let Some(source) = state.instances.remove(&source_id) else {
                    continue;
                };
                let roster = source.engine().participants();
                tracing::debug!(from = %source_id, into = %combat, moved = roster.len(), "merging instances");
                let target = state
                    .instances
                    .get_mut(&combat)
                    .expect("merge target instance present");
                for handle in roster {
                    target.engine_mut().add_participant(handle);
                }
                self.shared.events.publish(CombatEvent::CombatEnded {
                    combat: source_id,
                    reason: EndReason::Merged,
                });
            }

            let instance = state
                .instances
                .get_mut(&combat)
                .expect("combat instance present");
            let joined = instance.add_combatants(combatants);
            for actor in instance.engine().participant_ids() {
                state.by_actor.insert(actor, combat);
            }
            (combat, started, joined)
        };

        if started {
            tracing::info!(%combat, combatants = combatants.len(), "combat started");
            self.shared.events.publish(CombatEvent::CombatStarted {
                combat,
                combatants: combatants.iter().map(|c| c.id()).collect(),
            });
        } else if !joined.is_empty() {
            tracing::info!(%combat, joining = joined.len(), "combatants joined running combat");
            self.shared
                .events
                .publish(CombatEvent::CombatantsMerged { combat, joined });
        }

        self.maybe_spawn_driver();
        Ok(combat)
    }

    /// The instance an actor is currently fighting in, if any.
    pub fn combat_for(&self, actor: ActorId) -> Option<CombatId> {
        self.lock().by_actor.get(&actor).copied()
    }

    /// Queue an action for an actor in whichever instance holds it.
    pub fn queue_action(&self, actor: ActorId, action: CombatAction) -> Result<u64, SchedulerError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let combat = state
            .by_actor
            .get(&actor)
            .copied()
            .ok_or(SchedulerError::ActorNotInCombat(actor))?;
        let instance = state
            .instances
            .get_mut(&combat)
            .ok_or(SchedulerError::CombatNotFound(combat))?;
        Ok(instance.engine_mut().queue_action(actor, action)?)
    }

    /// Run a closure against one instance's engine.
    pub fn with_engine<T>(
        &self,
        combat: CombatId,
        f: impl FnOnce(&mut CombatEngine) -> T,
    ) -> Result<T, SchedulerError> {
        let mut guard = self.lock();
        let instance = guard
            .instances
            .get_mut(&combat)
            .ok_or(SchedulerError::CombatNotFound(combat))?;
        Ok(f(instance.engine_mut()))
    }

    /// Advance every instance by one round. Ended instances are released
    /// and announced. Returns whether any instance remains.
    ///
    /// Rounds run under the scheduler lock, so the [`WorldOracle`] callbacks
    /// they trigger must not call back into this manager.
    pub fn tick_once(&self) -> bool {
        let mut finished = Vec::new();
        let mut reports = Vec::new();

        let remaining = {
            let mut guard = self.lock();
            let state = &mut *guard;

            // Defensive copy: instances are removed mid-loop.
            let ids: Vec<CombatId> = state.instances.keys().copied().collect();
            for id in ids {
                let Some(instance) = state.instances.get_mut(&id) else {
                    continue;
                };
                if !instance.is_active() {
                    if !instance.is_valid() {
                        tracing::warn!(combat = %id, "dropping invalid combat instance");
                    }
                    let mut instance = state.instances.remove(&id).expect("instance present");
                    instance.end();
                    finished.push(id);
                    continue;
                }

                let report = instance.process_round(self.shared.world.as_ref());
                if !instance.is_active() {
                    let mut instance = state.instances.remove(&id).expect("instance present");
                    instance.end();
                    finished.push(id);
                }
                reports.push((id, report));
            }

            // Participants join and leave during rounds; rebuild the index.
            state.by_actor.clear();
            for (id, instance) in &state.instances {
                for actor in instance.engine().participant_ids() {
                    state.by_actor.insert(actor, *id);
                }
            }
            !state.instances.is_empty()
        };

        for (combat, report) in reports {
            for defeat in &report.defeats {
                self.shared.events.publish(CombatEvent::ActorDefeated {
                    combat,
                    victim: defeat.victim,
                    victim_name: defeat.victim_name.clone(),
                    attacker: defeat.attacker,
                });
            }
            self.shared.events.publish(CombatEvent::RoundCompleted {
                combat,
                round: report.round,
                messages: report.messages,
                active_fighters: report.active_fighters,
            });
        }
        for combat in finished {
            self.shared.events.publish(CombatEvent::CombatEnded {
                combat,
                reason: EndReason::Resolved,
            });
        }

        remaining
    }

    /// End one instance immediately.
    pub fn end_combat(&self, combat: CombatId) -> Result<(), SchedulerError> {
        {
            let mut guard = self.lock();
            let state = &mut *guard;
            let mut instance = state
                .instances
                .remove(&combat)
                .ok_or(SchedulerError::CombatNotFound(combat))?;
            instance.end();
            state.by_actor.retain(|_, id| *id != combat);
        }
        self.shared.events.publish(CombatEvent::CombatEnded {
            combat,
            reason: EndReason::Forced,
        });
        Ok(())
    }

    /// End every instance, releasing all combatants. Used at shutdown and
    /// by administrative commands.
    pub fn force_end_all_combat(&self) {
        let ended: Vec<CombatId> = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let mut ended = Vec::new();
            for (id, mut instance) in state.instances.drain() {
                instance.end();
                ended.push(id);
            }
            state.by_actor.clear();
            ended
        };
        for combat in ended {
            self.shared.events.publish(CombatEvent::CombatEnded {
                combat,
                reason: EndReason::Forced,
            });
        }
    }

    pub fn status(&self) -> SchedulerStatus {
        let guard = self.lock();
        let mut combats: Vec<CombatSummary> = guard
            .instances
            .values()
            .map(|instance| CombatSummary {
                combat: instance.id(),
                round: instance.engine().round(),
                combatants: instance.engine().participants().len(),
                active: instance.is_active(),
            })
            .collect();
        combats.sort_by_key(|summary| summary.combat);
        SchedulerStatus {
            combats,
            combatants: guard.by_actor.len(),
            driver_running: guard.driver_running,
        }
    }

    /// Spawn the background round driver if an interval is configured, a
    /// tokio runtime is reachable, and no driver is already running.
    fn maybe_spawn_driver(&self) {
        let Some(interval) = self.shared.config.round_interval else {
            return;
        };
        let Ok(handle) = Handle::try_current() else {
            tracing::debug!("no tokio runtime; rounds advance via tick_once");
            return;
        };
        {
            let mut guard = self.lock();
            if guard.driver_running || guard.instances.is_empty() {
                return;
            }
            guard.driver_running = true;
        }

        let manager = self.clone();
        handle.spawn(async move {
            tracing::debug!("round driver started");
            loop {
                tokio::time::sleep(interval).await;
                if !manager.tick_once() {
                    // Re-check under the same lock start_combat uses, so a
                    // fight starting right now is not left undriven.
                    let mut guard = manager.lock();
                    if guard.instances.is_empty() {
                        guard.driver_running = false;
                        break;
                    }
                }
            }
            tracing::debug!("round driver stopped");
        });
    }
}

impl std::fmt::Debug for CombatRoundManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status();
        f.debug_struct("CombatRoundManager")
            .field("combats", &status.combats.len())
            .field("combatants", &status.combatants)
            .field("driver_running", &status.driver_running)
            .finish()
    }
}
