//! Scheduler-level behavior: instance registry, merging, events, and the
//! background round driver.

use std::sync::Arc;
use std::time::Duration;

use combat_core::{
    BasicActor, CombatConfig, CombatStats, DamageSource, NullWorld, WeaponSpec,
};
use combat_runtime::{
    CombatEvent, CombatRoundManager, EndReason, SchedulerConfig, SchedulerError, Topic,
};

fn manual_manager() -> CombatRoundManager {
    CombatRoundManager::new(
        Arc::new(NullWorld),
        SchedulerConfig {
            round_interval: None,
            seed: Some(21),
            combat: CombatConfig {
                initiative_jitter: 0,
                ..CombatConfig::default()
            },
            ..SchedulerConfig::default()
        },
    )
}

fn tough(id: u64, name: &str) -> combat_core::ActorHandle {
    BasicActor::builder(id, name).health(500).into_handle()
}

#[test]
fn an_actor_is_never_in_two_instances() {
    let manager = manual_manager();
    let a = tough(1, "knight");
    let b = tough(2, "bandit");
    let c = tough(3, "second bandit");

    let first = manager
        .start_combat(&[a.clone(), b.clone()])
        .expect("combat should start");

    // c attacks a mid-fight and joins the existing instance.
    let second = manager
        .start_combat(&[c.clone(), a.clone()])
        .expect("joining should succeed");

    assert_eq!(first, second);
    assert_eq!(manager.combat_for(c.id()), Some(first));
    let status = manager.status();
    assert_eq!(status.combats.len(), 1);
    assert_eq!(status.combats[0].combat, first);
    assert_eq!(status.combats[0].combatants, 3);
    assert_eq!(status.combatants, 3);
}

#[test]
fn cross_instance_fights_merge_into_one() {
    let manager = manual_manager();
    let a = tough(1, "knight");
    let b = tough(2, "bandit");
    let c = tough(3, "duelist");
    let d = tough(4, "rival");

    let left = manager
        .start_combat(&[a.clone(), b.clone()])
        .expect("first combat should start");
    let right = manager
        .start_combat(&[c.clone(), d.clone()])
        .expect("second combat should start");
    assert_ne!(left, right);

    let merged = manager
        .start_combat(&[a.clone(), c.clone()])
        .expect("merge should succeed");

    assert_eq!(merged, left);
    let status = manager.status();
    assert_eq!(status.combats.len(), 1);
    assert_eq!(status.combatants, 4);
    assert_eq!(manager.combat_for(d.id()), Some(left));
}

#[test]
fn emptied_instances_are_garbage_collected() {
    let manager = manual_manager();
    let a = tough(1, "knight");
    let b = tough(2, "bandit");

    let combat = manager
        .start_combat(&[a.clone(), b.clone()])
        .expect("combat should start");

    // Something external yanks every combatant out.
    manager
        .with_engine(combat, |engine| {
            for id in engine.participant_ids() {
                engine.remove_participant(id);
            }
        })
        .expect("engine access should succeed");

    assert!(!manager.tick_once());
    assert!(manager.status().combats.is_empty());
    assert!(matches!(
        manager.end_combat(combat),
        Err(SchedulerError::CombatNotFound(_))
    ));
}

#[test]
fn starting_combat_alone_is_rejected() {
    let manager = manual_manager();
    let loner = tough(1, "hermit");
    assert!(matches!(
        manager.start_combat(&[loner]),
        Err(SchedulerError::NoCombatants)
    ));
}

#[test]
fn force_end_releases_every_combatant() {
    let manager = manual_manager();
    let a = tough(1, "knight");
    let b = tough(2, "bandit");
    let c = tough(3, "duelist");
    let d = tough(4, "rival");

    manager
        .start_combat(&[a.clone(), b.clone()])
        .expect("first combat should start");
    manager
        .start_combat(&[c.clone(), d.clone()])
        .expect("second combat should start");

    let mut lifecycle = manager.events().subscribe(Topic::Lifecycle);
    manager.force_end_all_combat();

    let status = manager.status();
    assert!(status.combats.is_empty());
    assert_eq!(status.combatants, 0);
    for handle in [&a, &b, &c, &d] {
        assert!(!handle.with(|actor| actor.in_combat()));
        assert_eq!(handle.target(), None);
    }

    let mut forced = 0;
    while let Ok(event) = lifecycle.try_recv() {
        if let CombatEvent::CombatEnded { reason, .. } = event {
            assert_eq!(reason, EndReason::Forced);
            forced += 1;
        }
    }
    assert_eq!(forced, 2);
}

#[test]
fn defeats_and_round_results_are_published() {
    let manager = manual_manager();
    let mut lifecycle = manager.events().subscribe(Topic::Lifecycle);
    let mut rounds = manager.events().subscribe(Topic::Round);
    let mut defeats = manager.events().subscribe(Topic::Defeat);

    let hero = BasicActor::builder(1, "hero")
        .health(100)
        .stats(CombatStats {
            accuracy: 100,
            ..CombatStats::default()
        })
        .weapon(WeaponSpec::new("maul", DamageSource::Fixed(50)))
        .into_handle();
    let goblin = BasicActor::builder(2, "goblin").health(10).into_handle();

    let combat = manager
        .start_combat(&[hero.clone(), goblin.clone()])
        .expect("combat should start");
    manager.tick_once();

    match lifecycle.try_recv().expect("start event") {
        CombatEvent::CombatStarted {
            combat: id,
            combatants,
        } => {
            assert_eq!(id, combat);
            assert_eq!(combatants, vec![hero.id(), goblin.id()]);
        }
        other => panic!("unexpected lifecycle event: {other:?}"),
    }

    match defeats.try_recv().expect("defeat event") {
        CombatEvent::ActorDefeated {
            victim,
            victim_name,
            attacker,
            ..
        } => {
            assert_eq!(victim, goblin.id());
            assert_eq!(victim_name, "goblin");
            assert_eq!(attacker, hero.id());
        }
        other => panic!("unexpected defeat event: {other:?}"),
    }

    match rounds.try_recv().expect("round event") {
        CombatEvent::RoundCompleted {
            round,
            messages,
            active_fighters,
            ..
        } => {
            assert_eq!(round, 1);
            assert!(!messages.is_empty());
            assert_eq!(active_fighters, 0);
        }
        other => panic!("unexpected round event: {other:?}"),
    }

    match lifecycle.try_recv().expect("end event") {
        CombatEvent::CombatEnded { reason, .. } => assert_eq!(reason, EndReason::Resolved),
        other => panic!("unexpected lifecycle event: {other:?}"),
    }
}

#[test]
fn events_round_trip_through_json() {
    let event = CombatEvent::ActorDefeated {
        combat: combat_runtime::CombatId(3),
        victim: combat_core::ActorId(2),
        victim_name: "goblin".into(),
        attacker: combat_core::ActorId(1),
    };

    let encoded = serde_json::to_string(&event).expect("event should serialize");
    let decoded: CombatEvent = serde_json::from_str(&encoded).expect("event should deserialize");
    match decoded {
        CombatEvent::ActorDefeated {
            victim_name,
            attacker,
            ..
        } => {
            assert_eq!(victim_name, "goblin");
            assert_eq!(attacker, combat_core::ActorId(1));
        }
        other => panic!("unexpected event after round trip: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn background_driver_runs_the_fight_to_completion() {
    let manager = CombatRoundManager::new(
        Arc::new(NullWorld),
        SchedulerConfig {
            round_interval: Some(Duration::from_millis(500)),
            seed: Some(5),
            combat: CombatConfig {
                initiative_jitter: 0,
                ..CombatConfig::default()
            },
            ..SchedulerConfig::default()
        },
    );
    let mut lifecycle = manager.events().subscribe(Topic::Lifecycle);

    let hero = BasicActor::builder(1, "hero")
        .health(100)
        .stats(CombatStats {
            accuracy: 100,
            ..CombatStats::default()
        })
        .weapon(WeaponSpec::new("maul", DamageSource::Fixed(50)))
        .into_handle();
    let goblin = BasicActor::builder(2, "goblin").health(10).into_handle();

    manager
        .start_combat(&[hero.clone(), goblin.clone()])
        .expect("combat should start");
    assert!(manager.status().driver_running);

    loop {
        let event = tokio::time::timeout(Duration::from_secs(30), lifecycle.recv())
            .await
            .expect("driver should finish the fight")
            .expect("lifecycle channel should stay open");
        if let CombatEvent::CombatEnded { reason, .. } = event {
            assert_eq!(reason, EndReason::Resolved);
            break;
        }
    }

    assert!(manager.status().combats.is_empty());
    assert_eq!(manager.combat_for(hero.id()), None);
}
