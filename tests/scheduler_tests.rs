//! Scheduler tests: instance lifecycle, holds, signals and common events

use chrono::NaiveDate;
use eventweave::application::api::{EventResponse, Notification, RecordingSink, Signal};
use eventweave::application::scheduler::EventScheduler;
use eventweave::config::EngineConfig;
use eventweave::domain::commands::{Command, IntegerMod, SpawnTarget, VariableMod};
use eventweave::domain::conditions::{Condition, ConditionKind};
use eventweave::domain::descriptors::{
    CommonEventDescriptor, CommonEventPage, CommonEventTrigger, NpcDescriptor, VariableDescriptor,
};
use eventweave::domain::entities::{Page, PageBuilder};
use eventweave::domain::player::{Guild, Player, UserAccount};
use eventweave::domain::value_objects::*;
use eventweave::infrastructure::descriptors::InMemoryDescriptors;
use eventweave::runtime::world::{ManualClock, MapEvent, World};
use std::sync::Arc;

fn scheduler_with(descriptors: InMemoryDescriptors) -> (EventScheduler, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let noon = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let mut config = EngineConfig {
        rng_seed: Some(7),
        ..EngineConfig::default()
    };
    config.scheduler.commands_per_tick = 8;
    let world = World::new(config, Arc::new(descriptors), sink.clone())
        .with_clock(Arc::new(ManualClock::new(noon)));
    (EventScheduler::new(world), sink)
}

fn join(scheduler: &mut EventScheduler, name: &str) -> PlayerId {
    let world = scheduler.world_mut();
    let user = UserAccount::new(name);
    let player = Player::new(name, user.id, 35, 35);
    world.add_user(user);
    let id = world.add_player(player);
    world.set_online(id, true);
    id
}

fn page(commands: Vec<Command>) -> Arc<Page> {
    Arc::new(PageBuilder::new("test").root(commands).build().unwrap())
}

fn text(s: &str) -> Command {
    Command::ShowText {
        text: s.to_string(),
        face: String::new(),
    }
}

fn hidden(scheduler: &EventScheduler, player: PlayerId) -> bool {
    scheduler
        .world()
        .player(player)
        .unwrap()
        .lock()
        .unwrap()
        .hidden
}

#[test]
fn finished_instance_stays_while_it_holds_the_player() {
    let (mut scheduler, sink) = scheduler_with(InMemoryDescriptors::new());
    let player = join(&mut scheduler, "Ayumi");
    let event = EventId::new();
    let instance = scheduler
        .start_event(player, event, page(vec![Command::HoldPlayer, text("Stay")]))
        .unwrap()
        .unwrap();

    let report = scheduler.tick();
    assert_eq!(report.advanced, 1);
    assert!(scheduler.is_player_held(player));
    sink.drain();

    assert!(scheduler.respond(player, instance, &EventResponse::Continue).unwrap());
    let report = scheduler.tick();

    assert_eq!(report.completed, 0);
    assert_eq!(scheduler.instance_count(), 1);
    assert!(!scheduler.instances(player)[0].is_running());
    assert!(scheduler.is_player_held(player));

    assert_eq!(scheduler.release_player(player), 1);
    assert_eq!(scheduler.instance_count(), 0);
    assert!(!scheduler.is_player_held(player));
    assert!(
        sink.drain()
            .iter()
            .any(|(_, n)| *n == Notification::ReleasePlayer { event })
    );
}

#[test]
fn scripted_release_lets_the_instance_complete() {
    let (mut scheduler, _) = scheduler_with(InMemoryDescriptors::new());
    let player = join(&mut scheduler, "Ayumi");
    scheduler
        .start_event(
            player,
            EventId::new(),
            page(vec![Command::HoldPlayer, Command::ReleasePlayer]),
        )
        .unwrap();

    let report = scheduler.tick();

    assert_eq!(report.completed, 1);
    assert_eq!(scheduler.instance_count(), 0);
    assert!(!scheduler.is_player_held(player));
}

#[test]
fn same_event_is_not_started_twice_for_a_player() {
    let (mut scheduler, _) = scheduler_with(InMemoryDescriptors::new());
    let player = join(&mut scheduler, "Ayumi");
    let event = EventId::new();
    let script = page(vec![text("Hello")]);

    assert!(scheduler.start_event(player, event, script.clone()).unwrap().is_some());
    assert!(scheduler.start_event(player, event, script).unwrap().is_none());
    assert_eq!(scheduler.instance_count(), 1);
}

#[test]
fn failing_instance_is_terminated_alone() {
    let (mut scheduler, _) = scheduler_with(InMemoryDescriptors::new());
    let player = join(&mut scheduler, "Ayumi");
    let healthy = EventId::new();
    scheduler
        .start_event(player, EventId::new(), page(vec![Command::Unsupported]))
        .unwrap();
    scheduler
        .start_event(player, healthy, page(vec![Command::StopSounds, text("Still here")]))
        .unwrap();

    let report = scheduler.tick();

    assert_eq!(report.failed, 1);
    assert_eq!(scheduler.instance_count(), 1);
    assert!(scheduler.is_running(player, healthy));
}

#[test]
fn response_for_unknown_instance_is_ignored() {
    let (mut scheduler, _) = scheduler_with(InMemoryDescriptors::new());
    let player = join(&mut scheduler, "Ayumi");

    let accepted = scheduler
        .respond(player, InstanceId::new(), &EventResponse::Continue)
        .unwrap();

    assert!(!accepted);
}

#[test]
fn disconnect_cancels_instances_and_despawns_npcs() {
    let npc = NpcId::new();
    let descriptors = InMemoryDescriptors::new().with_npc(NpcDescriptor {
        id: npc,
        name: "Slime".to_string(),
        sprite: String::new(),
    });
    let (mut scheduler, _) = scheduler_with(descriptors);
    let player = join(&mut scheduler, "Ayumi");
    {
        let handle = scheduler.world().player(player).unwrap();
        let mut guard = handle.lock().unwrap();
        guard.x = 5;
        guard.y = 5;
    }
    let spawn = Command::SpawnNpc {
        npc,
        at: SpawnTarget::Relative {
            event: None,
            dx: 0,
            dy: -1,
            relative_to_facing: false,
        },
    };
    scheduler
        .start_event(player, EventId::new(), page(vec![spawn, text("Careful")]))
        .unwrap();
    scheduler.tick();
    assert_eq!(scheduler.world().npcs().count(), 1);

    let cancelled = scheduler.disconnect(player).unwrap();

    assert_eq!(cancelled, 1);
    assert_eq!(scheduler.instance_count(), 0);
    assert_eq!(scheduler.world().npcs().count(), 0);
    assert!(!scheduler.world().is_online(player));
}

#[test]
fn global_self_switch_reaches_every_clone() {
    let (mut scheduler, _) = scheduler_with(InMemoryDescriptors::new());
    let map = MapId::new();
    let founder = join(&mut scheduler, "Ayumi");
    let visitor = join(&mut scheduler, "Kenji");
    let guild = scheduler.world_mut().add_guild(Guild::new("Owls", founder));
    for (player, in_guild) in [(founder, true), (visitor, false)] {
        let handle = scheduler.world().player(player).unwrap();
        let mut guard = handle.lock().unwrap();
        guard.map = map;
        if in_guild {
            guard.guild = Some(guild);
        }
    }

    let then = BranchId::new();
    let script = Arc::new(
        PageBuilder::new("statue")
            .root(vec![
                Command::ConditionalBranch {
                    condition: Condition::new(ConditionKind::InGuild),
                    branch_ids: vec![then],
                },
                text("The statue hums"),
            ])
            .list(then, vec![Command::SetSelfSwitch { switch: 2, value: true }])
            .build()
            .unwrap(),
    );
    let event = EventId::new();
    let started = scheduler.start_global(event, map, script, [false; 4]);
    assert_eq!(started.len(), 2);

    scheduler.tick();

    for player in [founder, visitor] {
        let clone = &scheduler.instances(player)[0];
        assert!(clone.is_global());
        assert!(clone.self_switch(2));
    }
}

#[test]
fn route_completion_releases_watchers_of_every_player() {
    let (mut scheduler, _) = scheduler_with(InMemoryDescriptors::new());
    let map = MapId::new();
    let event = EventId::new();
    scheduler.world_mut().add_map_event(MapEvent {
        id: event,
        map,
        x: 3,
        y: 3,
        dir: Direction::Down,
        move_route: Some(Default::default()),
    });
    let first = join(&mut scheduler, "Ayumi");
    let second = join(&mut scheduler, "Kenji");
    for player in [first, second] {
        scheduler
            .start_event(
                player,
                EventId::new(),
                page(vec![Command::WaitForRoute { target: event }, Command::HidePlayer]),
            )
            .unwrap();
    }
    scheduler.tick();
    assert!(!hidden(&scheduler, first));

    let released = scheduler
        .signal(
            first,
            Signal::RouteCompleted(RouteTarget {
                entity: RouteEntity::Event(event),
                map,
            }),
        )
        .unwrap();

    assert_eq!(released, 2);
    assert!(scheduler.world().map_event(event).unwrap().move_route.is_none());
    let report = scheduler.tick();
    assert_eq!(report.completed, 2);
    assert!(hidden(&scheduler, first));
    assert!(hidden(&scheduler, second));
}

#[test]
fn session_signal_only_concerns_its_player() {
    let (mut scheduler, _) = scheduler_with(InMemoryDescriptors::new());
    let first = join(&mut scheduler, "Ayumi");
    let second = join(&mut scheduler, "Kenji");
    for player in [first, second] {
        scheduler
            .start_event(player, EventId::new(), page(vec![Command::OpenBank]))
            .unwrap();
    }
    scheduler.tick();

    let released = scheduler
        .signal(first, Signal::SessionClosed(SessionKind::Bank))
        .unwrap();

    assert_eq!(released, 1);
    scheduler.tick();
    assert!(scheduler.instances(first).is_empty());
    assert_eq!(scheduler.instances(second).len(), 1);
}

#[test]
fn variable_change_starts_listening_common_event_on_next_tick() {
    let variable = VariableId::new();
    let listener = EventId::new();
    let descriptors = InMemoryDescriptors::new()
        .with_variable(VariableDescriptor {
            id: variable,
            scope: VariableScope::Player,
            name: "gold".to_string(),
            data_type: VariableDataType::Integer,
            text_id: "gold".to_string(),
        })
        .with_common_event(CommonEventDescriptor {
            id: listener,
            name: "on gold".to_string(),
            pages: vec![CommonEventPage {
                trigger: CommonEventTrigger::PlayerVariableChange(variable),
                conditions: vec![],
                page: page(vec![Command::HidePlayer]),
            }],
        });
    let (mut scheduler, _) = scheduler_with(descriptors);
    let player = join(&mut scheduler, "Ayumi");
    scheduler
        .start_event(
            player,
            EventId::new(),
            page(vec![
                Command::SetVariable {
                    variable: VariableRef::player(variable),
                    modification: VariableMod::Integer(IntegerMod::Set(5)),
                    sync_party: false,
                },
                text("Paid"),
            ]),
        )
        .unwrap();

    let report = scheduler.tick();
    assert_eq!(report.started, 1);
    assert!(scheduler.is_running(player, listener));
    assert!(!hidden(&scheduler, player));

    scheduler.tick();
    assert!(hidden(&scheduler, player));
    assert!(!scheduler.is_running(player, listener));
}

#[test]
fn explicit_common_event_uses_last_page_whose_conditions_hold() {
    let event = EventId::new();
    let descriptors = InMemoryDescriptors::new().with_common_event(CommonEventDescriptor {
        id: event,
        name: "greeter".to_string(),
        pages: vec![
            CommonEventPage {
                trigger: CommonEventTrigger::None,
                conditions: vec![],
                page: page(vec![Command::HidePlayer]),
            },
            CommonEventPage {
                trigger: CommonEventTrigger::None,
                conditions: vec![Condition::new(ConditionKind::InGuild)],
                page: page(vec![Command::ShowPlayer]),
            },
        ],
    });
    let (mut scheduler, _) = scheduler_with(descriptors);
    let player = join(&mut scheduler, "Ayumi");

    assert!(scheduler.start_common_event(player, event).unwrap().is_some());
    assert!(scheduler.start_common_event(player, EventId::new()).unwrap().is_none());
    scheduler.tick();

    assert!(hidden(&scheduler, player));
}

#[test]
fn unloading_a_map_cancels_its_events() {
    let (mut scheduler, _) = scheduler_with(InMemoryDescriptors::new());
    let player = join(&mut scheduler, "Ayumi");
    let map = scheduler.world().player(player).unwrap().lock().unwrap().map;
    scheduler
        .start_event(player, EventId::new(), page(vec![text("Hi")]))
        .unwrap();

    assert_eq!(scheduler.unload_map(MapId::new()), 0);
    assert_eq!(scheduler.unload_map(map), 1);
    assert_eq!(scheduler.instance_count(), 0);
}
