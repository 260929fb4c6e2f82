//! Tests for the interpreter

use super::*;
use crate::application::api::{Notification, RecordingSink};
use crate::config::EngineConfig;
use crate::domain::commands::{Command, MoveRoute};
use crate::domain::conditions::{Condition, ConditionKind};
use crate::domain::entities::{PageBuilder, Page};
use crate::domain::player::{Player, UserAccount};
use crate::domain::value_objects::{
    BranchId, EventId, FadeType, PlayerId, RouteEntity, RouteTarget, SessionKind,
};
use crate::infrastructure::descriptors::InMemoryDescriptors;
use crate::runtime::world::ManualClock;
use chrono::NaiveDate;

struct Fixture {
    world: World,
    sink: Arc<RecordingSink>,
    clock: Arc<ManualClock>,
    player: PlayerId,
}

fn fixture() -> Fixture {
    let sink = Arc::new(RecordingSink::new());
    let noon = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let clock = Arc::new(ManualClock::new(noon));
    let config = EngineConfig {
        rng_seed: Some(7),
        ..EngineConfig::default()
    };
    let mut world = World::new(config, Arc::new(InMemoryDescriptors::new()), sink.clone())
        .with_clock(clock.clone());
    let user = UserAccount::new("tester");
    let player = Player::new("Tester", user.id, 35, 35);
    world.add_user(user);
    let player = world.add_player(player);
    world.set_online(player, true);
    Fixture {
        world,
        sink,
        clock,
        player,
    }
}

impl Fixture {
    fn instance(&self, page: Page) -> EventInstance {
        EventInstance::new(EventId::new(), self.player, Arc::new(page))
    }

    fn hidden(&self) -> bool {
        self.world.player(self.player).unwrap().lock().unwrap().hidden
    }
}

fn in_guild(else_enabled: bool, negated: bool) -> Condition {
    Condition {
        kind: ConditionKind::InGuild,
        negated,
        else_enabled,
    }
}

fn branch(condition: Condition, branch_ids: Vec<BranchId>) -> Command {
    Command::ConditionalBranch {
        condition,
        branch_ids,
    }
}

fn label(name: &str) -> Command {
    Command::Label {
        label: name.to_string(),
    }
}

#[test]
fn linear_page_advances_once_per_command_and_pops_once() {
    let mut f = fixture();
    let page = PageBuilder::new("linear")
        .root(vec![Command::StopSounds, Command::FadeoutBgm, Command::HidePicture])
        .build()
        .unwrap();
    let mut instance = f.instance(page);

    assert_eq!(step(&mut f.world, &mut instance).unwrap(), StepOutcome::Continue);
    assert_eq!(instance.call_stack().top().unwrap().index(), 1);
    assert_eq!(step(&mut f.world, &mut instance).unwrap(), StepOutcome::Continue);
    assert_eq!(instance.call_stack().top().unwrap().index(), 2);
    assert_eq!(step(&mut f.world, &mut instance).unwrap(), StepOutcome::Completed);
    assert!(instance.call_stack().is_empty());
    assert_eq!(f.sink.len(), 3);
}

#[test]
fn true_condition_enters_first_branch() {
    let mut f = fixture();
    let then = BranchId::new();
    let otherwise = BranchId::new();
    let page = PageBuilder::new("branch")
        .root(vec![branch(in_guild(true, true), vec![then, otherwise]), Command::StopSounds])
        .list(then, vec![Command::HidePlayer])
        .list(otherwise, vec![Command::ShowPlayer])
        .build()
        .unwrap();
    let mut instance = f.instance(page);

    step(&mut f.world, &mut instance).unwrap();

    let top = instance.call_stack().top().unwrap();
    assert_eq!(instance.call_stack().len(), 2);
    assert_eq!(top.list_id(), then);
    assert_eq!(top.index(), 0);
}

#[test]
fn false_condition_with_else_enters_second_branch() {
    let mut f = fixture();
    let then = BranchId::new();
    let otherwise = BranchId::new();
    let page = PageBuilder::new("branch")
        .root(vec![branch(in_guild(true, false), vec![then, otherwise]), Command::StopSounds])
        .list(then, vec![Command::HidePlayer])
        .list(otherwise, vec![Command::ShowPlayer])
        .build()
        .unwrap();
    let mut instance = f.instance(page);

    step(&mut f.world, &mut instance).unwrap();

    let top = instance.call_stack().top().unwrap();
    assert_eq!(top.list_id(), otherwise);
    assert_eq!(top.index(), 0);
}

#[test]
fn false_condition_without_else_continues_past_branch() {
    let mut f = fixture();
    let then = BranchId::new();
    let otherwise = BranchId::new();
    let page = PageBuilder::new("branch")
        .root(vec![branch(in_guild(false, false), vec![then, otherwise]), Command::StopSounds])
        .list(then, vec![Command::HidePlayer])
        .list(otherwise, vec![Command::ShowPlayer])
        .build()
        .unwrap();
    let root = page.root();
    let mut instance = f.instance(page);

    step(&mut f.world, &mut instance).unwrap();

    let top = instance.call_stack().top().unwrap();
    assert_eq!(instance.call_stack().len(), 1);
    assert_eq!(top.list_id(), root);
    assert_eq!(top.index(), 1);
}

#[test]
fn unregistered_branch_pushes_no_frame() {
    let mut f = fixture();
    let page = PageBuilder::new("branch")
        .root(vec![
            branch(in_guild(true, true), vec![BranchId::new(), BranchId::new()]),
            Command::StopSounds,
        ])
        .build()
        .unwrap();
    let mut instance = f.instance(page);

    assert_eq!(step(&mut f.world, &mut instance).unwrap(), StepOutcome::Continue);
    assert_eq!(instance.call_stack().len(), 1);
    assert_eq!(instance.call_stack().top().unwrap().index(), 1);
}

#[test]
fn selected_option_runs_its_branch_then_resumes_after_prompt() {
    let mut f = fixture();
    let lists: Vec<BranchId> = (0..4).map(|_| BranchId::new()).collect();
    let mut builder = PageBuilder::new("options").root(vec![
        Command::ShowOptions {
            text: "Pick one".to_string(),
            face: String::new(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            branch_ids: lists.clone(),
        },
        Command::ShowPlayer,
    ]);
    for list in &lists {
        builder = builder.list(*list, vec![Command::HidePlayer]);
    }
    let page = builder.build().unwrap();
    let root = page.root();
    let mut instance = f.instance(page);

    assert_eq!(
        step(&mut f.world, &mut instance).unwrap(),
        StepOutcome::Suspended(SuspensionKind::Dialogue)
    );
    assert!(matches!(
        f.sink.drain().as_slice(),
        [(_, Notification::ShowOptions { options, .. })] if options.len() == 4
    ));
    assert_eq!(
        step(&mut f.world, &mut instance).unwrap(),
        StepOutcome::Waiting(SuspensionKind::Dialogue)
    );

    assert!(!respond(&mut f.world, &mut instance, &EventResponse::Option(4)).unwrap());
    assert!(respond(&mut f.world, &mut instance, &EventResponse::Option(2)).unwrap());
    let top = instance.call_stack().top().unwrap();
    assert_eq!(top.list_id(), lists[2]);
    assert_eq!(top.index(), 0);

    assert_eq!(step(&mut f.world, &mut instance).unwrap(), StepOutcome::Continue);
    assert!(f.hidden());
    let top = instance.call_stack().top().unwrap();
    assert_eq!(top.list_id(), root);
    assert_eq!(top.index(), 1);

    assert_eq!(step(&mut f.world, &mut instance).unwrap(), StepOutcome::Completed);
    assert!(!f.hidden());
}

#[test]
fn wait_holds_until_deadline_then_runs_one_command() {
    let mut f = fixture();
    let page = PageBuilder::new("wait")
        .root(vec![
            Command::Wait { time_ms: 500 },
            Command::HidePlayer,
            Command::ShowPlayer,
        ])
        .build()
        .unwrap();
    let mut instance = f.instance(page);

    assert_eq!(
        step(&mut f.world, &mut instance).unwrap(),
        StepOutcome::Suspended(SuspensionKind::Timer)
    );
    assert_eq!(instance.wait_deadline(), Some(500));

    f.clock.advance(499);
    assert_eq!(
        tick(&mut f.world, &mut instance, 10).unwrap(),
        StepOutcome::Waiting(SuspensionKind::Timer)
    );
    assert!(!f.hidden());

    f.clock.advance(1);
    assert_eq!(step(&mut f.world, &mut instance).unwrap(), StepOutcome::Continue);
    assert!(f.hidden());
    assert_eq!(instance.call_stack().top().unwrap().index(), 2);
}

#[test]
fn wait_ending_a_branch_resumes_the_parent_list() {
    let mut f = fixture();
    let inner = BranchId::new();
    let page = PageBuilder::new("wait")
        .root(vec![branch(in_guild(false, true), vec![inner]), Command::HidePlayer])
        .list(inner, vec![Command::Wait { time_ms: 500 }])
        .build()
        .unwrap();
    let mut instance = f.instance(page);

    assert_eq!(step(&mut f.world, &mut instance).unwrap(), StepOutcome::Continue);
    assert_eq!(
        step(&mut f.world, &mut instance).unwrap(),
        StepOutcome::Suspended(SuspensionKind::Timer)
    );

    f.clock.advance(500);
    assert_eq!(step(&mut f.world, &mut instance).unwrap(), StepOutcome::Completed);
    assert!(f.hidden());
}

#[test]
fn wait_ending_the_root_list_completes() {
    let mut f = fixture();
    let page = PageBuilder::new("wait")
        .root(vec![Command::Wait { time_ms: 500 }])
        .build()
        .unwrap();
    let mut instance = f.instance(page);
    let started = f.world.now_ms();

    step(&mut f.world, &mut instance).unwrap();
    assert_eq!(instance.wait_deadline(), Some(started + 500));
    f.clock.advance(500);

    assert_eq!(tick(&mut f.world, &mut instance, 1).unwrap(), StepOutcome::Completed);
    assert!(!instance.is_running());
    assert!(instance.is_complete());
    assert_eq!(instance.wait_deadline(), None);
}

#[test]
fn goto_label_discards_branch_frames_and_lands_after_label() {
    let mut f = fixture();
    let inner = BranchId::new();
    let page = PageBuilder::new("goto")
        .root(vec![
            branch(in_guild(false, true), vec![inner]),
            Command::ShowPlayer,
            label("end"),
            Command::HidePlayer,
        ])
        .list(
            inner,
            vec![Command::GoToLabel {
                label: "end".to_string(),
            }],
        )
        .build()
        .unwrap();
    let root = page.root();
    let mut instance = f.instance(page);

    step(&mut f.world, &mut instance).unwrap();
    assert_eq!(instance.call_stack().len(), 2);

    step(&mut f.world, &mut instance).unwrap();
    let top = instance.call_stack().top().unwrap();
    assert_eq!(instance.call_stack().len(), 1);
    assert_eq!(top.list_id(), root);
    assert_eq!(top.index(), 3);

    assert_eq!(step(&mut f.world, &mut instance).unwrap(), StepOutcome::Completed);
    assert!(f.hidden());
}

#[test]
fn missing_label_is_a_no_op() {
    let mut f = fixture();
    let page = PageBuilder::new("goto")
        .root(vec![
            Command::GoToLabel {
                label: "nowhere".to_string(),
            },
            Command::HidePlayer,
        ])
        .build()
        .unwrap();
    let mut instance = f.instance(page);

    assert_eq!(step(&mut f.world, &mut instance).unwrap(), StepOutcome::Continue);
    assert_eq!(instance.call_stack().len(), 1);
    assert_eq!(instance.call_stack().top().unwrap().index(), 1);
}

#[test]
fn exit_event_processing_clears_the_stack() {
    let mut f = fixture();
    let page = PageBuilder::new("exit")
        .root(vec![Command::ExitEventProcessing, Command::HidePlayer])
        .build()
        .unwrap();
    let mut instance = f.instance(page);

    assert_eq!(step(&mut f.world, &mut instance).unwrap(), StepOutcome::Completed);
    assert!(!instance.is_running());
    assert!(!f.hidden());
}

#[test]
fn unsupported_command_is_an_error() {
    let mut f = fixture();
    let page = PageBuilder::new("bad")
        .root(vec![Command::Unsupported])
        .build()
        .unwrap();
    let mut instance = f.instance(page);

    let result = step(&mut f.world, &mut instance);
    assert!(matches!(
        result,
        Err(InterpreterError::Domain(DomainError::UnsupportedCommand { .. }))
    ));
}

#[test]
fn unknown_player_is_an_error() {
    let mut f = fixture();
    let page = PageBuilder::new("lost")
        .root(vec![Command::StopSounds])
        .build()
        .unwrap();
    let stranger = PlayerId::new();
    let mut instance = EventInstance::new(EventId::new(), stranger, Arc::new(page));

    assert_eq!(
        step(&mut f.world, &mut instance),
        Err(InterpreterError::MissingPlayer(stranger))
    );
}

#[test]
fn mismatched_response_is_ignored() {
    let mut f = fixture();
    let page = PageBuilder::new("text")
        .root(vec![Command::ShowText {
            text: "Hi".to_string(),
            face: String::new(),
        }])
        .build()
        .unwrap();
    let mut instance = f.instance(page);
    step(&mut f.world, &mut instance).unwrap();

    assert!(!respond(&mut f.world, &mut instance, &EventResponse::Option(0)).unwrap());
    assert_eq!(instance.suspension(), SuspensionKind::Dialogue);
    assert!(respond(&mut f.world, &mut instance, &EventResponse::Continue).unwrap());
    assert_eq!(step(&mut f.world, &mut instance).unwrap(), StepOutcome::Completed);
}

#[test]
fn signals_release_only_matching_suspensions() {
    let mut f = fixture();
    let page = PageBuilder::new("bank")
        .root(vec![Command::OpenBank, Command::StopSounds])
        .build()
        .unwrap();
    let mut instance = f.instance(page);

    assert_eq!(
        step(&mut f.world, &mut instance).unwrap(),
        StepOutcome::Suspended(SuspensionKind::Session)
    );
    assert!(!release_on_signal(&mut instance, &Signal::FadeCompleted));
    assert!(!release_on_signal(&mut instance, &Signal::SessionClosed(SessionKind::Shop)));
    assert!(release_on_signal(&mut instance, &Signal::SessionClosed(SessionKind::Bank)));
    assert_eq!(step(&mut f.world, &mut instance).unwrap(), StepOutcome::Completed);
}

#[test]
fn signal_on_last_command_completes_the_instance() {
    let mut f = fixture();
    let map = f.world.player(f.player).unwrap().lock().unwrap().map;
    let route = Signal::RouteCompleted(RouteTarget {
        entity: RouteEntity::Player(f.player),
        map,
    });
    let cases = vec![
        (
            vec![
                Command::SetMoveRoute {
                    route: MoveRoute::default(),
                },
                Command::WaitForRoute {
                    target: EventId::nil(),
                },
            ],
            SuspensionKind::Route,
            route,
        ),
        (
            vec![Command::OpenBank],
            SuspensionKind::Session,
            Signal::SessionClosed(SessionKind::Bank),
        ),
        (
            vec![Command::ScreenFade {
                fade: FadeType::FadeOut,
                wait_for_completion: true,
                duration_ms: 250,
            }],
            SuspensionKind::Fade,
            Signal::FadeCompleted,
        ),
    ];

    for (commands, kind, signal) in cases {
        let page = PageBuilder::new("last").root(commands).build().unwrap();
        let mut instance = f.instance(page);

        assert_eq!(
            tick(&mut f.world, &mut instance, 5).unwrap(),
            StepOutcome::Suspended(kind)
        );
        assert!(release_on_signal(&mut instance, &signal));
        assert_eq!(step(&mut f.world, &mut instance).unwrap(), StepOutcome::Completed);
    }
}
