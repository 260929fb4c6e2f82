//! Variable mutation tests across scopes

use eventweave::application::api::RecordingSink;
use eventweave::config::EngineConfig;
use eventweave::domain::commands::{BooleanMod, CombineOp, Command, IntegerMod, StringMod, VariableMod};
use eventweave::domain::descriptors::{CommonEventTrigger, VariableDescriptor};
use eventweave::domain::entities::{EventInstance, PageBuilder};
use eventweave::domain::player::{Player, UserAccount};
use eventweave::domain::repositories::PersistenceKey;
use eventweave::domain::value_objects::*;
use eventweave::infrastructure::descriptors::InMemoryDescriptors;
use eventweave::runtime::world::{CommonEventRequest, World};
use eventweave::runtime::{StepOutcome, step};
use std::sync::Arc;

struct Vars {
    gold: VariableId,
    motto: VariableId,
    flag: VariableId,
    bounty: VariableId,
    festival: VariableId,
    treasury: VariableId,
    renown: VariableId,
}

fn descriptor(id: VariableId, scope: VariableScope, data_type: VariableDataType, text_id: &str) -> VariableDescriptor {
    VariableDescriptor {
        id,
        scope,
        name: text_id.to_string(),
        data_type,
        text_id: text_id.to_string(),
    }
}

fn world() -> (World, Vars) {
    let vars = Vars {
        gold: VariableId::new(),
        motto: VariableId::new(),
        flag: VariableId::new(),
        bounty: VariableId::new(),
        festival: VariableId::new(),
        treasury: VariableId::new(),
        renown: VariableId::new(),
    };
    let descriptors = InMemoryDescriptors::new()
        .with_variable(descriptor(vars.gold, VariableScope::Player, VariableDataType::Integer, "gold"))
        .with_variable(descriptor(vars.motto, VariableScope::Player, VariableDataType::String, "motto"))
        .with_variable(descriptor(vars.flag, VariableScope::Player, VariableDataType::Boolean, "flag"))
        .with_variable(descriptor(vars.bounty, VariableScope::Server, VariableDataType::Integer, "bounty"))
        .with_variable(descriptor(vars.festival, VariableScope::Server, VariableDataType::Boolean, "festival"))
        .with_variable(descriptor(vars.treasury, VariableScope::Guild, VariableDataType::Integer, "treasury"))
        .with_variable(descriptor(vars.renown, VariableScope::User, VariableDataType::Integer, "renown"));
    let config = EngineConfig {
        rng_seed: Some(7),
        ..EngineConfig::default()
    };
    let world = World::new(config, Arc::new(descriptors), Arc::new(RecordingSink::new()));
    (world, vars)
}

fn join(world: &mut World, name: &str, online: bool) -> PlayerId {
    let user = UserAccount::new(name);
    let player = Player::new(name, user.id, 35, 35);
    world.add_user(user);
    let id = world.add_player(player);
    world.set_online(id, online);
    id
}

fn set(variable: VariableRef, modification: VariableMod) -> Command {
    Command::SetVariable {
        variable,
        modification,
        sync_party: false,
    }
}

/// Run a one-page script to completion; none of these scripts suspend
fn run(world: &mut World, player: PlayerId, commands: Vec<Command>) {
    let page = PageBuilder::new("vars").root(commands).build().unwrap();
    let mut instance = EventInstance::new(EventId::new(), player, Arc::new(page));
    while step(world, &mut instance).unwrap() != StepOutcome::Completed {}
}

fn player_value(world: &World, player: PlayerId, id: VariableId) -> Option<VariableValue> {
    world
        .player(player)
        .unwrap()
        .lock()
        .unwrap()
        .variable(id)
        .cloned()
}

#[test]
fn division_by_zero_leaves_value_and_fires_nothing() {
    let (mut world, vars) = world();
    let player = join(&mut world, "Ayumi", true);
    let gold = VariableRef::player(vars.gold);
    run(&mut world, player, vec![set(gold, VariableMod::Integer(IntegerMod::Set(10)))]);
    world.drain_common_event_requests();

    run(&mut world, player, vec![set(gold, VariableMod::Integer(IntegerMod::Divide(0)))]);

    assert_eq!(player_value(&world, player, vars.gold), Some(VariableValue::Integer(10)));
    assert_eq!(world.pending_common_events().count(), 0);
}

#[test]
fn player_change_triggers_only_that_player() {
    let (mut world, vars) = world();
    let player = join(&mut world, "Ayumi", true);
    join(&mut world, "Kenji", true);

    run(
        &mut world,
        player,
        vec![set(VariableRef::player(vars.gold), VariableMod::Integer(IntegerMod::Add(3)))],
    );

    assert_eq!(
        world.drain_common_event_requests(),
        vec![CommonEventRequest::Trigger {
            player,
            trigger: CommonEventTrigger::PlayerVariableChange(vars.gold),
        }]
    );
    assert!(world.persistence().is_empty());
}

#[test]
fn server_change_triggers_online_players_and_persists_once() {
    let (mut world, vars) = world();
    let player = join(&mut world, "Ayumi", true);
    join(&mut world, "Kenji", true);
    join(&mut world, "Sleeper", false);
    let bounty = VariableRef::server(vars.bounty);

    run(&mut world, player, vec![set(bounty, VariableMod::Integer(IntegerMod::Set(3)))]);

    assert_eq!(world.server_variables().get(&vars.bounty), Some(&VariableValue::Integer(3)));
    assert_eq!(world.drain_common_event_requests().len(), 2);
    assert_eq!(world.persistence().len(), 1);
    assert!(world.persistence().contains(&PersistenceKey::ServerVariable(vars.bounty)));

    world.persistence_mut().drain();
    run(&mut world, player, vec![set(bounty, VariableMod::Integer(IntegerMod::Set(3)))]);

    assert_eq!(world.pending_common_events().count(), 0);
    assert!(world.persistence().is_empty());
}

#[test]
fn user_change_triggers_the_accounts_online_players_and_persists() {
    let (mut world, vars) = world();
    let main = join(&mut world, "Ayumi", true);
    join(&mut world, "Kenji", true);
    let user = world.player(main).unwrap().lock().unwrap().user;
    let alt = world.add_player(Player::new("Ayumi alt", user, 35, 35));
    world.set_online(alt, true);
    let resting = world.add_player(Player::new("Ayumi rest", user, 35, 35));
    world.set_online(resting, false);

    run(
        &mut world,
        main,
        vec![set(VariableRef::user(vars.renown), VariableMod::Integer(IntegerMod::Add(5)))],
    );

    assert_eq!(
        world.user(user).unwrap().variables.get(&vars.renown),
        Some(&VariableValue::Integer(5))
    );
    let trigger = CommonEventTrigger::UserVariableChange(vars.renown);
    let mut triggered: Vec<PlayerId> = world
        .drain_common_event_requests()
        .into_iter()
        .map(|request| match request {
            CommonEventRequest::Trigger { player, trigger: fired } => {
                assert_eq!(fired, trigger);
                player
            }
            other => panic!("unexpected request {other:?}"),
        })
        .collect();
    triggered.sort();
    let mut expected = vec![main, alt];
    expected.sort();
    assert_eq!(triggered, expected);
    assert!(world.persistence().contains(&PersistenceKey::UserVariable(user, vars.renown)));
}

#[test]
fn party_sync_replicates_to_members_that_differ() {
    let (mut world, vars) = world();
    let leader = join(&mut world, "Ayumi", true);
    let member = join(&mut world, "Kenji", true);
    for id in [leader, member] {
        world.player(id).unwrap().lock().unwrap().party = vec![leader, member];
    }
    let command = Command::SetVariable {
        variable: VariableRef::player(vars.gold),
        modification: VariableMod::Integer(IntegerMod::Set(7)),
        sync_party: true,
    };

    run(&mut world, leader, vec![command.clone()]);

    assert_eq!(player_value(&world, member, vars.gold), Some(VariableValue::Integer(7)));
    let triggered: Vec<PlayerId> = world
        .drain_common_event_requests()
        .into_iter()
        .filter_map(|request| match request {
            CommonEventRequest::Trigger { player, .. } => Some(player),
            CommonEventRequest::Start { .. } => None,
        })
        .collect();
    assert_eq!(triggered, vec![leader, member]);

    run(&mut world, leader, vec![command]);
    assert_eq!(world.pending_common_events().count(), 0);
}

#[test]
fn string_replace_expands_tokens_in_both_operands() {
    let (mut world, vars) = world();
    let player = join(&mut world, "Ayumi", true);
    let motto = VariableRef::player(vars.motto);

    run(
        &mut world,
        player,
        vec![
            set(motto, VariableMod::String(StringMod::Set("hello stranger".to_string()))),
            set(
                motto,
                VariableMod::String(StringMod::Replace {
                    find: "stranger".to_string(),
                    replace: "\\pn".to_string(),
                }),
            ),
        ],
    );

    assert_eq!(
        player_value(&world, player, vars.motto),
        Some(VariableValue::String("hello Ayumi".to_string()))
    );
}

#[test]
fn empty_find_text_is_skipped() {
    let (mut world, vars) = world();
    let player = join(&mut world, "Ayumi", true);
    let motto = VariableRef::player(vars.motto);

    run(
        &mut world,
        player,
        vec![
            set(motto, VariableMod::String(StringMod::Set("abc".to_string()))),
            set(
                motto,
                VariableMod::String(StringMod::Replace {
                    find: String::new(),
                    replace: "x".to_string(),
                }),
            ),
        ],
    );

    assert_eq!(
        player_value(&world, player, vars.motto),
        Some(VariableValue::String("abc".to_string()))
    );
}

#[test]
fn values_are_copied_and_combined_across_scopes() {
    let (mut world, vars) = world();
    let player = join(&mut world, "Ayumi", true);

    run(
        &mut world,
        player,
        vec![
            set(VariableRef::server(vars.festival), VariableMod::Boolean(BooleanMod::Set(true))),
            set(
                VariableRef::player(vars.flag),
                VariableMod::Boolean(BooleanMod::Duplicate(VariableRef::server(vars.festival))),
            ),
            set(VariableRef::server(vars.bounty), VariableMod::Integer(IntegerMod::Set(4))),
            set(VariableRef::player(vars.gold), VariableMod::Integer(IntegerMod::Set(6))),
            set(
                VariableRef::player(vars.gold),
                VariableMod::Integer(IntegerMod::Combine {
                    op: CombineOp::Multiply,
                    source: VariableRef::server(vars.bounty),
                }),
            ),
        ],
    );

    assert_eq!(player_value(&world, player, vars.flag), Some(VariableValue::Boolean(true)));
    assert_eq!(player_value(&world, player, vars.gold), Some(VariableValue::Integer(24)));
}

#[test]
fn mismatched_type_and_missing_guild_are_ignored() {
    let (mut world, vars) = world();
    let player = join(&mut world, "Ayumi", true);

    run(
        &mut world,
        player,
        vec![
            set(VariableRef::player(vars.gold), VariableMod::Boolean(BooleanMod::Set(true))),
            set(VariableRef::guild(vars.treasury), VariableMod::Integer(IntegerMod::Set(50))),
            set(VariableRef::player(VariableId::new()), VariableMod::Integer(IntegerMod::Set(1))),
        ],
    );

    assert_eq!(player_value(&world, player, vars.gold), None);
    assert_eq!(world.pending_common_events().count(), 0);
    assert!(world.persistence().is_empty());
}

#[test]
fn random_values_stay_in_range_even_when_bounds_are_swapped() {
    let (mut world, vars) = world();
    let player = join(&mut world, "Ayumi", true);
    let gold = VariableRef::player(vars.gold);

    for _ in 0..20 {
        run(&mut world, player, vec![set(gold, VariableMod::Integer(IntegerMod::Random { low: 3, high: 1 }))]);
        let value = player_value(&world, player, vars.gold)
            .and_then(|value| value.as_integer())
            .unwrap();
        assert!((1..=3).contains(&value));
    }
}
