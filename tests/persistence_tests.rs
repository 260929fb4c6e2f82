//! Persistence flushing, restoring and page storage

use eventweave::application::api::RecordingSink;
use eventweave::application::persistence::{flush, restore};
use eventweave::config::EngineConfig;
use eventweave::domain::commands::{Command, IntegerMod, VariableMod};
use eventweave::domain::descriptors::VariableDescriptor;
use eventweave::domain::entities::{EventInstance, PageBuilder};
use eventweave::domain::player::{Guild, Player, QuestProgress, UserAccount};
use eventweave::domain::repositories::{PageRepository, PersistedRecord, RepositoryError, VariablePersistence};
use eventweave::domain::value_objects::*;
use eventweave::infrastructure::descriptors::InMemoryDescriptors;
use eventweave::infrastructure::repositories::{
    FileSystemPageRepository, InMemoryPageRepository, InMemoryVariablePersistence, JsonVariablePersistence, load_page_file,
};
use eventweave::runtime::world::World;
use eventweave::runtime::{StepOutcome, step};
use std::path::PathBuf;
use std::sync::Arc;

fn scratch_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("eventweave-{name}-{}", uuid::Uuid::new_v4()))
}

fn world_with_bounty(bounty: VariableId) -> (World, PlayerId) {
    let descriptors = InMemoryDescriptors::new().with_variable(VariableDescriptor {
        id: bounty,
        scope: VariableScope::Server,
        name: "bounty".to_string(),
        data_type: VariableDataType::Integer,
        text_id: "bounty".to_string(),
    });
    let mut world = World::new(
        EngineConfig::default(),
        Arc::new(descriptors),
        Arc::new(RecordingSink::new()),
    );
    let user = UserAccount::new("tester");
    let player = Player::new("Tester", user.id, 35, 35);
    world.add_user(user);
    let player = world.add_player(player);
    world.set_online(player, true);
    (world, player)
}

fn raise_bounty(world: &mut World, player: PlayerId, bounty: VariableId, amount: i64) {
    let page = PageBuilder::new("bounty")
        .root(vec![Command::SetVariable {
            variable: VariableRef::server(bounty),
            modification: VariableMod::Integer(IntegerMod::Add(amount)),
            sync_party: false,
        }])
        .build()
        .unwrap();
    let mut instance = EventInstance::new(EventId::new(), player, Arc::new(page));
    while step(world, &mut instance).unwrap() != StepOutcome::Completed {}
}

#[tokio::test]
async fn flush_hands_latest_values_to_the_backend() {
    let bounty = VariableId::new();
    let (mut world, player) = world_with_bounty(bounty);
    raise_bounty(&mut world, player, bounty, 5);
    raise_bounty(&mut world, player, bounty, 5);
    assert_eq!(world.persistence().len(), 1);

    let backend = InMemoryVariablePersistence::new();
    let flushed = flush(&mut world, &backend).await.unwrap();

    assert_eq!(flushed, 1);
    assert!(world.persistence().is_empty());
    assert_eq!(
        backend.records(),
        vec![PersistedRecord::ServerVariable {
            id: bounty,
            value: VariableValue::Integer(10),
        }]
    );
    assert_eq!(flush(&mut world, &backend).await.unwrap(), 0);
}

#[tokio::test]
async fn failed_flush_requeues_records() {
    let bounty = VariableId::new();
    let (mut world, player) = world_with_bounty(bounty);
    raise_bounty(&mut world, player, bounty, 1);
    let backend = InMemoryVariablePersistence::new();
    backend.set_unavailable(true);

    let result = flush(&mut world, &backend).await;

    assert!(matches!(result, Err(RepositoryError::Unavailable { .. })));
    assert_eq!(world.persistence().len(), 1);
    assert!(backend.records().is_empty());

    backend.set_unavailable(false);
    assert_eq!(flush(&mut world, &backend).await.unwrap(), 1);
}

#[tokio::test]
async fn json_persistence_merges_records_by_key() {
    let dir = scratch_dir("vars");
    let backend = JsonVariablePersistence::new(dir.join("state").join("variables.json"));
    let bounty = VariableId::new();
    let motd = VariableId::new();

    assert!(backend.load_all().await.unwrap().is_empty());
    backend
        .store(&[
            PersistedRecord::ServerVariable {
                id: bounty,
                value: VariableValue::Integer(1),
            },
            PersistedRecord::ServerVariable {
                id: motd,
                value: VariableValue::from("welcome"),
            },
        ])
        .await
        .unwrap();
    backend
        .store(&[PersistedRecord::ServerVariable {
            id: bounty,
            value: VariableValue::Integer(2),
        }])
        .await
        .unwrap();

    let records = backend.load_all().await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.contains(&PersistedRecord::ServerVariable {
        id: bounty,
        value: VariableValue::Integer(2),
    }));

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn restore_applies_records_with_loaded_owners() {
    let bounty = VariableId::new();
    let (mut world, player) = world_with_bounty(bounty);
    let guild = world.add_guild(Guild::new("Owls", player));
    let quest = QuestId::new();
    let progress = QuestProgress {
        task: Some(TaskId::new()),
        completed: false,
        completion_count: 0,
    };
    let backend = InMemoryVariablePersistence::new();
    backend
        .store(&[
            PersistedRecord::ServerVariable {
                id: bounty,
                value: VariableValue::Integer(9),
            },
            PersistedRecord::GuildVariable {
                guild,
                id: VariableId::new(),
                value: VariableValue::Boolean(true),
            },
            PersistedRecord::GuildVariable {
                guild: GuildId::new(),
                id: VariableId::new(),
                value: VariableValue::Boolean(true),
            },
            PersistedRecord::Quest {
                player,
                quest,
                progress: progress.clone(),
            },
        ])
        .await
        .unwrap();

    let restored = restore(&mut world, &backend).await.unwrap();

    assert_eq!(restored, 3);
    assert_eq!(world.server_variables().get(&bounty), Some(&VariableValue::Integer(9)));
    assert_eq!(world.guild(guild).unwrap().variables.len(), 1);
    let handle = world.player(player).unwrap();
    assert_eq!(handle.lock().unwrap().quest(quest), Some(&progress));
}

#[tokio::test]
async fn file_system_pages_round_trip() {
    let dir = scratch_dir("pages");
    let repository = FileSystemPageRepository::new(&dir);
    let page = PageBuilder::new("greeting")
        .root(vec![Command::ShowText {
            text: "Hello".to_string(),
            face: String::new(),
        }])
        .build()
        .unwrap();
    let missing = PageId::new();

    repository.save_page(&page).await.unwrap();

    assert!(repository.page_exists(page.id()).await.unwrap());
    assert!(!repository.page_exists(missing).await.unwrap());
    assert_eq!(repository.list_pages().await.unwrap(), vec![page.id()]);
    let loaded = repository.load_page(page.id()).await.unwrap();
    assert_eq!(loaded.name(), "greeting");
    assert_eq!(loaded.list(loaded.root()), page.list(page.root()));
    assert!(matches!(
        repository.load_page(missing).await,
        Err(RepositoryError::PageNotFound { .. })
    ));

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn in_memory_pages_validate_on_save() {
    let repository = InMemoryPageRepository::new();
    let page = PageBuilder::new("stored").root(vec![Command::HidePlayer]).build().unwrap();
    let later = PageBuilder::new("seeded").root(vec![Command::ShowPlayer]).build().unwrap();

    repository.save_page(&page).await.unwrap();
    repository.add_page(later.clone());

    let mut expected = vec![page.id(), later.id()];
    expected.sort();
    assert_eq!(repository.list_pages().await.unwrap(), expected);
    assert_eq!(repository.load_page(later.id()).await.unwrap(), later);
    assert!(!repository.page_exists(PageId::new()).await.unwrap());
}

#[tokio::test]
async fn malformed_page_file_is_rejected() {
    let dir = scratch_dir("bad");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    let result = load_page_file(&path).await;

    assert!(matches!(result, Err(RepositoryError::InvalidFormat { .. })));
    let _ = std::fs::remove_dir_all(dir);
}
