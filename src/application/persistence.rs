//! Flushing queued shared state to the persistence collaborator

use crate::domain::repositories::{PersistedRecord, RepositoryError, VariablePersistence};
use crate::runtime::world::World;

/// Hand every queued record to `persistence`.
///
/// On failure the records go back into the queue, behind anything queued
/// for the same key in the meantime, and the error is returned.
pub async fn flush(
    world: &mut World,
    persistence: &dyn VariablePersistence,
) -> Result<usize, RepositoryError> {
    let records = world.persistence_mut().drain();
    if records.is_empty() {
        return Ok(0);
    }

    match persistence.store(&records).await {
        Ok(()) => {
            log::info!(target: "eventweave::persistence", "flushed {} records", records.len());
            Ok(records.len())
        }
        Err(err) => {
            log::warn!(
                target: "eventweave::persistence",
                "flush of {} records failed, requeued: {err}",
                records.len()
            );
            world.persistence_mut().requeue(records);
            Err(err)
        }
    }
}

/// Load stored variables and quest progress into the world.
///
/// Records whose guild, account or player is not loaded are skipped.
pub async fn restore(
    world: &mut World,
    persistence: &dyn VariablePersistence,
) -> Result<usize, RepositoryError> {
    let mut restored = 0;
    for record in persistence.load_all().await? {
        let applied = match record {
            PersistedRecord::ServerVariable { id, value } => {
                world.server_variables_mut().insert(id, value);
                true
            }
            PersistedRecord::GuildVariable { guild, id, value } => world
                .guild_mut(guild)
                .map(|guild| guild.variables.insert(id, value))
                .is_some(),
            PersistedRecord::UserVariable { user, id, value } => world
                .user_mut(user)
                .map(|user| user.variables.insert(id, value))
                .is_some(),
            PersistedRecord::Quest {
                player,
                quest,
                progress,
            } => match world.player(player) {
                Some(handle) => {
                    handle.lock()?.quests.insert(quest, progress);
                    true
                }
                None => false,
            },
        };
        if applied {
            restored += 1;
        } else {
            log::debug!(target: "eventweave::persistence", "skipped record without a loaded owner");
        }
    }
    log::info!(target: "eventweave::persistence", "restored {restored} records");
    Ok(restored)
}
