//! Domain repository traits - Abstractions for page storage and persistence

use crate::domain::entities::Page;
use crate::domain::errors::DomainError;
use crate::domain::player::QuestProgress;
use crate::domain::value_objects::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Repository of compiled pages
///
/// Pages are produced by an external authoring step; this trait only
/// describes how the runtime reads them back.
#[async_trait]
pub trait PageRepository: Send + Sync {
    async fn load_page(&self, id: PageId) -> Result<Page, RepositoryError>;

    async fn save_page(&self, page: &Page) -> Result<(), RepositoryError>;

    async fn page_exists(&self, id: PageId) -> Result<bool, RepositoryError>;

    async fn list_pages(&self) -> Result<Vec<PageId>, RepositoryError>;
}

/// Key a queued persistence record is deduplicated by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PersistenceKey {
    ServerVariable(VariableId),
    GuildVariable(GuildId, VariableId),
    UserVariable(UserId, VariableId),
    Quest(PlayerId, QuestId),
}

/// Record handed to the persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PersistedRecord {
    ServerVariable {
        id: VariableId,
        value: VariableValue,
    },
    GuildVariable {
        guild: GuildId,
        id: VariableId,
        value: VariableValue,
    },
    UserVariable {
        user: UserId,
        id: VariableId,
        value: VariableValue,
    },
    Quest {
        player: PlayerId,
        quest: QuestId,
        progress: QuestProgress,
    },
}

impl PersistedRecord {
    pub fn key(&self) -> PersistenceKey {
        match self {
            PersistedRecord::ServerVariable { id, .. } => PersistenceKey::ServerVariable(*id),
            PersistedRecord::GuildVariable { guild, id, .. } => {
                PersistenceKey::GuildVariable(*guild, *id)
            }
            PersistedRecord::UserVariable { user, id, .. } => {
                PersistenceKey::UserVariable(*user, *id)
            }
            PersistedRecord::Quest { player, quest, .. } => PersistenceKey::Quest(*player, *quest),
        }
    }
}

/// Collaborator that stores server, guild, user and quest state
#[async_trait]
pub trait VariablePersistence: Send + Sync {
    async fn store(&self, records: &[PersistedRecord]) -> Result<(), RepositoryError>;

    async fn load_all(&self) -> Result<Vec<PersistedRecord>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Page not found: {id}")]
    PageNotFound {
        id: PageId,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("Serialization error: {message}")]
    SerializationError { message: String },

    #[error("Invalid data format: {message}")]
    InvalidFormat { message: String },

    #[error("Repository unavailable: {reason}")]
    Unavailable { reason: String },
}

impl RepositoryError {
    /// Create a not found error with an optional source
    pub fn not_found(id: PageId) -> Self {
        Self::PageNotFound {
            id,
            source: Some(Box::new(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Page not found",
            ))),
        }
    }
}

impl From<std::io::Error> for RepositoryError {
    fn from(error: std::io::Error) -> Self {
        Self::IoError {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerializationError {
            message: error.to_string(),
        }
    }
}

impl From<DomainError> for RepositoryError {
    fn from(error: DomainError) -> Self {
        Self::InvalidFormat {
            message: error.to_string(),
        }
    }
}
