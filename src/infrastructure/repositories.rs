//! Infrastructure implementations of repository traits

use crate::domain::entities::Page;
use crate::domain::repositories::{
    PageRepository, PersistedRecord, PersistenceKey, RepositoryError, VariablePersistence,
};
use crate::domain::value_objects::PageId;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Read and validate a page stored as JSON
pub async fn load_page_file(path: impl AsRef<Path>) -> Result<Page, RepositoryError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RepositoryError::IoError {
            message: format!("Failed to read page file {}: {}", path.display(), e),
        })?;
    let page: Page = serde_json::from_str(&content).map_err(|e| RepositoryError::InvalidFormat {
        message: format!("Failed to parse page file {}: {}", path.display(), e),
    })?;
    page.validate()?;
    Ok(page)
}

/// File system implementation of PageRepository, one `{id}.json` per page
pub struct FileSystemPageRepository {
    base_path: PathBuf,
}

impl FileSystemPageRepository {
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn page_path(&self, id: PageId) -> PathBuf {
        self.base_path.join(format!("{id}.json"))
    }
}

#[async_trait]
impl PageRepository for FileSystemPageRepository {
    async fn load_page(&self, id: PageId) -> Result<Page, RepositoryError> {
        let path = self.page_path(id);
        if !path.exists() {
            return Err(RepositoryError::not_found(id));
        }
        load_page_file(&path).await
    }

    async fn save_page(&self, page: &Page) -> Result<(), RepositoryError> {
        tokio::fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| RepositoryError::IoError {
                message: format!("Failed to create page directory: {e}"),
            })?;

        let json = serde_json::to_string_pretty(page).map_err(|e| {
            RepositoryError::SerializationError {
                message: format!("Failed to serialize page: {e}"),
            }
        })?;

        let path = self.page_path(page.id());
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| RepositoryError::IoError {
                message: format!("Failed to write page file {}: {}", path.display(), e),
            })
    }

    async fn page_exists(&self, id: PageId) -> Result<bool, RepositoryError> {
        Ok(self.page_path(id).exists())
    }

    async fn list_pages(&self) -> Result<Vec<PageId>, RepositoryError> {
        let mut pages = Vec::new();

        let mut entries =
            tokio::fs::read_dir(&self.base_path)
                .await
                .map_err(|e| RepositoryError::IoError {
                    message: format!(
                        "Failed to read directory {}: {}",
                        self.base_path.display(),
                        e
                    ),
                })?;

        while let Some(entry) =
            entries
                .next_entry()
                .await
                .map_err(|e| RepositoryError::IoError {
                    message: format!("Failed to read directory entry: {e}"),
                })?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && let Ok(id) = uuid::Uuid::parse_str(stem)
            {
                pages.push(PageId::from(id));
            }
        }

        pages.sort();
        Ok(pages)
    }
}

/// In-memory implementation for testing
#[derive(Default)]
pub struct InMemoryPageRepository {
    pages: Mutex<HashMap<PageId, Page>>,
}

impl InMemoryPageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, page: Page) {
        if let Ok(mut pages) = self.pages.lock() {
            pages.insert(page.id(), page);
        }
    }

    fn pages(&self) -> Result<std::sync::MutexGuard<'_, HashMap<PageId, Page>>, RepositoryError> {
        self.pages.lock().map_err(|_| RepositoryError::Unavailable {
            reason: "page store lock is poisoned".to_string(),
        })
    }
}

#[async_trait]
impl PageRepository for InMemoryPageRepository {
    async fn load_page(&self, id: PageId) -> Result<Page, RepositoryError> {
        self.pages()?
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(id))
    }

    async fn save_page(&self, page: &Page) -> Result<(), RepositoryError> {
        page.validate()?;
        self.pages()?.insert(page.id(), page.clone());
        Ok(())
    }

    async fn page_exists(&self, id: PageId) -> Result<bool, RepositoryError> {
        Ok(self.pages()?.contains_key(&id))
    }

    async fn list_pages(&self) -> Result<Vec<PageId>, RepositoryError> {
        let mut pages: Vec<PageId> = self.pages()?.keys().copied().collect();
        pages.sort();
        Ok(pages)
    }
}

/// Persistence collaborator backed by one JSON file.
///
/// Stored records are merged by key, so the file always holds the latest
/// value of every variable and quest.
pub struct JsonVariablePersistence {
    path: PathBuf,
}

impl JsonVariablePersistence {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<Vec<PersistedRecord>, RepositoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| RepositoryError::IoError {
                message: format!("Failed to read {}: {}", self.path.display(), e),
            })?;
        serde_json::from_str(&content).map_err(|e| RepositoryError::SerializationError {
            message: format!("Failed to deserialize records: {e}"),
        })
    }
}

#[async_trait]
impl VariablePersistence for JsonVariablePersistence {
    async fn store(&self, records: &[PersistedRecord]) -> Result<(), RepositoryError> {
        let mut merged: BTreeMap<PersistenceKey, PersistedRecord> = self
            .read()
            .await?
            .into_iter()
            .map(|record| (record.key(), record))
            .collect();
        for record in records {
            merged.insert(record.key(), record.clone());
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RepositoryError::IoError {
                    message: format!("Failed to create persistence directory: {e}"),
                })?;
        }

        let records: Vec<&PersistedRecord> = merged.values().collect();
        let json = serde_json::to_string_pretty(&records).map_err(|e| {
            RepositoryError::SerializationError {
                message: format!("Failed to serialize records: {e}"),
            }
        })?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| RepositoryError::IoError {
                message: format!("Failed to write {}: {}", self.path.display(), e),
            })
    }

    async fn load_all(&self) -> Result<Vec<PersistedRecord>, RepositoryError> {
        self.read().await
    }
}

/// In-memory persistence collaborator for testing
#[derive(Default)]
pub struct InMemoryVariablePersistence {
    records: Mutex<BTreeMap<PersistenceKey, PersistedRecord>>,
    unavailable: Mutex<bool>,
}

impl InMemoryVariablePersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following store fail until re-enabled
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut flag) = self.unavailable.lock() {
            *flag = unavailable;
        }
    }

    pub fn records(&self) -> Vec<PersistedRecord> {
        self.records
            .lock()
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VariablePersistence for InMemoryVariablePersistence {
    async fn store(&self, records: &[PersistedRecord]) -> Result<(), RepositoryError> {
        if self.unavailable.lock().map(|flag| *flag).unwrap_or(true) {
            return Err(RepositoryError::Unavailable {
                reason: "persistence backend is offline".to_string(),
            });
        }
        let mut stored = self.records.lock().map_err(|_| RepositoryError::Unavailable {
            reason: "record store lock is poisoned".to_string(),
        })?;
        for record in records {
            stored.insert(record.key(), record.clone());
        }
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<PersistedRecord>, RepositoryError> {
        Ok(self.records())
    }
}
