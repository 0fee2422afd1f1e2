//! Maintenance request storage.
//!
//! `RequestStore` is the persistence collaborator behind the save tool.
//! Requests are keyed by id, so saving the same request twice leaves one
//! record behind.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::maintenance::MaintenanceRequest;

/// Persistence backend for maintenance requests.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Insert or replace a request by id.
    async fn save(&self, request: &MaintenanceRequest) -> Result<()>;

    /// Fetch a request by id.
    async fn get(&self, id: Uuid) -> Result<Option<MaintenanceRequest>>;

    /// All stored requests, oldest first.
    async fn list(&self) -> Result<Vec<MaintenanceRequest>>;
}

/// Stores each request as a JSON file named after its id.
pub struct FileRequestStore {
    /// Root directory for request files.
    root: PathBuf,
}

impl FileRequestStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::CreateDirectory(format!("{}: {e}", root.display())))?;

        info!("Maintenance requests stored under {}", root.display());
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn request_path(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    async fn load_file(&self, path: &Path) -> Result<MaintenanceRequest> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", path.display())))?;

        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl RequestStore for FileRequestStore {
    async fn save(&self, request: &MaintenanceRequest) -> Result<()> {
        let path = self.request_path(request.id);
        let content = serde_json::to_string_pretty(request)?;

        // Write atomically
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content)
            .await
            .map_err(|e| StorageError::WriteFile(format!("{}: {e}", temp_path.display())))?;

        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| StorageError::WriteFile(format!("{}: {e}", path.display())))?;

        debug!("Saved maintenance request: {}", request.id);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<MaintenanceRequest>> {
        let path = self.request_path(id);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        self.load_file(&path).await.map(Some)
    }

    async fn list(&self) -> Result<Vec<MaintenanceRequest>> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", self.root.display())))?;

        let mut requests = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::ReadFile(format!("{e}")))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match self.load_file(&path).await {
                    Ok(request) => requests.push(request),
                    Err(e) => warn!("Failed to load request {}: {e}", path.display()),
                }
            }
        }

        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(requests)
    }
}

/// Keeps requests in memory. Useful for tests and ephemeral deployments.
#[derive(Default)]
pub struct InMemoryRequestStore {
    requests: RwLock<HashMap<Uuid, MaintenanceRequest>>,
}

impl InMemoryRequestStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn save(&self, request: &MaintenanceRequest) -> Result<()> {
        self.requests
            .write()
            .await
            .insert(request.id, request.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<MaintenanceRequest>> {
        Ok(self.requests.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<MaintenanceRequest>> {
        let mut requests: Vec<MaintenanceRequest> =
            self.requests.read().await.values().cloned().collect();
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn leak_request() -> MaintenanceRequest {
        MaintenanceRequest::new(1, "Oceanview Inn", "Leaking pipe under the sink")
            .with_room_number(204)
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileRequestStore::new(temp_dir.path().join("requests"))
            .await
            .unwrap();

        let request = leak_request();
        store.save(&request).await.unwrap();

        let loaded = store.get(request.id).await.unwrap();
        assert_eq!(loaded, Some(request));
    }

    #[tokio::test]
    async fn test_file_store_save_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileRequestStore::new(temp_dir.path()).await.unwrap();

        let request = leak_request();
        store.save(&request).await.unwrap();
        store.save(&request).await.unwrap();

        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_file_store_missing_id() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileRequestStore::new(temp_dir.path()).await.unwrap();
        assert_eq!(store.get(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryRequestStore::new();
        let request = leak_request();
        store.save(&request).await.unwrap();
        store.save(&request).await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec![request]);
    }
}
