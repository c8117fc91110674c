//! In-process document store.
//!
//! Useful for development and tests without Firestore access. Optionally
//! mirrors its contents to a JSON snapshot file so data survives restarts.
//!
//! With a snapshot, every mutation is applied to a copy of the map and only
//! becomes visible once the copy has been written to disk.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::error::StoreError;
use super::{Document, DocumentStore, Fields};

/// Collection name → document id → fields.
type Collections = HashMap<String, BTreeMap<String, Fields>>;

/// Document store backed by a map in memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<Collections>>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    /// Create an empty store with no snapshot file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store mirrored to `path`, loading it if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let collections = if path.exists() {
            let json = std::fs::read_to_string(&path).map_err(|e| StoreError::Snapshot {
                message: format!("failed to read {}: {}", path.display(), e),
            })?;
            serde_json::from_str(&json).map_err(|e| StoreError::Snapshot {
                message: format!("failed to parse {}: {}", path.display(), e),
            })?
        } else {
            Collections::new()
        };

        Ok(Self {
            collections: Arc::new(RwLock::new(collections)),
            snapshot: Some(path),
        })
    }

    /// Run `change` under the write lock. With a snapshot file the change
    /// is made on a copy, which replaces the live map only after it has
    /// been persisted.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Collections) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut collections = self.collections.write().await;

        let Some(path) = &self.snapshot else {
            return change(&mut collections);
        };

        let mut next = collections.clone();
        let out = change(&mut next)?;

        let json = serde_json::to_string_pretty(&next)?;
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_snapshot(&target, &json))
            .await
            .map_err(|e| StoreError::Snapshot {
                message: format!("snapshot writer panicked: {e}"),
            })??;
        debug!(path = %path.display(), "wrote store snapshot");

        *collections = next;
        Ok(out)
    }
}

/// Replace the snapshot atomically: write a sibling temp file, then rename
/// it over `path`.
fn write_snapshot(path: &Path, json: &str) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| StoreError::Snapshot {
            message: format!("failed to create snapshot directory: {}", e),
        })?;
    }

    let snapshot_error = |e: std::io::Error| StoreError::Snapshot {
        message: format!("failed to write {}: {}", path.display(), e),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(snapshot_error)?;
    file.write_all(json.as_bytes()).map_err(snapshot_error)?;
    file.as_file().sync_all().map_err(snapshot_error)?;
    file.persist(path).map_err(|e| snapshot_error(e.error))?;

    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.mutate(|collections| {
            collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.clone(), fields);
            Ok(())
        })
        .await?;
        Ok(id)
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), StoreError> {
        self.mutate(|collections| {
            let docs = collections.entry(collection.to_string()).or_default();
            match docs.get_mut(id) {
                Some(existing) if merge => existing.extend(fields),
                _ => {
                    docs.insert(id.to_string(), fields);
                }
            }
            Ok(())
        })
        .await
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        self.mutate(|collections| {
            let existing = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| StoreError::not_found(collection, id))?;
            existing.extend(fields);
            Ok(())
        })
        .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.mutate(|collections| {
            collections
                .get_mut(collection)
                .and_then(|docs| docs.remove(id))
                .map(|_| ())
                .ok_or_else(|| StoreError::not_found(collection, id))
        })
        .await
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, fields)| fields.get(field) == Some(value))
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
