//! Flat JSON document store.
//!
//! The whole document (`{ services, requests }`) lives in memory behind one
//! async mutex. A mutation edits the document in place and returns an
//! [`Undo`] for that edit. The document is then written to a temp file and
//! renamed over the original; if the write fails the edit is undone, so a
//! failed write leaves both the file and the in-memory document untouched.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::model::{RequestLog, Service, ServiceStatus};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    services: Vec<Service>,
    #[serde(default)]
    requests: Vec<RequestLog>,
}

pub struct JsonFileStore {
    /// `None` keeps the document in memory only.
    path: Option<PathBuf>,
    doc: Mutex<Document>,
}

impl JsonFileStore {
    /// Load the document at `path`, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written, or does not
    /// parse as a store document.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let doc = match tokio::fs::read_to_string(path).await {
            Ok(text) if text.trim().is_empty() => Document::default(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| StoreError::Corrupt(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::default(),
            Err(e) => return Err(e.into()),
        };

        let store = Self { path: Some(path.to_path_buf()), doc: Mutex::new(Document::default()) };
        store.write_file(&doc).await?;
        *store.doc.lock().await = doc;
        Ok(store)
    }

    /// A store that never touches disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self { path: None, doc: Mutex::new(Document::default()) }
    }

    async fn write_file(&self, doc: &Document) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(doc).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Apply `f` in place and persist. The lock is held throughout, so
    /// writers never interleave.
    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Document) -> Result<(T, Undo), StoreError>,
    ) -> Result<T, StoreError> {
        let mut doc = self.doc.lock().await;
        let (out, undo) = f(&mut *doc)?;
        if matches!(undo, Undo::Nothing) {
            return Ok(out);
        }
        if let Err(e) = self.write_file(&doc).await {
            undo.revert(&mut *doc);
            return Err(e);
        }
        Ok(out)
    }
}

/// Reverses one in-place edit after a failed write.
enum Undo {
    Nothing,
    PopService,
    InsertService(usize, Service),
    RestoreHealth(usize, ServiceStatus, OffsetDateTime),
    PopRequest,
}

impl Undo {
    fn revert(self, doc: &mut Document) {
        match self {
            Self::Nothing => {}
            Self::PopService => {
                doc.services.pop();
            }
            Self::InsertService(idx, service) => doc.services.insert(idx, service),
            Self::RestoreHealth(idx, status, checked_at) => {
                if let Some(service) = doc.services.get_mut(idx) {
                    service.status = status;
                    service.last_health_check = checked_at;
                }
            }
            Self::PopRequest => {
                doc.requests.pop();
            }
        }
    }
}

#[async_trait::async_trait]
impl Store for JsonFileStore {
    async fn list_services(&self) -> Result<Vec<Service>, StoreError> {
        Ok(self.doc.lock().await.services.clone())
    }

    async fn get_service(&self, id: Uuid) -> Result<Option<Service>, StoreError> {
        let doc = self.doc.lock().await;
        Ok(doc.services.iter().find(|s| s.id == id).cloned())
    }

    async fn insert_service(&self, service: &Service) -> Result<(), StoreError> {
        self.mutate(|doc| {
            if doc.services.iter().any(|s| s.name == service.name) {
                return Err(StoreError::DuplicateName(service.name.clone()));
            }
            doc.services.push(service.clone());
            Ok(((), Undo::PopService))
        })
        .await
    }

    async fn delete_service(&self, id: Uuid) -> Result<Option<Service>, StoreError> {
        self.mutate(|doc| {
            let Some(idx) = doc.services.iter().position(|s| s.id == id) else {
                return Ok((None, Undo::Nothing));
            };
            let removed = doc.services.remove(idx);
            Ok((Some(removed.clone()), Undo::InsertService(idx, removed)))
        })
        .await
    }

    async fn update_health(
        &self,
        id: Uuid,
        status: ServiceStatus,
        checked_at: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        self.mutate(|doc| {
            let Some(idx) = doc.services.iter().position(|s| s.id == id) else {
                return Ok((false, Undo::Nothing));
            };
            let service = &mut doc.services[idx];
            let undo = Undo::RestoreHealth(idx, service.status, service.last_health_check);
            service.status = status;
            service.last_health_check = checked_at;
            Ok((true, undo))
        })
        .await
    }

    async fn append_request(&self, entry: &RequestLog) -> Result<(), StoreError> {
        self.mutate(|doc| {
            doc.requests.push(entry.clone());
            Ok(((), Undo::PopRequest))
        })
        .await
    }

    async fn list_requests(&self) -> Result<Vec<RequestLog>, StoreError> {
        Ok(self.doc.lock().await.requests.clone())
    }
}

#[cfg(test)]
#[path = "json_file_test.rs"]
mod tests;
