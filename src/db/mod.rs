//! Persistent store for services and request logs.
//!
//! DESIGN
//! ======
//! The store is the only shared mutable resource. Both the health monitor
//! and the dispatcher write to it, so every adapter owns one serialization
//! point for writes: the JSON file store holds a single async mutex across
//! the in-memory update and the file rewrite; Postgres serializes per
//! statement and enforces name uniqueness with a constraint.
//!
//! `open` picks the adapter: `DATABASE_URL` selects Postgres, otherwise the
//! flat JSON document at `DB_PATH` is used.

pub mod json_file;
pub mod postgres;

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::model::{RequestLog, Service, ServiceStatus};

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Insert rejected because the service name is already taken.
    #[error("service name already registered: {0}")]
    DuplicateName(String),
    #[error("store io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store document is corrupt: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl crate::error::ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateName(_) => "E_DUPLICATE_NAME",
            Self::Io(_) => "E_STORE_IO",
            Self::Corrupt(_) => "E_STORE_CORRUPT",
            Self::Database(_) => "E_DATABASE",
            Self::Migrate(_) => "E_MIGRATE",
        }
    }

    fn kind(&self) -> crate::error::ErrorKind {
        match self {
            Self::DuplicateName(_) => crate::error::ErrorKind::Conflict,
            _ => crate::error::ErrorKind::Internal,
        }
    }
}

// =============================================================================
// STORE TRAIT
// =============================================================================

#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// All services in registration order.
    async fn list_services(&self) -> Result<Vec<Service>, StoreError>;

    async fn get_service(&self, id: Uuid) -> Result<Option<Service>, StoreError>;

    /// Persist a new service.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateName`] if a service with the same name exists.
    async fn insert_service(&self, service: &Service) -> Result<(), StoreError>;

    /// Remove a service, returning it if it was present.
    async fn delete_service(&self, id: Uuid) -> Result<Option<Service>, StoreError>;

    /// Apply one probe result. Returns `false` if the service no longer exists.
    async fn update_health(
        &self,
        id: Uuid,
        status: ServiceStatus,
        checked_at: OffsetDateTime,
    ) -> Result<bool, StoreError>;

    async fn append_request(&self, entry: &RequestLog) -> Result<(), StoreError>;

    /// All request log entries in append order.
    async fn list_requests(&self) -> Result<Vec<RequestLog>, StoreError>;
}

/// Open the store selected by configuration.
///
/// # Errors
///
/// Returns an error if the database connection, migrations, or the JSON
/// document load fail.
pub async fn open(config: &AppConfig) -> Result<Arc<dyn Store>, StoreError> {
    if let Some(url) = &config.database_url {
        let store = postgres::PgStore::connect(url).await?;
        tracing::info!("store: postgres");
        return Ok(Arc::new(store));
    }

    let store = json_file::JsonFileStore::open(&config.db_path).await?;
    tracing::info!(path = %config.db_path.display(), "store: json file");
    Ok(Arc::new(store))
}
