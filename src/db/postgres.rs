//! PostgreSQL store.
//!
//! Used when `DATABASE_URL` is set. Each mutation is one statement, so
//! Postgres is the serialization point. Name uniqueness is the `UNIQUE`
//! constraint on `services.name`; a violation maps to
//! [`StoreError::DuplicateName`].

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::model::{Endpoint, Parameters, RequestLog, RequestOutcome, Service, ServiceStatus};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and run migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migrations fail.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::migrate!("src/db/migrations").run(&pool).await?;

        Ok(Self { pool })
    }
}

// =============================================================================
// ROWS
// =============================================================================

#[derive(sqlx::FromRow)]
struct ServiceRow {
    id: Uuid,
    name: String,
    description: String,
    base_url: String,
    api_key: String,
    endpoints: Json<Vec<Endpoint>>,
    registered_at: OffsetDateTime,
    last_health_check: OffsetDateTime,
    status: String,
}

impl TryFrom<ServiceRow> for Service {
    type Error = StoreError;

    fn try_from(row: ServiceRow) -> Result<Self, Self::Error> {
        let status = ServiceStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown service status '{}'", row.status)))?;
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            base_url: row.base_url,
            api_key: row.api_key,
            endpoints: row.endpoints.0,
            registered_at: row.registered_at,
            last_health_check: row.last_health_check,
            status,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: Uuid,
    transcript: String,
    selected_service: String,
    endpoint: Json<Endpoint>,
    arguments: Json<Parameters>,
    confidence: f64,
    timestamp: OffsetDateTime,
    result: String,
    callback_url: Option<String>,
    response: Option<Json<serde_json::Value>>,
    error: Option<String>,
}

impl TryFrom<RequestRow> for RequestLog {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let outcome = match row.result.as_str() {
            "success" => RequestOutcome::Success {
                callback_url: row.callback_url,
                response: row.response.map_or(serde_json::Value::Null, |r| r.0),
            },
            "error" => RequestOutcome::Error { error: row.error.unwrap_or_default() },
            other => return Err(StoreError::Corrupt(format!("unknown request result '{other}'"))),
        };
        Ok(Self {
            id: row.id,
            transcript: row.transcript,
            selected_service: row.selected_service,
            endpoint: row.endpoint.0,
            arguments: row.arguments.0,
            confidence: row.confidence,
            timestamp: row.timestamp,
            outcome,
        })
    }
}

const SERVICE_COLUMNS: &str =
    "id, name, description, base_url, api_key, endpoints, registered_at, last_health_check, status";

// =============================================================================
// STORE
// =============================================================================

#[async_trait::async_trait]
impl Store for PgStore {
    async fn list_services(&self) -> Result<Vec<Service>, StoreError> {
        let rows = sqlx::query_as::<_, ServiceRow>(&format!("SELECT {SERVICE_COLUMNS} FROM services ORDER BY seq"))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Service::try_from).collect()
    }

    async fn get_service(&self, id: Uuid) -> Result<Option<Service>, StoreError> {
        let row = sqlx::query_as::<_, ServiceRow>(&format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Service::try_from).transpose()
    }

    async fn insert_service(&self, service: &Service) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO services
                 (id, name, description, base_url, api_key, endpoints, registered_at, last_health_check, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(service.id)
        .bind(&service.name)
        .bind(&service.description)
        .bind(&service.base_url)
        .bind(&service.api_key)
        .bind(Json(&service.endpoints))
        .bind(service.registered_at)
        .bind(service.last_health_check)
        .bind(service.status.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateName(service.name.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_service(&self, id: Uuid) -> Result<Option<Service>, StoreError> {
        let row = sqlx::query_as::<_, ServiceRow>(&format!("DELETE FROM services WHERE id = $1 RETURNING {SERVICE_COLUMNS}"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Service::try_from).transpose()
    }

    async fn update_health(
        &self,
        id: Uuid,
        status: ServiceStatus,
        checked_at: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE services SET status = $2, last_health_check = $3 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .bind(checked_at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_request(&self, entry: &RequestLog) -> Result<(), StoreError> {
        let (callback_url, response, error) = match &entry.outcome {
            RequestOutcome::Success { callback_url, response } => (callback_url.as_deref(), Some(Json(response)), None),
            RequestOutcome::Error { error } => (None, None, Some(error.as_str())),
        };

        sqlx::query(
            "INSERT INTO requests
                 (id, transcript, selected_service, endpoint, arguments, confidence, timestamp,
                  result, callback_url, response, error)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(entry.id)
        .bind(&entry.transcript)
        .bind(&entry.selected_service)
        .bind(Json(&entry.endpoint))
        .bind(Json(&entry.arguments))
        .bind(entry.confidence)
        .bind(entry.timestamp)
        .bind(entry.outcome.result_str())
        .bind(callback_url)
        .bind(response)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_requests(&self) -> Result<Vec<RequestLog>, StoreError> {
        let rows = sqlx::query_as::<_, RequestRow>(
            "SELECT id, transcript, selected_service, endpoint, arguments, confidence, timestamp,
                    result, callback_url, response, error
             FROM requests ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RequestLog::try_from).collect()
    }
}

#[cfg(all(test, feature = "live-db-tests"))]
#[path = "postgres_test.rs"]
mod tests;
