use super::*;
use crate::db::StoreError;
use crate::services::router::RouteError;
use crate::services::validation::ValidationError;
use crate::state::test_helpers::{spawn_router, test_app_state};

#[test]
fn every_kind_maps_to_one_status() {
    assert_eq!(status_for_kind(ErrorKind::Validation), StatusCode::BAD_REQUEST);
    assert_eq!(status_for_kind(ErrorKind::NotFound), StatusCode::NOT_FOUND);
    assert_eq!(status_for_kind(ErrorKind::Conflict), StatusCode::CONFLICT);
    assert_eq!(status_for_kind(ErrorKind::Upstream), StatusCode::BAD_GATEWAY);
    assert_eq!(status_for_kind(ErrorKind::Unavailable), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(status_for_kind(ErrorKind::Internal), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn internal_errors_hide_details() {
    let err = ApiError::from_error(StoreError::Corrupt("secret path /var/db.json".into()));
    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.message, "Internal server error");
    assert_eq!(err.code, "E_STORE_CORRUPT");
}

#[test]
fn client_errors_keep_their_message() {
    let err = ApiError::from_error(ValidationError("Invalid or missing transcript"));
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.message, "Invalid or missing transcript");

    let err = ApiError::from_error(RouteError::NoHealthyServices);
    assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(err.code, "E_NO_HEALTHY_SERVICES");
}

#[tokio::test]
async fn health_needs_no_key() {
    let base = spawn_router(app(test_app_state())).await;
    let response = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], json!("ok"));
    let timestamp = body["timestamp"].as_str().unwrap();
    assert!(OffsetDateTime::parse(timestamp, &Rfc3339).is_ok());
}
