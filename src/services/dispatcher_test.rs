use super::*;
use crate::db::json_file::JsonFileStore;
use crate::model::Endpoint;
use crate::state::test_helpers::{SERVICE_API_KEY, dummy_service, spawn_router, test_app_state, test_config, weather_router};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn route_for(service: &Service, index: usize, parameters: Value) -> ConfidentRoute {
    ConfidentRoute {
        service_id: service.id,
        service_name: service.name.clone(),
        endpoint: service.endpoints[index].clone(),
        parameters: parameters.as_object().cloned().unwrap_or_default(),
    }
}

/// Echoes the JSON body and the credential it received.
fn lights_router() -> Router {
    Router::new().route(
        "/off",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            let key = headers.get("x-api-key").and_then(|v| v.to_str().ok()).unwrap_or_default().to_owned();
            Json(json!({ "received": body, "key": key }))
        }),
    )
}

fn lights_service(base: &str) -> Service {
    let mut svc = dummy_service("lights", base);
    svc.endpoints = vec![Endpoint {
        method: "POST".into(),
        path: "/off".into(),
        description: "Turn lights off".into(),
        parameters: None,
    }];
    svc
}

#[test]
fn query_pairs_stringify_non_strings() {
    let params = json!({ "city": "Berlin", "days": 3, "metric": true, "tags": ["a"] });
    let mut pairs = query_pairs(params.as_object().unwrap());
    pairs.sort();
    assert_eq!(
        pairs,
        vec![
            ("city".to_string(), "Berlin".to_string()),
            ("days".to_string(), "3".to_string()),
            ("metric".to_string(), "true".to_string()),
            ("tags".to_string(), "[\"a\"]".to_string()),
        ]
    );
}

#[tokio::test]
async fn get_dispatch_sends_query_and_logs_success() {
    let state = test_app_state();
    let base = spawn_router(weather_router()).await;
    let weather = dummy_service("weather", &base);
    state.store.insert_service(&weather).await.unwrap();

    let route = route_for(&weather, 0, json!({ "city": "Berlin" }));
    let outcome = dispatch(&state, &route, "weather in Berlin").await.unwrap();
    assert_eq!(outcome.service, "weather");
    assert_eq!(outcome.message, "Forecast for Berlin: sunny");
    assert_eq!(outcome.url.as_deref(), Some("https://weather.test/Berlin"));
    assert_eq!(outcome.data["city"], json!("Berlin"));

    let log = state.store.list_requests().await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].transcript, "weather in Berlin");
    assert_eq!(log[0].selected_service, "weather");
    assert_eq!(log[0].arguments["city"], json!("Berlin"));
    assert!((log[0].confidence - 1.0).abs() < f64::EPSILON);
    assert_eq!(
        log[0].outcome,
        RequestOutcome::Success { callback_url: Some("https://weather.test/Berlin".into()), response: outcome.data }
    );
}

#[tokio::test]
async fn post_dispatch_sends_json_body_and_credential() {
    let state = test_app_state();
    let base = spawn_router(lights_router()).await;
    let lights = lights_service(&base);
    state.store.insert_service(&lights).await.unwrap();

    let route = route_for(&lights, 0, json!({ "room": "kitchen" }));
    let outcome = dispatch(&state, &route, "kitchen lights off").await.unwrap();
    assert_eq!(outcome.data["received"], json!({ "room": "kitchen" }));
    assert_eq!(outcome.data["key"], json!(SERVICE_API_KEY));
    assert_eq!(outcome.message, "Success");
    assert!(outcome.url.is_none());
}

#[tokio::test]
async fn non_json_response_is_kept_as_string() {
    let state = test_app_state();
    let base = spawn_router(Router::new().route("/forecast", get(|| async { "plain text" }))).await;
    let weather = dummy_service("weather", &base);
    state.store.insert_service(&weather).await.unwrap();

    let outcome = dispatch(&state, &route_for(&weather, 0, json!({})), "weather").await.unwrap();
    assert_eq!(outcome.data, json!("plain text"));
    assert_eq!(outcome.message, "Success");
}

#[tokio::test]
async fn error_status_logs_error_and_propagates() {
    let state = test_app_state();
    let base = spawn_router(Router::new().route(
        "/forecast",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    ))
    .await;
    let weather = dummy_service("weather", &base);
    state.store.insert_service(&weather).await.unwrap();

    let err = dispatch(&state, &route_for(&weather, 0, json!({ "city": "Oslo" })), "weather in Oslo")
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Upstream { ref service, .. } if service == "weather"));
    assert_eq!(err.kind(), ErrorKind::Upstream);

    let log = state.store.list_requests().await.unwrap();
    assert_eq!(log.len(), 1);
    assert!(matches!(&log[0].outcome, RequestOutcome::Error { error } if error.contains("500")));
    assert_eq!(log[0].arguments["city"], json!("Oslo"));
}

#[tokio::test]
async fn unreachable_service_logs_error() {
    let state = test_app_state();
    let weather = dummy_service("weather", "http://127.0.0.1:1");
    state.store.insert_service(&weather).await.unwrap();

    let err = dispatch(&state, &route_for(&weather, 0, json!({})), "weather").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert_eq!(state.store.list_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn slow_service_times_out_and_logs_error() {
    let mut config = test_config();
    config.timing.dispatch_timeout = Duration::from_millis(100);
    let state = AppState::new(config, Arc::new(JsonFileStore::in_memory()), None, 256);
    let base = spawn_router(Router::new().route(
        "/forecast",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            "late"
        }),
    ))
    .await;
    let weather = dummy_service("weather", &base);
    state.store.insert_service(&weather).await.unwrap();

    let err = dispatch(&state, &route_for(&weather, 0, json!({})), "weather").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    let log = state.store.list_requests().await.unwrap();
    assert!(matches!(log[0].outcome, RequestOutcome::Error { .. }));
}

#[tokio::test]
async fn missing_service_is_not_found_and_not_logged() {
    let state = test_app_state();
    let ghost = dummy_service("ghost", "http://127.0.0.1:1");

    let err = dispatch(&state, &route_for(&ghost, 0, json!({})), "hello").await.unwrap_err();
    assert!(matches!(err, DispatchError::ServiceNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(state.store.list_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn every_dispatch_appends_exactly_one_entry() {
    let state = test_app_state();
    let base = spawn_router(weather_router()).await;
    let up = dummy_service("weather", &base);
    let down = dummy_service("broken", "http://127.0.0.1:1");
    state.store.insert_service(&up).await.unwrap();
    state.store.insert_service(&down).await.unwrap();

    let results = [
        dispatch(&state, &route_for(&up, 0, json!({ "city": "A" })), "a").await.is_ok(),
        dispatch(&state, &route_for(&down, 0, json!({})), "b").await.is_ok(),
        dispatch(&state, &route_for(&up, 0, json!({ "city": "C" })), "c").await.is_ok(),
    ];
    let log = state.store.list_requests().await.unwrap();
    let logged: Vec<bool> = log.iter().map(|e| matches!(e.outcome, RequestOutcome::Success { .. })).collect();
    assert_eq!(logged, results.to_vec());
}

// =========================================================================
// manual_route
// =========================================================================

#[tokio::test]
async fn manual_route_selects_endpoint_with_empty_parameters() {
    let state = test_app_state();
    let weather = dummy_service("weather", "http://w");
    state.store.insert_service(&weather).await.unwrap();

    let route = manual_route(&state, &weather.id.to_string(), 0).await.unwrap();
    assert_eq!(route.service_id, weather.id);
    assert_eq!(route.endpoint, weather.endpoints[0]);
    assert!(route.parameters.is_empty());
}

#[tokio::test]
async fn manual_route_unknown_service_or_index_is_not_found() {
    let state = test_app_state();
    let weather = dummy_service("weather", "http://w");
    state.store.insert_service(&weather).await.unwrap();

    let err = manual_route(&state, "not-a-uuid", 0).await.unwrap_err();
    assert!(matches!(err, DispatchError::ServiceNotFound(_)));
    let err = manual_route(&state, &Uuid::new_v4().to_string(), 0).await.unwrap_err();
    assert!(matches!(err, DispatchError::ServiceNotFound(_)));
    let err = manual_route(&state, &weather.id.to_string(), 5).await.unwrap_err();
    assert!(matches!(err, DispatchError::EndpointNotFound { index: 5, .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
