use super::*;
use crate::model::{Service, ServiceStatus};
use crate::state::test_helpers::{
    MockLlm, dummy_service, test_app_state, test_app_state_with_llm, text_response, tool_response,
};
use serde_json::json;
use std::sync::Arc;

async fn seed(state: &AppState, services: &[Service]) {
    for svc in services {
        state.store.insert_service(svc).await.unwrap();
    }
}

// =========================================================================
// parse_arguments
// =========================================================================

#[test]
fn parse_arguments_accepts_object_string_and_null() {
    assert_eq!(parse_arguments(&json!({ "city": "Berlin" })).unwrap()["city"], json!("Berlin"));
    assert_eq!(parse_arguments(&json!("{\"city\":\"Paris\"}")).unwrap()["city"], json!("Paris"));
    assert!(parse_arguments(&Value::Null).unwrap().is_empty());
}

#[test]
fn parse_arguments_rejects_malformed_payloads() {
    for input in [json!("{\"city\": Berl"), json!("[1,2]"), json!([1, 2]), json!(3), json!(true)] {
        let err = parse_arguments(&input).unwrap_err();
        assert!(matches!(err, RouteError::InvalidArguments(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

// =========================================================================
// route_request
// =========================================================================

#[tokio::test]
async fn without_llm_is_unavailable() {
    let state = test_app_state();
    let err = route_request(&state, "turn off the lights").await.unwrap_err();
    assert!(matches!(err, RouteError::LlmNotConfigured));
    assert_eq!(err.kind(), ErrorKind::Unavailable);
}

#[tokio::test]
async fn empty_registry_is_eligibility_error() {
    let mock = Arc::new(MockLlm::new(vec![]));
    let state = test_app_state_with_llm(mock.clone());

    let err = route_request(&state, "turn off the lights").await.unwrap_err();
    assert!(matches!(err, RouteError::NoHealthyServices));
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn only_unhealthy_services_is_eligibility_error() {
    let state = test_app_state_with_llm(Arc::new(MockLlm::new(vec![])));
    let mut down = dummy_service("weather", "http://w");
    down.status = ServiceStatus::Unhealthy;
    seed(&state, &[down]).await;

    assert!(matches!(route_request(&state, "weather?").await, Err(RouteError::NoHealthyServices)));
}

#[tokio::test]
async fn healthy_services_without_endpoints_are_not_eligible() {
    let mock = Arc::new(MockLlm::new(vec![]));
    let state = test_app_state_with_llm(mock.clone());
    let mut bare = dummy_service("weather", "http://w");
    bare.endpoints.clear();
    seed(&state, &[bare]).await;

    assert!(matches!(route_request(&state, "weather?").await, Err(RouteError::NoHealthyServices)));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn weather_transcript_routes_confidently() {
    let mock = Arc::new(MockLlm::new(vec![Ok(tool_response(
        "weather_get__forecast",
        json!({ "city": "Berlin" }),
    ))]));
    let state = test_app_state_with_llm(mock.clone());
    let weather = dummy_service("weather", "http://w");
    seed(&state, std::slice::from_ref(&weather)).await;

    let decision = route_request(&state, "what's the weather in Berlin tomorrow").await.unwrap();
    let RoutingDecision::Confident(route) = decision else {
        panic!("expected confident decision");
    };
    assert_eq!(route.service_id, weather.id);
    assert_eq!(route.service_name, "weather");
    assert_eq!(route.endpoint.method, "GET");
    assert_eq!(route.endpoint.path, "/forecast");
    assert_eq!(route.parameters["city"], json!("Berlin"));

    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].system, SYSTEM_PROMPT);
    assert_eq!(calls[0].user, vec!["what's the weather in Berlin tomorrow".to_string()]);
    assert_eq!(calls[0].tool_names, vec!["weather_get__forecast".to_string()]);
}

#[tokio::test]
async fn unrelated_services_yield_uncertain_with_all_healthy_options() {
    let mock = Arc::new(MockLlm::new(vec![Ok(text_response("That could mean anything."))]));
    let state = test_app_state_with_llm(mock);
    let weather = dummy_service("weather", "http://w");
    let lights = dummy_service("lights", "http://l");
    let mut down = dummy_service("music", "http://m");
    down.status = ServiceStatus::Unhealthy;
    seed(&state, &[weather.clone(), lights.clone(), down]).await;

    let decision = route_request(&state, "do the thing").await.unwrap();
    let RoutingDecision::Uncertain { explanation, available_services } = decision else {
        panic!("expected uncertain decision");
    };
    assert_eq!(explanation, "That could mean anything.");
    assert_eq!(available_services, vec![weather.summary(), lights.summary()]);
}

#[tokio::test]
async fn decline_without_text_has_empty_explanation() {
    let mut empty = text_response("");
    empty.content.clear();
    let state = test_app_state_with_llm(Arc::new(MockLlm::new(vec![Ok(empty)])));
    seed(&state, &[dummy_service("weather", "http://w")]).await;

    let decision = route_request(&state, "hmm").await.unwrap();
    assert!(matches!(decision, RoutingDecision::Uncertain { ref explanation, .. } if explanation.is_empty()));
}

#[tokio::test]
async fn decisions_only_target_healthy_services() {
    let weather = dummy_service("weather", "http://w");
    let mut down = dummy_service("lights", "http://l");
    down.status = ServiceStatus::Unhealthy;
    // The model names a tool for the unhealthy service; it is not in the catalog.
    let mock = Arc::new(MockLlm::new(vec![Ok(tool_response("lights_get__forecast", json!({})))]));
    let state = test_app_state_with_llm(mock.clone());
    seed(&state, &[weather, down]).await;

    let err = route_request(&state, "lights").await.unwrap_err();
    assert!(matches!(err, RouteError::UnknownTool(ref n) if n == "lights_get__forecast"));
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(mock.calls()[0].tool_names, vec!["weather_get__forecast".to_string()]);
}

#[tokio::test]
async fn first_of_several_tool_selections_wins() {
    let weather = dummy_service("weather", "http://w");
    let lights = dummy_service("lights", "http://l");
    let mut response = tool_response("lights_get__forecast", json!({}));
    response.content.push(crate::llm::types::ContentBlock::ToolUse {
        id: "call_2".into(),
        name: "weather_get__forecast".into(),
        input: json!({}),
    });
    let state = test_app_state_with_llm(Arc::new(MockLlm::new(vec![Ok(response)])));
    seed(&state, &[weather, lights.clone()]).await;

    let RoutingDecision::Confident(route) = route_request(&state, "both").await.unwrap() else {
        panic!("expected confident decision");
    };
    assert_eq!(route.service_id, lights.id);
}

#[tokio::test]
async fn malformed_tool_arguments_are_validation_errors() {
    let mock = Arc::new(MockLlm::new(vec![Ok(tool_response("weather_get__forecast", json!("{\"city\":")))]));
    let state = test_app_state_with_llm(mock);
    seed(&state, &[dummy_service("weather", "http://w")]).await;

    let err = route_request(&state, "weather").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn llm_failure_is_upstream_error() {
    let mock = Arc::new(MockLlm::new(vec![Err(LlmError::ApiResponse { status: 500, body: "boom".into() })]));
    let state = test_app_state_with_llm(mock);
    seed(&state, &[dummy_service("weather", "http://w")]).await;

    let err = route_request(&state, "weather").await.unwrap_err();
    assert!(matches!(err, RouteError::Llm(_)));
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert!(err.retryable());
}
