mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::StatusCode;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{test_config, AssessOutcome, ScriptedAnalyzer};
use linkshield::api::{build_router, AppState};
use linkshield::db::Database;
use linkshield::engine::ScanOrchestrator;
use linkshield::models::TransactionType;

fn create_test_state() -> AppState {
    let analyzer = Arc::new(ScriptedAnalyzer::new(
        b"test page",
        AssessOutcome::Verdict { risk_score: 30, confidence: 0.85 },
    ));
    let db = Database::in_memory().unwrap();
    AppState {
        orchestrator: Arc::new(ScanOrchestrator::new(db, analyzer, test_config())),
    }
}

fn app(state: &AppState) -> axum::Router {
    build_router(state.clone())
}

fn make_request(method: &str, uri: &str, body: Option<Value>) -> axum::http::Request<Body> {
    let builder = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    match body {
        Some(b) => builder.body(Body::from(serde_json::to_string(&b).unwrap())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn response_json(response: axum::http::Response<Body>) -> Value {
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        panic!("Empty response body. Status: {}, Headers: {:?}", parts.status, parts.headers);
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("JSON parse error: {}. Body: {:?}", e, String::from_utf8_lossy(&bytes)))
}

#[tokio::test]
async fn test_health_endpoint() {
    let state = create_test_state();
    let req = make_request("GET", "/api/health", None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "linkshield");
}

#[tokio::test]
async fn test_create_and_get_scan() {
    let state = create_test_state();
    state
        .orchestrator
        .ledger()
        .credit("alice", 1, TransactionType::Purchase, None, None)
        .unwrap();

    // Create scan
    let req = make_request("POST", "/api/scans", Some(json!({
        "user_id": "alice",
        "url": "https://example.com"
    })));
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    let scan_id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["state"], "queued");
    assert_eq!(body["url"], "https://example.com");

    // Get scan
    let req = make_request("GET", &format!("/api/scans/{}", scan_id), None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["id"], scan_id);
    assert_eq!(body["state"], "queued");
    assert!(body.get("result").is_none());
}

#[tokio::test]
async fn test_create_scan_insufficient_credit() {
    let state = create_test_state();

    let req = make_request("POST", "/api/scans", Some(json!({
        "user_id": "broke",
        "url": "https://example.com"
    })));
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("Insufficient credit"));
}

#[tokio::test]
async fn test_create_scan_invalid_url() {
    let state = create_test_state();
    state
        .orchestrator
        .ledger()
        .credit("alice", 1, TransactionType::Purchase, None, None)
        .unwrap();

    let req = make_request("POST", "/api/scans", Some(json!({
        "user_id": "alice",
        "url": "ftp://example.com"
    })));
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The rejected request must not have consumed the credit
    assert_eq!(state.orchestrator.ledger().balance("alice").unwrap(), 1);
}

#[tokio::test]
async fn test_get_scan_not_found() {
    let state = create_test_state();
    let req = make_request("GET", "/api/scans/nonexistent", None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_completed_scan_includes_result() {
    let state = create_test_state();
    state
        .orchestrator
        .ledger()
        .credit("alice", 1, TransactionType::Purchase, None, None)
        .unwrap();

    let job = state.orchestrator.submit("alice", "https://example.com").unwrap();
    state.orchestrator.process(&job).await.unwrap();

    let req = make_request("GET", &format!("/api/scans/{}", job.id), None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["state"], "completed");
    assert_eq!(body["result"]["risk_score"], 30);
    assert_eq!(body["result"]["confidence"], 0.85);
    assert_eq!(body["result"]["model_used"], "scripted-model");
}

#[tokio::test]
async fn test_list_scans_filtered_by_user() {
    let state = create_test_state();
    state
        .orchestrator
        .ledger()
        .credit("alice", 2, TransactionType::Purchase, None, None)
        .unwrap();
    state
        .orchestrator
        .ledger()
        .credit("bob", 1, TransactionType::Purchase, None, None)
        .unwrap();

    state.orchestrator.submit("alice", "https://a.example").unwrap();
    state.orchestrator.submit("alice", "https://b.example").unwrap();
    state.orchestrator.submit("bob", "https://c.example").unwrap();

    let req = make_request("GET", "/api/scans?user_id=alice", None);
    let response = app(&state).oneshot(req).await.unwrap();
    let body = response_json(response).await;
    assert_eq!(body["total"], 2);

    let req = make_request("GET", "/api/scans", None);
    let response = app(&state).oneshot(req).await.unwrap();
    let body = response_json(response).await;
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn test_credit_balance_and_purchase() {
    let state = create_test_state();

    // Fresh user has balance 0
    let req = make_request("GET", "/api/users/alice/credits", None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["balance"], 0);

    // Purchase settlement adds credits
    let req = make_request("POST", "/api/users/alice/credits", Some(json!({
        "amount": 10,
        "purchase_id": "purchase-1"
    })));
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["amount"], 10);
    assert_eq!(body["type"], "purchase");
    assert_eq!(body["balance_after"], 10);

    let req = make_request("GET", "/api/users/alice/credits", None);
    let response = app(&state).oneshot(req).await.unwrap();
    let body = response_json(response).await;
    assert_eq!(body["balance"], 10);
}

#[tokio::test]
async fn test_credit_purchase_rejects_non_positive() {
    let state = create_test_state();
    let req = make_request("POST", "/api/users/alice/credits", Some(json!({
        "amount": -5
    })));
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transaction_history_endpoint() {
    let state = create_test_state();
    state
        .orchestrator
        .ledger()
        .credit("alice", 2, TransactionType::Purchase, Some("starter"), None)
        .unwrap();
    let job = state.orchestrator.submit("alice", "https://example.com").unwrap();
    state.orchestrator.process(&job).await.unwrap();

    let req = make_request("GET", "/api/users/alice/transactions", None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["total"], 2);
    let entries = body["transactions"].as_array().unwrap();
    assert_eq!(entries[0]["type"], "purchase");
    assert_eq!(entries[1]["type"], "scan");
    assert_eq!(entries[1]["amount"], -1);
    assert_eq!(entries[1]["balance_after"], 1);
}
