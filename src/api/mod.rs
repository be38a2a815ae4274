pub mod models;
pub mod routes;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::engine::ScanOrchestrator;
use crate::errors::LinkshieldError;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ScanOrchestrator>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", axum::routing::get(routes::health::health_check))
        .route(
            "/api/scans",
            axum::routing::post(routes::scans::create_scan).get(routes::scans::list_scans),
        )
        .route("/api/scans/:id", axum::routing::get(routes::scans::get_scan))
        .route(
            "/api/users/:user_id/credits",
            axum::routing::get(routes::credits::get_balance).post(routes::credits::add_credits),
        )
        .route(
            "/api/users/:user_id/transactions",
            axum::routing::get(routes::credits::list_transactions),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Map engine errors onto HTTP responses. Credit shortfalls and
/// validation failures are the caller's problem; everything else is a
/// server error.
pub(crate) fn error_response(e: LinkshieldError) -> (StatusCode, Json<Value>) {
    let status = match &e {
        LinkshieldError::InvalidUrl(_) | LinkshieldError::Validation(_) => StatusCode::BAD_REQUEST,
        LinkshieldError::InsufficientCredit { .. } => StatusCode::PAYMENT_REQUIRED,
        LinkshieldError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"error": e.to_string()})))
}
