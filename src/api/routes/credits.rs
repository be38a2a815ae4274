use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::api::models::{AddCreditsRequest, ListQuery};
use crate::api::{error_response, AppState};
use crate::models::TransactionType;

pub async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let balance = state
        .orchestrator
        .ledger()
        .balance(&user_id)
        .map_err(error_response)?;
    Ok(Json(json!({ "user_id": user_id, "balance": balance })))
}

/// Invoked by the payment-settlement collaborator once a purchase is
/// confirmed.
pub async fn add_credits(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<AddCreditsRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let txn = state
        .orchestrator
        .ledger()
        .credit(
            &user_id,
            req.amount,
            TransactionType::Purchase,
            req.description.as_deref(),
            req.purchase_id.as_deref(),
        )
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": txn.id,
            "user_id": txn.user_id,
            "amount": txn.amount,
            "type": txn.transaction_type.as_str(),
            "balance_after": txn.balance_after,
            "created_at": txn.created_at.to_rfc3339(),
        })),
    ))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let transactions = state
        .orchestrator
        .ledger()
        .transactions(&user_id, limit, offset)
        .map_err(error_response)?;

    let entries: Vec<Value> = transactions
        .iter()
        .map(|t| {
            json!({
                "id": t.id,
                "amount": t.amount,
                "type": t.transaction_type.as_str(),
                "job_id": t.job_id,
                "purchase_id": t.purchase_id,
                "balance_after": t.balance_after,
                "description": t.description,
                "created_at": t.created_at.to_rfc3339(),
            })
        })
        .collect();

    Ok(Json(json!({ "transactions": entries, "total": entries.len() })))
}
