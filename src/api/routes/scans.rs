use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::api::models::{CreateScanRequest, ListQuery};
use crate::api::{error_response, AppState};
use crate::models::{JobState, ScanJob};

fn job_json(job: &ScanJob) -> Value {
    json!({
        "id": job.id,
        "user_id": job.user_id,
        "url": job.url,
        "state": job.state.as_str(),
        "error": job.error_message,
        "created_at": job.created_at.to_rfc3339(),
        "updated_at": job.updated_at.to_rfc3339(),
    })
}

pub async fn create_scan(
    State(state): State<AppState>,
    Json(req): Json<CreateScanRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let job = state
        .orchestrator
        .submit(&req.user_id, &req.url)
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(job_json(&job))))
}

pub async fn get_scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let job = state
        .orchestrator
        .db()
        .get_job(&id)
        .map_err(error_response)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, Json(json!({"error": "Scan not found"}))))?;

    let mut body = job_json(&job);

    // The result is present only once the job completed
    if job.state == JobState::Completed {
        if let Some(result) = state.orchestrator.db().get_result(&id).map_err(error_response)? {
            body["result"] = json!({
                "risk_score": result.risk_score,
                "categories": result.categories,
                "confidence": result.confidence,
                "reasoning": result.reasoning,
                "indicators": result.indicators,
                "content_hash": result.content_hash,
                "http_status": result.http_status,
                "content_type": result.content_type,
                "model_used": result.model_used,
            });
        }
    }

    Ok(Json(body))
}

pub async fn list_scans(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let limit = query.limit.unwrap_or(20);
    let offset = query.offset.unwrap_or(0);

    let jobs = state
        .orchestrator
        .db()
        .list_jobs(query.user_id.as_deref(), limit, offset)
        .map_err(error_response)?;

    let scans: Vec<Value> = jobs.iter().map(job_json).collect();
    Ok(Json(json!({ "scans": scans, "total": scans.len() })))
}
