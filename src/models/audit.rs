use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Input for one audit record, built from fetch metadata and, when the
/// scan completed, a verdict summary. Holds metadata only; the page
/// body, screenshots, and DOM snapshots never pass through this type.
#[derive(Debug, Clone)]
pub struct AuditLogInput {
    pub job_id: String,
    pub url_accessed: String,
    pub content_hash: Option<String>,
    pub http_status: Option<u16>,
    pub http_headers: Option<HashMap<String, String>>,
    pub content_type: Option<String>,
    pub risk_score: Option<i64>,
    pub categories: Option<Vec<String>>,
    pub confidence: Option<f64>,
}

/// A persisted audit record. Append-only, never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    pub job_id: String,
    pub url_accessed: String,
    pub content_hash: Option<String>,
    pub http_status: Option<u16>,
    pub http_headers: Option<HashMap<String, String>>,
    pub content_type: Option<String>,
    pub risk_score: Option<i64>,
    pub categories: Option<Vec<String>>,
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}
