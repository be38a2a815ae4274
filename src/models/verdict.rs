use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::LinkshieldError;

/// The risk verdict produced by the analyzer's assessment phase,
/// before it is accepted and persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: i64,
    pub categories: Vec<String>,
    pub confidence: f64,
    pub reasoning: String,
    pub indicators: Vec<String>,
    pub model_used: String,
    pub analysis_metadata: Option<serde_json::Value>,
}

impl RiskAssessment {
    /// Validate analyzer output at the acceptance boundary. An
    /// out-of-range score or confidence is a validation error, never
    /// silently clamped.
    pub fn validate(&self) -> Result<(), LinkshieldError> {
        if !(0..=100).contains(&self.risk_score) {
            return Err(LinkshieldError::Validation(format!(
                "risk score {} outside [0, 100]",
                self.risk_score
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(LinkshieldError::Validation(format!(
                "confidence {} outside [0.0, 1.0]",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// Metadata captured by the analyzer's fetch phase. The raw body stays
/// inside this struct for the assessment call and is never persisted.
#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub url: String,
    /// Lowercase hex sha256 digest of the response body.
    pub content_hash: String,
    pub http_status: u16,
    pub http_headers: HashMap<String, String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// A persisted scan result, one-to-one with a completed job. Doubles
/// as the cache entry for its content hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub job_id: String,
    pub risk_score: i64,
    pub categories: Vec<String>,
    pub confidence: f64,
    pub reasoning: String,
    pub indicators: Vec<String>,
    pub content_hash: String,
    pub http_status: u16,
    pub http_headers: HashMap<String, String>,
    pub content_type: Option<String>,
    pub model_used: String,
    pub analysis_metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl ScanResult {
    pub fn from_assessment(
        job_id: &str,
        content: &FetchedContent,
        assessment: RiskAssessment,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            risk_score: assessment.risk_score,
            categories: assessment.categories,
            confidence: assessment.confidence,
            reasoning: assessment.reasoning,
            indicators: assessment.indicators,
            content_hash: content.content_hash.clone(),
            http_status: content.http_status,
            http_headers: content.http_headers.clone(),
            content_type: content.content_type.clone(),
            model_used: assessment.model_used,
            analysis_metadata: assessment.analysis_metadata,
            created_at: Utc::now(),
        }
    }
}
