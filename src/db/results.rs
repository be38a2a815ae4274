use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::{parse_timestamp, Database};
use crate::errors::LinkshieldError;
use crate::models::ScanResult;

const RESULT_COLUMNS: &str = "job_id, risk_score, categories, confidence, reasoning, indicators, \
     content_hash, http_status, http_headers, content_type, model_used, analysis_metadata, created_at";

fn row_to_result(row: &rusqlite::Row) -> rusqlite::Result<(ScanResult, String)> {
    let categories: String = row.get(2)?;
    let indicators: String = row.get(5)?;
    let headers: String = row.get(8)?;
    let metadata: Option<String> = row.get(11)?;
    let created: String = row.get(12)?;
    Ok((
        ScanResult {
            job_id: row.get(0)?,
            risk_score: row.get(1)?,
            categories: serde_json::from_str(&categories).unwrap_or_default(),
            confidence: row.get(3)?,
            reasoning: row.get(4)?,
            indicators: serde_json::from_str(&indicators).unwrap_or_default(),
            content_hash: row.get(6)?,
            http_status: row.get::<_, i64>(7)? as u16,
            http_headers: serde_json::from_str::<HashMap<String, String>>(&headers)
                .unwrap_or_default(),
            content_type: row.get(9)?,
            model_used: row.get(10)?,
            analysis_metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
            created_at: Utc::now(),
        },
        created,
    ))
}

impl Database {
    /// Insert a scan result. One per job; the primary key rejects a
    /// second write for the same job.
    pub fn insert_result(&self, result: &ScanResult) -> Result<(), LinkshieldError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO scan_results (job_id, risk_score, categories, confidence, reasoning, indicators,
                 content_hash, http_status, http_headers, content_type, model_used, analysis_metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            rusqlite::params![
                result.job_id,
                result.risk_score,
                serde_json::to_string(&result.categories)?,
                result.confidence,
                result.reasoning,
                serde_json::to_string(&result.indicators)?,
                result.content_hash,
                result.http_status as i64,
                serde_json::to_string(&result.http_headers)?,
                result.content_type,
                result.model_used,
                result
                    .analysis_metadata
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                result.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| LinkshieldError::Database(format!("Failed to insert result: {}", e)))?;
        Ok(())
    }

    pub fn get_result(&self, job_id: &str) -> Result<Option<ScanResult>, LinkshieldError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM scan_results WHERE job_id = ?1",
                RESULT_COLUMNS
            ))
            .map_err(|e| LinkshieldError::Database(format!("Query failed: {}", e)))?;

        match stmt.query_row(rusqlite::params![job_id], row_to_result) {
            Ok((mut result, created)) => {
                result.created_at = parse_timestamp(&created)?;
                Ok(Some(result))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(LinkshieldError::Database(format!("Query error: {}", e))),
        }
    }

    /// The most recently created result for a content hash, no older
    /// than the cutoff. RFC 3339 UTC timestamps compare correctly as
    /// strings.
    pub fn latest_result_for_hash(
        &self,
        content_hash: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<ScanResult>, LinkshieldError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM scan_results
                 WHERE content_hash = ?1 AND created_at >= ?2
                 ORDER BY created_at DESC LIMIT 1",
                RESULT_COLUMNS
            ))
            .map_err(|e| LinkshieldError::Database(format!("Query failed: {}", e)))?;

        match stmt.query_row(
            rusqlite::params![content_hash, cutoff.to_rfc3339()],
            row_to_result,
        ) {
            Ok((mut result, created)) => {
                result.created_at = parse_timestamp(&created)?;
                Ok(Some(result))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(LinkshieldError::Database(format!("Query error: {}", e))),
        }
    }
}
