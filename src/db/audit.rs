use std::collections::HashMap;

use chrono::Utc;

use super::{parse_timestamp, Database};
use crate::errors::LinkshieldError;
use crate::models::{AuditLogEntry, AuditLogInput};

impl Database {
    /// Append one audit record. There is deliberately no update or
    /// delete counterpart; the table is append-only.
    pub fn insert_audit_entry(&self, input: &AuditLogInput) -> Result<AuditLogEntry, LinkshieldError> {
        let conn = self.conn.lock().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let headers_json = input
            .http_headers
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let categories_json = input
            .categories
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        conn.execute(
            "INSERT INTO audit_logs (id, job_id, url_accessed, content_hash, http_status, http_headers,
                 content_type, risk_score, categories, confidence, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                id,
                input.job_id,
                input.url_accessed,
                input.content_hash,
                input.http_status.map(|s| s as i64),
                headers_json,
                input.content_type,
                input.risk_score,
                categories_json,
                input.confidence,
                now.to_rfc3339()
            ],
        )
        .map_err(|e| LinkshieldError::Database(format!("Failed to insert audit entry: {}", e)))?;

        Ok(AuditLogEntry {
            id,
            job_id: input.job_id.clone(),
            url_accessed: input.url_accessed.clone(),
            content_hash: input.content_hash.clone(),
            http_status: input.http_status,
            http_headers: input.http_headers.clone(),
            content_type: input.content_type.clone(),
            risk_score: input.risk_score,
            categories: input.categories.clone(),
            confidence: input.confidence,
            created_at: now,
        })
    }

    pub fn list_audit_entries(&self, job_id: &str) -> Result<Vec<AuditLogEntry>, LinkshieldError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, job_id, url_accessed, content_hash, http_status, http_headers,
                        content_type, risk_score, categories, confidence, created_at
                 FROM audit_logs WHERE job_id = ?1 ORDER BY created_at ASC",
            )
            .map_err(|e| LinkshieldError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt
            .query_map(rusqlite::params![job_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<i64>>(7)?,
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, Option<f64>>(9)?,
                    row.get::<_, String>(10)?,
                ))
            })
            .map_err(|e| LinkshieldError::Database(format!("Query error: {}", e)))?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, job_id, url, hash, status, headers, content_type, score, categories, confidence, created) =
                row.map_err(|e| LinkshieldError::Database(format!("Row error: {}", e)))?;
            entries.push(AuditLogEntry {
                id,
                job_id,
                url_accessed: url,
                content_hash: hash,
                http_status: status.map(|s| s as u16),
                http_headers: headers
                    .map(|h| serde_json::from_str::<HashMap<String, String>>(&h))
                    .transpose()?,
                content_type,
                risk_score: score,
                categories: categories
                    .map(|c| serde_json::from_str::<Vec<String>>(&c))
                    .transpose()?,
                confidence,
                created_at: parse_timestamp(&created)?,
            });
        }
        Ok(entries)
    }
}
