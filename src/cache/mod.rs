use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::db::Database;
use crate::errors::LinkshieldError;
use crate::models::ScanResult;

/// Verdict fields reused from a previous analysis of identical content.
/// Confidence is propagated from the original analysis, not defaulted.
#[derive(Debug, Clone)]
pub struct CachedVerdict {
    pub risk_score: i64,
    pub categories: Vec<String>,
    pub confidence: f64,
    pub reasoning: String,
    pub indicators: Vec<String>,
    pub model_used: String,
    pub analysis_metadata: Option<serde_json::Value>,
}

impl From<ScanResult> for CachedVerdict {
    fn from(result: ScanResult) -> Self {
        Self {
            risk_score: result.risk_score,
            categories: result.categories,
            confidence: result.confidence,
            reasoning: result.reasoning,
            indicators: result.indicators,
            model_used: result.model_used,
            analysis_metadata: result.analysis_metadata,
        }
    }
}

/// Content-addressed verdict cache. Scan results double as cache
/// entries keyed by their content hash; two URLs serving byte-identical
/// content share one verdict, so the expensive assessment runs once.
#[derive(Clone)]
pub struct ResultCache {
    db: Database,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(db: Database, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    /// The newest unexpired verdict for this content hash, or a miss.
    /// An entry older than the TTL is a guaranteed miss, never a stale
    /// hit.
    pub fn lookup(&self, content_hash: &str) -> Result<Option<CachedVerdict>, LinkshieldError> {
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| LinkshieldError::Config(format!("Cache TTL out of range: {}", e)))?;
        let cutoff = Utc::now() - ttl;

        match self.db.latest_result_for_hash(content_hash, cutoff)? {
            Some(result) => {
                debug_assert_eq!(result.content_hash, content_hash);
                debug!(content_hash, source_job = %result.job_id, "Cache hit");
                Ok(Some(result.into()))
            }
            None => {
                debug!(content_hash, "Cache miss");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn store_result(db: &Database, job_id: &str, hash: &str, age: chrono::Duration, score: i64) {
        db.create_job(job_id, "user-1", "https://example.com", "res").unwrap();
        db.insert_result(&ScanResult {
            job_id: job_id.to_string(),
            risk_score: score,
            categories: vec!["malware".into()],
            confidence: 0.73,
            reasoning: "drive-by download".into(),
            indicators: vec![],
            content_hash: hash.to_string(),
            http_status: 200,
            http_headers: HashMap::new(),
            content_type: Some("text/html".into()),
            model_used: "test-model".into(),
            analysis_metadata: None,
            created_at: Utc::now() - age,
        })
        .unwrap();
    }

    #[test]
    fn test_lookup_hit_within_ttl() {
        let db = Database::in_memory().unwrap();
        let hash = "e".repeat(64);
        store_result(&db, "job-1", &hash, chrono::Duration::days(5), 62);

        let cache = ResultCache::new(db, Duration::from_secs(30 * 24 * 3600));
        let verdict = cache.lookup(&hash).unwrap().unwrap();
        assert_eq!(verdict.risk_score, 62);
        assert_eq!(verdict.confidence, 0.73);
    }

    #[test]
    fn test_lookup_expired_is_miss() {
        let db = Database::in_memory().unwrap();
        let hash = "f".repeat(64);
        store_result(&db, "job-1", &hash, chrono::Duration::days(45), 62);

        let cache = ResultCache::new(db, Duration::from_secs(30 * 24 * 3600));
        assert!(cache.lookup(&hash).unwrap().is_none());
    }

    #[test]
    fn test_lookup_selects_newest_unexpired() {
        let db = Database::in_memory().unwrap();
        let hash = "1".repeat(64);
        store_result(&db, "job-1", &hash, chrono::Duration::days(20), 30);
        store_result(&db, "job-2", &hash, chrono::Duration::days(2), 90);

        let cache = ResultCache::new(db, Duration::from_secs(30 * 24 * 3600));
        let verdict = cache.lookup(&hash).unwrap().unwrap();
        assert_eq!(verdict.risk_score, 90);
    }

    #[test]
    fn test_lookup_unknown_hash_is_miss() {
        let db = Database::in_memory().unwrap();
        let cache = ResultCache::new(db, Duration::from_secs(3600));
        assert!(cache.lookup(&"2".repeat(64)).unwrap().is_none());
    }

    #[test]
    fn test_confidence_propagated_not_defaulted() {
        let db = Database::in_memory().unwrap();
        let hash = "3".repeat(64);
        store_result(&db, "job-1", &hash, chrono::Duration::hours(1), 50);

        let cache = ResultCache::new(db, Duration::from_secs(30 * 24 * 3600));
        let verdict = cache.lookup(&hash).unwrap().unwrap();
        assert_eq!(verdict.confidence, 0.73);
    }
}
