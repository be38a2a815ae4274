use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::analyzer::Analyzer;
use crate::audit::AuditRecorder;
use crate::cache::{CachedVerdict, ResultCache};
use crate::config::ServiceConfig;
use crate::db::Database;
use crate::errors::{with_retry, LinkshieldError, RetryConfig};
use crate::ledger::WalletLedger;
use crate::models::{
    AuditLogInput, FetchedContent, JobState, RiskAssessment, ScanJob, ScanResult,
};

/// The scan-job lifecycle engine. Drives a submitted URL from intake to
/// a terminal verdict: reserve a credit, fetch, consult the verdict
/// cache, assess on a miss, persist the result, and settle or refund
/// the reservation. Each transition is committed before the next phase
/// starts, guarded by the job's version counter.
pub struct ScanOrchestrator {
    db: Database,
    ledger: WalletLedger,
    cache: ResultCache,
    recorder: AuditRecorder,
    analyzer: Arc<dyn Analyzer>,
    config: ServiceConfig,
}

impl ScanOrchestrator {
    pub fn new(db: Database, analyzer: Arc<dyn Analyzer>, config: ServiceConfig) -> Self {
        let ledger = WalletLedger::new(db.clone());
        let cache = ResultCache::new(db.clone(), config.cache_ttl());
        let recorder = AuditRecorder::new(db.clone());
        Self { db, ledger, cache, recorder, analyzer, config }
    }

    pub fn ledger(&self) -> &WalletLedger {
        &self.ledger
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Intake: validate the URL, hold one scan's worth of credit, and
    /// enqueue the job. `InsufficientCredit` rejects before any job row
    /// exists; the worker pool picks the job up asynchronously.
    pub fn submit(&self, user_id: &str, url: &str) -> Result<ScanJob, LinkshieldError> {
        validate_url(url)?;

        let job_id = uuid::Uuid::new_v4().to_string();
        let reservation = self.ledger.reserve(user_id, self.config.scan_cost, &job_id)?;

        match self.db.create_job(&job_id, user_id, url, &reservation.id) {
            Ok(job) => {
                info!(job_id = %job.id, user_id, url, "Scan job queued");
                Ok(job)
            }
            Err(e) => {
                // The hold must not dangle if the job row cannot be written
                if let Err(refund_err) = self.ledger.refund(&reservation.id) {
                    error!(reservation_id = %reservation.id, error = %refund_err,
                        "Failed to release reservation after job creation failure");
                }
                Err(e)
            }
        }
    }

    /// Drive one claimed-or-claimable job end-to-end. Losing the claim
    /// race is not an error: the winning worker owns the job.
    pub async fn process(&self, job: &ScanJob) -> Result<(), LinkshieldError> {
        let version = match self.db.transition_job(&job.id, job.version, JobState::Fetching, None) {
            Ok(v) => v,
            Err(LinkshieldError::StaleVersion(_)) => {
                debug!(job_id = %job.id, "Job already claimed by another worker");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let retry = RetryConfig { max_retries: self.config.fetch_max_retries };
        let content = match with_retry("fetch", &retry, || self.analyzer.fetch(&job.url)).await {
            Ok(content) => content,
            Err(e) => {
                self.finish_failed(job, version, JobState::Failed, &e.to_string(), None)?;
                return Ok(());
            }
        };

        if let Some(verdict) = self.cache.lookup(&content.content_hash)? {
            info!(job_id = %job.id, content_hash = %content.content_hash,
                "Cache hit, reusing verdict");
            return self.finish_completed_cached(job, version, &content, verdict);
        }

        let version = self.db.transition_job(&job.id, version, JobState::Analyzing, None)?;

        let assessment = match tokio::time::timeout(
            self.config.analysis_timeout(),
            self.analyzer.assess(&content),
        )
        .await
        {
            Err(_) => {
                // The assess future was dropped; a late verdict can
                // never reach an already-terminal job.
                let msg = format!(
                    "Analysis exceeded {}s budget",
                    self.config.analysis_timeout_secs
                );
                self.finish_failed(job, version, JobState::TimedOut, &msg, Some(&content))?;
                return Ok(());
            }
            Ok(Err(e)) => {
                self.finish_failed(job, version, JobState::Failed, &e.to_string(), Some(&content))?;
                return Ok(());
            }
            Ok(Ok(assessment)) => assessment,
        };

        if let Err(e) = assessment.validate() {
            self.finish_failed(job, version, JobState::Failed, &e.to_string(), Some(&content))?;
            return Ok(());
        }

        let result = ScanResult::from_assessment(&job.id, &content, assessment);
        self.db.insert_result(&result)?;
        self.db.transition_job(&job.id, version, JobState::Completed, None)?;
        self.ledger.settle(&job.reservation_id)?;
        self.record_audit(job, Some(&content), Some(&result));

        info!(job_id = %job.id, risk_score = result.risk_score, "Scan completed");
        Ok(())
    }

    /// Cache-hit completion: the cached verdict is copied into a fresh
    /// result row for this job, with this fetch's own metadata, and the
    /// job steps through analyzing to completed without ever invoking
    /// the assessment.
    fn finish_completed_cached(
        &self,
        job: &ScanJob,
        version: i64,
        content: &FetchedContent,
        verdict: CachedVerdict,
    ) -> Result<(), LinkshieldError> {
        let version = self.db.transition_job(&job.id, version, JobState::Analyzing, None)?;

        let assessment = RiskAssessment {
            risk_score: verdict.risk_score,
            categories: verdict.categories,
            confidence: verdict.confidence,
            reasoning: verdict.reasoning,
            indicators: verdict.indicators,
            model_used: verdict.model_used,
            analysis_metadata: verdict.analysis_metadata,
        };
        let result = ScanResult::from_assessment(&job.id, content, assessment);
        self.db.insert_result(&result)?;
        self.db.transition_job(&job.id, version, JobState::Completed, None)?;
        self.ledger.settle(&job.reservation_id)?;
        self.record_audit(job, Some(content), Some(&result));

        info!(job_id = %job.id, risk_score = result.risk_score, "Scan completed from cache");
        Ok(())
    }

    /// Terminal failure path: transition, refund the reservation, and
    /// record an audit entry with whatever metadata the fetch produced.
    /// FAILED and TIMED_OUT always imply the refund happened.
    fn finish_failed(
        &self,
        job: &ScanJob,
        version: i64,
        state: JobState,
        message: &str,
        content: Option<&FetchedContent>,
    ) -> Result<(), LinkshieldError> {
        self.db.transition_job(&job.id, version, state, Some(message))?;
        self.ledger.refund(&job.reservation_id)?;
        self.record_audit(job, content, None);
        warn!(job_id = %job.id, state = %state, error = message, "Scan did not complete");
        Ok(())
    }

    /// Audit failures are compliance-adjacent, not correctness-critical
    /// to the verdict, so they are logged and never roll back the job.
    fn record_audit(&self, job: &ScanJob, content: Option<&FetchedContent>, result: Option<&ScanResult>) {
        let input = AuditLogInput {
            job_id: job.id.clone(),
            url_accessed: job.url.clone(),
            content_hash: content.map(|c| c.content_hash.clone()),
            http_status: content.map(|c| c.http_status),
            http_headers: content.map(|c| c.http_headers.clone()),
            content_type: content.and_then(|c| c.content_type.clone()),
            risk_score: result.map(|r| r.risk_score),
            categories: result.map(|r| r.categories.clone()),
            confidence: result.map(|r| r.confidence),
        };
        if let Err(e) = self.recorder.record(&input) {
            error!(job_id = %job.id, error = %e, "Failed to record audit entry");
        }
    }
}

/// Syntactic URL validation at intake. Only http(s) targets with a host
/// are scannable.
pub fn validate_url(url: &str) -> Result<(), LinkshieldError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| LinkshieldError::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(LinkshieldError::InvalidUrl(format!(
                "unsupported scheme '{}' in {}",
                other, url
            )))
        }
    }
    if parsed.host_str().is_none() {
        return Err(LinkshieldError::InvalidUrl(format!("no host in {}", url)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_accepts_http_and_https() {
        assert!(validate_url("https://example.com/path?q=1").is_ok());
        assert!(validate_url("http://example.com").is_ok());
    }

    #[test]
    fn test_validate_url_rejects_other_schemes() {
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
        assert!(validate_url("javascript:alert(1)").is_err());
    }

    #[test]
    fn test_validate_url_rejects_malformed() {
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("").is_err());
    }
}
