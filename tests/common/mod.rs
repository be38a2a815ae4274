#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use linkshield::analyzer::http::content_fingerprint;
use linkshield::analyzer::Analyzer;
use linkshield::config::ServiceConfig;
use linkshield::errors::LinkshieldError;
use linkshield::models::{FetchedContent, RiskAssessment};

/// What the scripted analyzer's assessment phase should do.
#[derive(Debug, Clone)]
pub enum AssessOutcome {
    /// Return a verdict with this score and confidence.
    Verdict { risk_score: i64, confidence: f64 },
    /// Fail with an analysis error.
    Error(String),
    /// Sleep for this long before returning a verdict, to trip the
    /// orchestrator's wall-clock budget.
    Hang(Duration),
}

/// Programmable analyzer for driving lifecycle scenarios without any
/// network or model. Counts calls so tests can assert the assessment
/// never ran on a cache hit.
pub struct ScriptedAnalyzer {
    pub body: Vec<u8>,
    pub http_status: u16,
    pub fetch_failures_remaining: AtomicU32,
    pub assess_outcome: AssessOutcome,
    pub fetch_calls: AtomicU32,
    pub assess_calls: AtomicU32,
}

impl ScriptedAnalyzer {
    pub fn new(body: &[u8], assess_outcome: AssessOutcome) -> Self {
        Self {
            body: body.to_vec(),
            http_status: 200,
            fetch_failures_remaining: AtomicU32::new(0),
            assess_outcome,
            fetch_calls: AtomicU32::new(0),
            assess_calls: AtomicU32::new(0),
        }
    }

    pub fn failing_fetch(attempts: u32) -> Self {
        let analyzer = Self::new(b"", AssessOutcome::Verdict { risk_score: 0, confidence: 1.0 });
        analyzer.fetch_failures_remaining.store(attempts, Ordering::SeqCst);
        analyzer
    }

    pub fn assess_count(&self) -> u32 {
        self.assess_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Analyzer for ScriptedAnalyzer {
    async fn fetch(&self, url: &str) -> Result<FetchedContent, LinkshieldError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fetch_failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fetch_failures_remaining.fetch_sub(1, Ordering::SeqCst);
            return Err(LinkshieldError::Fetch(format!("scripted failure for {}", url)));
        }
        Ok(FetchedContent {
            url: url.to_string(),
            content_hash: content_fingerprint(&self.body),
            http_status: self.http_status,
            http_headers: [("server".to_string(), "scripted".to_string())].into(),
            content_type: Some("text/html".into()),
            body: self.body.clone(),
        })
    }

    async fn assess(&self, _content: &FetchedContent) -> Result<RiskAssessment, LinkshieldError> {
        self.assess_calls.fetch_add(1, Ordering::SeqCst);
        match &self.assess_outcome {
            AssessOutcome::Verdict { risk_score, confidence } => Ok(RiskAssessment {
                risk_score: *risk_score,
                categories: vec!["phishing".into()],
                confidence: *confidence,
                reasoning: "scripted verdict".into(),
                indicators: vec!["scripted indicator".into()],
                model_used: "scripted-model".into(),
                analysis_metadata: None,
            }),
            AssessOutcome::Error(message) => Err(LinkshieldError::Analysis(message.clone())),
            AssessOutcome::Hang(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(RiskAssessment {
                    risk_score: 10,
                    categories: vec![],
                    confidence: 0.5,
                    reasoning: "late verdict".into(),
                    indicators: vec![],
                    model_used: "scripted-model".into(),
                    analysis_metadata: None,
                })
            }
        }
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

/// Test config: single fetch retry and a one-second assessment budget
/// keep scenario runtimes short.
pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        fetch_max_retries: 1,
        analysis_timeout_secs: 1,
        workers: 1,
        poll_interval_ms: 10,
        ..ServiceConfig::default()
    }
}
