pub mod http;
pub mod llm;

pub use http::HttpFetcher;
pub use llm::LlmAnalyzer;

use async_trait::async_trait;

use crate::errors::LinkshieldError;
use crate::models::{FetchedContent, RiskAssessment};

/// The analyzer capability consumed by the orchestrator: a fetch phase
/// producing content metadata and fingerprint, and an assessment phase
/// producing a risk verdict. Both may be slow; the orchestrator bounds
/// the assessment with a wall-clock budget and retries only the fetch.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Retrieve the target and derive its content fingerprint.
    async fn fetch(&self, url: &str) -> Result<FetchedContent, LinkshieldError>;

    /// Assess fetched content for risk. Runs only on a cache miss.
    async fn assess(&self, content: &FetchedContent) -> Result<RiskAssessment, LinkshieldError>;

    /// Model identifier for logging and result attribution.
    fn model_name(&self) -> &str;
}
