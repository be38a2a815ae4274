use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::LinkshieldError;

/// Service configuration, loadable from a YAML file. Every field has a
/// default so a bare `linkshield serve` works out of the box.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Credits consumed per scan.
    pub scan_cost: i64,
    /// Maximum age of a cached verdict considered valid for reuse.
    pub cache_ttl_secs: u64,
    /// Per-request timeout for the fetch phase.
    pub fetch_timeout_secs: u64,
    /// Bounded retry budget for the fetch phase.
    pub fetch_max_retries: u32,
    /// Hard wall-clock budget for the assessment phase.
    pub analysis_timeout_secs: u64,
    /// Worker pool size.
    pub workers: usize,
    /// Idle poll interval when the queue is empty.
    pub poll_interval_ms: u64,
    /// Model identifier for the assessment call.
    pub model: String,
    /// OpenAI-compatible endpoint base URL.
    pub model_base_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            scan_cost: 1,
            cache_ttl_secs: 30 * 24 * 3600,
            fetch_timeout_secs: 30,
            fetch_max_retries: 3,
            analysis_timeout_secs: 120,
            workers: 4,
            poll_interval_ms: 500,
            model: "gpt-4o".to_string(),
            model_base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl ServiceConfig {
    pub async fn load(path: &Path) -> Result<Self, LinkshieldError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            LinkshieldError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LinkshieldError> {
        if self.scan_cost <= 0 {
            return Err(LinkshieldError::Config(format!(
                "scan_cost must be positive, got {}",
                self.scan_cost
            )));
        }
        if self.cache_ttl_secs == 0 {
            return Err(LinkshieldError::Config("cache_ttl_secs must be positive".into()));
        }
        if self.analysis_timeout_secs == 0 {
            return Err(LinkshieldError::Config("analysis_timeout_secs must be positive".into()));
        }
        if self.workers == 0 {
            return Err(LinkshieldError::Config("workers must be positive".into()));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scan_cost, 1);
        assert_eq!(config.cache_ttl(), Duration::from_secs(30 * 24 * 3600));
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: ServiceConfig = serde_yaml::from_str("scan_cost: 2\nworkers: 8\n").unwrap();
        assert_eq!(config.scan_cost, 2);
        assert_eq!(config.workers, 8);
        assert_eq!(config.fetch_max_retries, 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = ServiceConfig::default();
        config.scan_cost = 0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.workers = 0;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linkshield.yaml");
        tokio::fs::write(&path, "analysis_timeout_secs: 60\nmodel: gpt-4o-mini\n")
            .await
            .unwrap();

        let config = ServiceConfig::load(&path).await.unwrap();
        assert_eq!(config.analysis_timeout_secs, 60);
        assert_eq!(config.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = ServiceConfig::load(Path::new("/nonexistent/linkshield.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkshieldError::Config(_)));
    }
}
