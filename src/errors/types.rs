use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkshieldError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Insufficient credit: {required} required, {available} available")]
    InsufficientCredit { required: i64, available: i64 },

    #[error("Reservation already settled: {0}")]
    AlreadySettled(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Stale version on job {0}")]
    StaleVersion(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
