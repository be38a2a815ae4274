use super::types::LinkshieldError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

impl LinkshieldError {
    /// Classify this error to determine its type and whether the fetch
    /// phase may retry it. Only network-level fetch failures retry; an
    /// analysis failure is terminal for the job and resubmission is a
    /// fresh job so that credit accounting stays 1:1 with attempts the
    /// user can see.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Retryable errors
            LinkshieldError::Fetch(_) => ErrorClassification {
                error_type: "FetchError",
                retryable: true,
            },

            // Non-retryable errors
            LinkshieldError::Analysis(_) => ErrorClassification {
                error_type: "AnalysisError",
                retryable: false,
            },
            LinkshieldError::Timeout(_) => ErrorClassification {
                error_type: "TimeoutError",
                retryable: false,
            },
            LinkshieldError::Validation(_) => ErrorClassification {
                error_type: "ValidationError",
                retryable: false,
            },
            LinkshieldError::InvalidUrl(_) => ErrorClassification {
                error_type: "InvalidUrlError",
                retryable: false,
            },
            LinkshieldError::InsufficientCredit { .. } => ErrorClassification {
                error_type: "InsufficientCreditError",
                retryable: false,
            },
            LinkshieldError::AlreadySettled(_) => ErrorClassification {
                error_type: "AlreadySettledError",
                retryable: false,
            },
            LinkshieldError::StaleVersion(_) => ErrorClassification {
                error_type: "StaleVersionError",
                retryable: false,
            },
            LinkshieldError::NotFound(_) => ErrorClassification {
                error_type: "NotFoundError",
                retryable: false,
            },
            LinkshieldError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                retryable: false,
            },
            LinkshieldError::Database(_) => ErrorClassification {
                error_type: "DatabaseError",
                retryable: false,
            },
            LinkshieldError::Io(_) => ErrorClassification {
                error_type: "IoError",
                retryable: false,
            },
            LinkshieldError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                retryable: false,
            },
            LinkshieldError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                retryable: false,
            },
            LinkshieldError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                retryable: false,
            },
        }
    }
}
