use std::collections::HashMap;
use std::time::Duration;

use data_encoding::HEXLOWER;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::errors::LinkshieldError;
use crate::models::FetchedContent;

/// Compute the content fingerprint: lowercase hex sha256 of the body.
pub fn content_fingerprint(body: &[u8]) -> String {
    let digest = Sha256::digest(body);
    HEXLOWER.encode(&digest)
}

/// HTTP fetch phase. Downloads the target, captures response metadata,
/// and fingerprints the body. Non-2xx responses are fetch errors so the
/// bounded retry in the orchestrator can take another attempt.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(request_timeout: Duration) -> Result<Self, LinkshieldError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("linkshield/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LinkshieldError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchedContent, LinkshieldError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LinkshieldError::Fetch(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LinkshieldError::Fetch(format!(
                "{} returned HTTP {}",
                url,
                status.as_u16()
            )));
        }

        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str().to_string(), v.to_string());
            }
        }
        let content_type = headers.get("content-type").cloned();

        let body = response
            .bytes()
            .await
            .map_err(|e| LinkshieldError::Fetch(format!("Failed to read body from {}: {}", url, e)))?
            .to_vec();

        let content_hash = content_fingerprint(&body);
        debug!(url, content_hash = %content_hash, bytes = body.len(), "Fetched target");

        Ok(FetchedContent {
            url: url.to_string(),
            content_hash,
            http_status: status.as_u16(),
            http_headers: headers,
            content_type,
            body,
        })
    }
}
