use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::http::HttpFetcher;
use super::Analyzer;
use crate::errors::LinkshieldError;
use crate::models::{FetchedContent, RiskAssessment};

const SYSTEM_PROMPT: &str = "You are a URL safety analyst. Given the metadata and body excerpt of \
a fetched web page, assess how risky the page is for an end user. Consider phishing, malware \
distribution, credential harvesting, scams, and deceptive content. Respond ONLY with a JSON object: \
{\"risk_score\": <integer 0-100>, \"categories\": [<strings>], \"confidence\": <0.0-1.0>, \
\"reasoning\": <string>, \"indicators\": [<strings>]}";

/// How much of the page body is shown to the model. Pages are routinely
/// much larger than any model needs to judge intent.
const BODY_EXCERPT_BYTES: usize = 16 * 1024;

/// Analyzer backed by an OpenAI-compatible chat completions endpoint.
pub struct LlmAnalyzer {
    fetcher: HttpFetcher,
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl LlmAnalyzer {
    pub fn new(
        api_key: &str,
        model: &str,
        base_url: &str,
        fetch_timeout: Duration,
    ) -> Result<Self, LinkshieldError> {
        Ok(Self {
            fetcher: HttpFetcher::new(fetch_timeout)?,
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_prompt(content: &FetchedContent) -> String {
        let excerpt_len = content.body.len().min(BODY_EXCERPT_BYTES);
        let excerpt = String::from_utf8_lossy(&content.body[..excerpt_len]);
        format!(
            "URL: {}\nHTTP status: {}\nContent-Type: {}\nBody excerpt ({} of {} bytes):\n{}",
            content.url,
            content.http_status,
            content.content_type.as_deref().unwrap_or("unknown"),
            excerpt_len,
            content.body.len(),
            excerpt
        )
    }

    fn parse_assessment(&self, raw: &str) -> Result<RiskAssessment, LinkshieldError> {
        // Models occasionally wrap the JSON in a code fence
        let trimmed = raw
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| LinkshieldError::Analysis(format!("Model returned invalid JSON: {}", e)))?;

        let risk_score = value["risk_score"]
            .as_i64()
            .ok_or_else(|| LinkshieldError::Analysis("Missing risk_score in model output".into()))?;
        let confidence = value["confidence"]
            .as_f64()
            .ok_or_else(|| LinkshieldError::Analysis("Missing confidence in model output".into()))?;
        let categories = value["categories"]
            .as_array()
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        let indicators = value["indicators"]
            .as_array()
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        let reasoning = value["reasoning"].as_str().unwrap_or_default().to_string();

        Ok(RiskAssessment {
            risk_score,
            categories,
            confidence,
            reasoning,
            indicators,
            model_used: self.model.clone(),
            analysis_metadata: None,
        })
    }
}

#[async_trait]
impl Analyzer for LlmAnalyzer {
    async fn fetch(&self, url: &str) -> Result<FetchedContent, LinkshieldError> {
        self.fetcher.fetch(url).await
    }

    async fn assess(&self, content: &FetchedContent) -> Result<RiskAssessment, LinkshieldError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": Self::build_prompt(content)},
            ],
            "max_tokens": 1024,
            "response_format": { "type": "json_object" },
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| LinkshieldError::Analysis(format!("Model request failed: {}", e)))?;

        let status = resp.status();
        let data: Value = resp
            .json()
            .await
            .map_err(|e| LinkshieldError::Analysis(format!("Failed to parse model response: {}", e)))?;

        if let Some(error) = data.get("error") {
            return Err(LinkshieldError::Analysis(
                error["message"].as_str().unwrap_or("Unknown model error").to_string(),
            ));
        }
        if !status.is_success() {
            return Err(LinkshieldError::Analysis(format!("Model endpoint returned HTTP {}", status)));
        }

        let content_str = data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LinkshieldError::Analysis("No content in model response".into()))?;

        self.parse_assessment(content_str)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> LlmAnalyzer {
        LlmAnalyzer::new("test-key", "gpt-4o", "https://api.openai.com/v1", Duration::from_secs(10))
            .unwrap()
    }

    #[test]
    fn test_parse_assessment() {
        let raw = r#"{"risk_score": 85, "categories": ["phishing"], "confidence": 0.92,
            "reasoning": "fake bank login", "indicators": ["lookalike domain"]}"#;
        let assessment = analyzer().parse_assessment(raw).unwrap();
        assert_eq!(assessment.risk_score, 85);
        assert_eq!(assessment.categories, vec!["phishing"]);
        assert_eq!(assessment.confidence, 0.92);
        assert_eq!(assessment.model_used, "gpt-4o");
    }

    #[test]
    fn test_parse_assessment_code_fenced() {
        let raw = "```json\n{\"risk_score\": 10, \"categories\": [], \"confidence\": 0.8, \"reasoning\": \"benign\", \"indicators\": []}\n```";
        let assessment = analyzer().parse_assessment(raw).unwrap();
        assert_eq!(assessment.risk_score, 10);
    }

    #[test]
    fn test_parse_assessment_invalid_json() {
        assert!(analyzer().parse_assessment("the page looks fine to me").is_err());
    }

    #[test]
    fn test_parse_assessment_missing_score() {
        let raw = r#"{"categories": [], "confidence": 0.8}"#;
        assert!(analyzer().parse_assessment(raw).is_err());
    }

    #[test]
    fn test_build_prompt_truncates_body() {
        let content = FetchedContent {
            url: "https://example.com".into(),
            content_hash: "a".repeat(64),
            http_status: 200,
            http_headers: Default::default(),
            content_type: Some("text/html".into()),
            body: vec![b'x'; BODY_EXCERPT_BYTES * 4],
        };
        let prompt = LlmAnalyzer::build_prompt(&content);
        assert!(prompt.len() < BODY_EXCERPT_BYTES * 2);
    }
}
