//! Minimal Rasa NLU client.
//!
//! This crate provides a focused client for a Rasa-style model server's
//! parse endpoint: it posts a lower-cased utterance to `POST /model/parse`
//! and returns the predicted intent, its confidence, and any extracted
//! entities. Nothing else from the Rasa HTTP API is exposed.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Errors that can occur when using the NLU client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("NLU server URL not configured")]
    NoServerUrl,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Request body for the parse endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ParseRequest {
    /// The raw utterance to classify.
    pub text: String,

    /// Optional message id echoed back by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl ParseRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            message_id: None,
        }
    }
}

/// The intent prediction in a parse response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentPrediction {
    pub name: String,
    pub confidence: f64,
}

/// A typed entity extracted from the utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEntity {
    /// Entity type name, e.g. `location` or `monster`.
    pub entity: String,

    /// The surface value extracted from the utterance.
    pub value: String,

    /// Extraction confidence in `[0, 1]`. Some extractors omit it; treat
    /// a missing score as fully confident.
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

fn full_confidence() -> f64 {
    1.0
}

/// Response from the parse endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResponse {
    pub intent: IntentPrediction,

    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,

    /// The text the server actually parsed.
    #[serde(default)]
    pub text: String,
}

/// Rasa NLU parse client.
#[derive(Clone)]
pub struct Rasa {
    client: reqwest::Client,
    base_url: String,
}

impl Rasa {
    /// Create a new client for the given server base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
                .connect_timeout(Duration::from_secs(5))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create a client from the `RASA_URL` environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let url = std::env::var("RASA_URL").map_err(|_| Error::NoServerUrl)?;
        Ok(Self::new(url))
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()
            .expect("Failed to build HTTP client");
        self
    }

    /// Parse a single utterance.
    pub async fn parse(&self, request: ParseRequest) -> Result<ParseResponse, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .client
            .post(format!("{}/model/parse", self.base_url))
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Server {
                status,
                message: body,
            });
        }

        response
            .json::<ParseResponse>()
            .await
            .map_err(|e| Error::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_deserialization() {
        let json = r#"{
            "text": "go to the cellar",
            "intent": {"name": "move", "confidence": 0.93},
            "entities": [
                {"entity": "location", "value": "cellar", "confidence": 0.88}
            ]
        }"#;

        let parsed: ParseResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.intent.name, "move");
        assert!(parsed.intent.confidence > 0.9);
        assert_eq!(parsed.entities.len(), 1);
        assert_eq!(parsed.entities[0].entity, "location");
        assert_eq!(parsed.entities[0].value, "cellar");
    }

    #[test]
    fn test_missing_entity_confidence_defaults_to_one() {
        let json = r#"{
            "intent": {"name": "attack", "confidence": 0.8},
            "entities": [{"entity": "monster", "value": "rat"}]
        }"#;

        let parsed: ParseResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.entities[0].confidence, 1.0);
        assert_eq!(parsed.text, "");
    }

    #[test]
    fn test_request_serialization_skips_empty_message_id() {
        let request = ParseRequest::new("look around");
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("look around"));
        assert!(!json.contains("message_id"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = Rasa::new("http://localhost:5005/");
        assert_eq!(client.base_url, "http://localhost:5005");
    }
}
