//! Google Gemini API client for reply generation.
//!
//! One call per reply: POST `models/{model}:generateContent` with the API key
//! as a query credential. HTTP 429 is surfaced as `Error::RateLimited` so the
//! caller can park the key and rotate.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_GEMINI_MODEL, GENERATION_TIMEOUT_SECS};
use crate::error::{Error, Result};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Shorten a key for log lines, mirroring only the first characters.
pub(crate) fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(5).collect();
    format!("{}...", prefix)
}

/// Google Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Create a client with the default model.
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .user_agent("discord_responder/0.1.0")
            .build()
            .map_err(|e| Error::InvalidArgument(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            base_url: GEMINI_API_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
        })
    }

    /// Set the model.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Point the client at a different API root (tests use a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Generate text for the prompt using the given API key. Returns the
    /// first candidate's text, trimmed; an empty string when the response
    /// carries no candidates.
    pub async fn generate(&self, prompt: &str, api_key: &str) -> Result<String> {
        let payload = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, api_key
        );

        let response = self
            .http
            .post(&url)
            .timeout(Duration::from_secs(GENERATION_TIMEOUT_SECS))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(Error::RateLimited(mask_key(api_key)));
        }

        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::HttpError {
                status: status.as_u16(),
                message: text,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)?;
        let generated = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .unwrap_or_default();

        Ok(generated)
    }
}

// === Wire structures ===

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<Part>,
}
