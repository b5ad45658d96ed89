//! Description enhancement through a hosted completion model.
//!
//! Wraps the Gemini `generateContent` REST endpoint. The client sends the
//! dispatch seed wrapped in a short instruction and returns the first
//! candidate's text; everything beyond that (trimming, truncation, the
//! stock fallback) is the dispatcher's job.

use std::time::Duration;

use lifeline_core::{DescriptionEnhancer, PortError};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::RelayError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";
const PROMPT_PREFIX: &str = "Rewrite the following emergency report as one clear sentence for \
                             dispatch staff. Reply with the sentence only.\n\n";

/// Client for the Gemini `generateContent` endpoint.
///
/// Use [`EnhancerClient::new`] for production or
/// [`EnhancerClient::with_base_url`] to point at a mock server in tests.
pub struct EnhancerClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

impl EnhancerClient {
    /// Creates a client pointed at the hosted Gemini API.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`RelayError::Config`] if `model` does
    /// not form a valid endpoint path.
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, RelayError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`RelayError::Config`] if `base_url` or
    /// `model` do not form a valid endpoint.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("lifeline/0.1 (emergency-dispatch)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|base| base.join(&format!("v1beta/models/{model}:generateContent")))
            .map_err(|e| {
                RelayError::Config(format!("invalid endpoint for model '{model}': {e}"))
            })?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
        })
    }

    /// Asks the model to rewrite `seed` into a dispatch-ready sentence.
    ///
    /// # Errors
    ///
    /// - [`RelayError::Http`] on network failure.
    /// - [`RelayError::UnexpectedStatus`] when the API answers with a
    ///   non-2xx status.
    /// - [`RelayError::Deserialize`] if the body is not the expected shape.
    /// - [`RelayError::EmptyCompletion`] when no candidate carries text.
    pub async fn enhance_description(&self, seed: &str) -> Result<String, RelayError> {
        let prompt = format!("{PROMPT_PREFIX}{seed}");
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
        };

        let response = self
            .client
            .post(self.request_url())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::UnexpectedStatus {
                status,
                context: format!("generateContent({})", self.model),
            });
        }

        let text = response.text().await?;
        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| RelayError::Deserialize {
                context: format!("generateContent({})", self.model),
                source: e,
            })?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .filter(|completion| !completion.trim().is_empty())
            .ok_or(RelayError::EmptyCompletion)
    }

    /// Endpoint plus the `key` query parameter, percent-encoded by `Url`.
    fn request_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("key", &self.api_key);
        url
    }
}

#[async_trait::async_trait]
impl DescriptionEnhancer for EnhancerClient {
    async fn enhance(&self, seed: &str) -> Result<String, PortError> {
        self.enhance_description(seed)
            .await
            .map_err(|e| PortError::new(e.to_string()))
    }
}

/// Enhancer used when no completion service is configured. Returns the
/// seed unchanged so the dispatcher's own fallback rules still apply.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoEnhancer;

#[async_trait::async_trait]
impl DescriptionEnhancer for EchoEnhancer {
    async fn enhance(&self, seed: &str) -> Result<String, PortError> {
        Ok(seed.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_embeds_the_model_name() {
        let client = EnhancerClient::with_base_url("k", "gemini-1.5-flash", 10, "http://localhost:9000")
            .expect("client construction should not fail");
        assert_eq!(
            client.endpoint.as_str(),
            "http://localhost:9000/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn request_url_appends_the_key() {
        let client = EnhancerClient::with_base_url("secret", "m", 10, "http://localhost:9000")
            .expect("client construction should not fail");
        assert_eq!(
            client.request_url().as_str(),
            "http://localhost:9000/v1beta/models/m:generateContent?key=secret"
        );
    }

    #[tokio::test]
    async fn echo_enhancer_returns_the_seed() {
        let out = EchoEnhancer
            .enhance("medical emergency at current location")
            .await
            .expect("echo never fails");
        assert_eq!(out, "medical emergency at current location");
    }
}
