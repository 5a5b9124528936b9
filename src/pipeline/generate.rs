//! Text generation client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GeneratorConfig;

/// Errors from the text generation service
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Request could not be sent or the server answered with an error
    #[error("text generation request failed: {0}")]
    Http(String),

    /// Reply body was not the expected JSON
    #[error("failed to decode text generation reply: {0}")]
    Decode(String),

    /// The model returned nothing
    #[error("The model returned an empty response.")]
    EmptyResponse,
}

/// Shape the model is asked to answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Free-form text containing DSL.
    Text,
    /// A single JSON object.
    Json,
}

/// Anything that turns a prompt into text.
pub trait TextGenerator {
    /// Generate a completion for `prompt`. Empty completions are an error.
    fn generate(&self, prompt: &str, format: ResponseFormat) -> Result<String, GenerationError>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    fn generate(&self, prompt: &str, format: ResponseFormat) -> Result<String, GenerationError> {
        (**self).generate(prompt, format)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Client for an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaClient {
    agent: ureq::Agent,
    url: String,
    model: String,
}

impl OllamaClient {
    /// Build a client from configuration.
    pub fn new(config: &GeneratorConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();
        Self {
            agent,
            url: format!("{}/api/generate", config.endpoint.trim_end_matches('/')),
            model: config.model.clone(),
        }
    }

    /// Endpoint URL requests are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TextGenerator for OllamaClient {
    fn generate(&self, prompt: &str, format: ResponseFormat) -> Result<String, GenerationError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: match format {
                ResponseFormat::Json => Some("json"),
                ResponseFormat::Text => None,
            },
        };

        tracing::debug!(url = %self.url, model = %self.model, ?format, "requesting completion");
        let response = self
            .agent
            .post(&self.url)
            .send_json(&body)
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        let reply: GenerateResponse = response
            .into_body()
            .read_json()
            .map_err(|e| GenerationError::Decode(e.to_string()))?;

        if reply.response.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(reply.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_endpoint_without_double_slash() {
        let client = OllamaClient::new(&GeneratorConfig {
            endpoint: "http://llm.local:11434/".into(),
            ..GeneratorConfig::default()
        });
        assert_eq!(client.url(), "http://llm.local:11434/api/generate");
    }

    #[test]
    fn request_omits_format_for_text() {
        let body = GenerateRequest {
            model: "llama3:8b",
            prompt: "hi",
            stream: false,
            format: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"model": "llama3:8b", "prompt": "hi", "stream": false}));
    }
}
