//! Vertex AI implementation of the text-generation collaborator.
//!
//! One `generateContent` call per operation; sampling parameters are fixed
//! at construction and match the assistant's tuning (low temperature, wide
//! top-k). Authentication is a caller-supplied OAuth access token.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use sqlgenius_core::model::{ModelError, ModelResult, TextModel};

pub const DEFAULT_MODEL: &str = "gemini-1.0-pro";
pub const DEFAULT_LOCATION: &str = "us-central1";

const MAX_OUTPUT_TOKENS: u32 = 2048;
const TEMPERATURE: f32 = 0.3;
const TOP_P: f32 = 0.8;
const TOP_K: u32 = 40;

/// Model client bound to one project, location, and model for its lifetime.
pub struct VertexClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    project_id: String,
    location: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl VertexClient {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        project_id: String,
        location: String,
        model: String,
        access_token: String,
    ) -> Self {
        let base_url = format!("https://{location}-aiplatform.googleapis.com/v1");
        Self {
            http,
            base_url,
            access_token,
            project_id,
            location,
            model,
        }
    }

    /// Points the client at a different API endpoint (emulators, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.base_url, self.project_id, self.location, self.model
        )
    }
}

#[async_trait]
impl TextModel for VertexClient {
    async fn generate(&self, prompt: &str) -> ModelResult<String> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}]
            }],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "topP": TOP_P,
                "topK": TOP_K,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&body)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|err| ModelError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(match response.json::<ErrorResponse>().await {
                Ok(body) => ModelError::Api(body.error.message),
                Err(_) => ModelError::Api(format!("HTTP {status}")),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|err| ModelError::Api(format!("malformed model response: {err}")))?;

        let text = extract_text(&parsed);
        if text.is_empty() {
            return Err(ModelError::Api("no candidates in response".to_string()));
        }
        tracing::debug!(chars = text.len(), "model responded");
        Ok(text)
    }
}

/// Concatenates the text parts of the first candidate.
fn extract_text(response: &GenerateResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .map(|part| part.text.as_str())
                .collect::<String>()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: serde_json::Value) -> GenerateResponse {
        serde_json::from_value(value).expect("response parses")
    }

    #[test]
    fn first_candidate_text_is_joined() {
        let response = parse(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "SELECT 1"}, {"text": " -- done"}]
                }
            }, {
                "content": {"parts": [{"text": "ignored"}]}
            }]
        }));
        assert_eq!(extract_text(&response), "SELECT 1 -- done");
    }

    #[test]
    fn empty_candidates_yield_empty_text() {
        let response = parse(json!({"candidates": []}));
        assert_eq!(extract_text(&response), "");
    }

    #[test]
    fn candidate_without_content_is_tolerated() {
        let response = parse(json!({"candidates": [{"finishReason": "SAFETY"}]}));
        assert_eq!(extract_text(&response), "");
    }
}
