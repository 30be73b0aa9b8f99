//! Text-generation collaborator interface.

use std::{error::Error, fmt};

use async_trait::async_trait;

#[derive(Debug)]
pub enum ModelError {
    /// The request never produced a usable HTTP response.
    Transport(String),
    /// The model endpoint answered with an error or an empty completion.
    Api(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "transport error: {message}"),
            Self::Api(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ModelError {}

pub type ModelResult<T> = Result<T, ModelError>;

/// Single-shot text generation against a managed model endpoint.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Generates a completion for the prompt and returns the raw text.
    ///
    /// # Errors
    /// Returns `ModelError` if the invocation fails or yields no text.
    async fn generate(&self, prompt: &str) -> ModelResult<String>;
}
