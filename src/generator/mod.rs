//! Text generation backends.

mod gemini;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::{resolve_api_key, GeminiGenerator, PLACEHOLDER_API_KEY};

#[derive(Debug, Error)]
pub enum GenerationError {
    /// The API key environment variable is unset or empty.
    #[error("{var} is not set; add it to the environment or a .env file")]
    MissingApiKey { var: String },

    /// The API key still holds the value from the setup instructions.
    #[error("{var} still contains the placeholder value")]
    PlaceholderApiKey { var: String },

    /// The request URL is stripped from the inner error.
    #[error("request to the text generation API failed: {0}")]
    Transport(reqwest::Error),

    #[error("text generation API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected text generation response: {0}")]
    Malformed(String),

    /// The response parsed but contained no text.
    #[error("text generation returned an empty response")]
    Empty,
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        GenerationError::Transport(e.without_url())
    }
}

/// Produces a response for a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
