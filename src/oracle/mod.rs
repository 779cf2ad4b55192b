//! Text-completion oracle
//!
//! The pipeline only needs `complete(prompt) -> text`. Concrete clients talk
//! to Google Gemini or any OpenAI-compatible chat-completions endpoint; tests
//! inject their own implementations.

pub mod gemini;
pub mod openai;

pub use gemini::GeminiOracle;
pub use openai::OpenAiOracle;

use crate::config::{OracleConfig, OracleProvider};
use async_trait::async_trait;
use std::sync::Arc;

/// Text-completion service
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Send one prompt and return the raw response text
    async fn complete(&self, prompt: &str) -> Result<String, OracleError>;

    /// Model name for logging
    fn model_name(&self) -> &str;
}

/// Oracle errors
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Empty response from model")]
    EmptyResponse,
}

impl From<reqwest::Error> for OracleError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            OracleError::Timeout(e.to_string())
        } else {
            OracleError::Network(e.to_string())
        }
    }
}

/// Build the oracle selected by `config.provider`
pub fn from_config(config: &OracleConfig) -> Result<Arc<dyn Oracle>, OracleError> {
    let oracle: Arc<dyn Oracle> = match config.provider {
        OracleProvider::Gemini => Arc::new(GeminiOracle::new(config.clone())?),
        OracleProvider::OpenAi => Arc::new(OpenAiOracle::new(config.clone())?),
    };
    Ok(oracle)
}
