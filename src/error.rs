//! Crate-level error types for construction and startup
//!
//! Failures inside a verification run never surface here; the pipeline turns
//! them into a `VerificationResult`. These errors cover building clients,
//! loading configuration and serving the API.

use crate::glossary::GlossaryError;
use crate::knowledge::FetchError;
use crate::oracle::OracleError;

/// Result alias used by constructors and startup code
pub type Result<T> = std::result::Result<T, VerifierError>;

/// Top-level error for the claim verifier
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Glossary error: {0}")]
    Glossary(#[from] GlossaryError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Knowledge endpoint error: {0}")]
    Knowledge(#[from] FetchError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<config::ConfigError> for VerifierError {
    fn from(e: config::ConfigError) -> Self {
        VerifierError::Config(e.to_string())
    }
}
