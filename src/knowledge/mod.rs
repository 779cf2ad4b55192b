//! Structured knowledge endpoint
//!
//! Queries are SPARQL strings; results come back as ordered binding rows
//! that the pipeline treats as opaque evidence.

pub mod sparql;

pub use sparql::SparqlClient;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Deserialize;

/// One result row: variable name -> RDF term, in endpoint order
pub type Binding = IndexMap<String, serde_json::Value>;

/// Knowledge endpoint that answers SELECT queries
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Run a query and return every binding row
    async fn select(&self, query: &str) -> Result<Vec<Binding>, FetchError>;

    /// Name reported as the `source` of every verification result
    fn source_name(&self) -> &str;
}

/// Knowledge endpoint errors
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// Short label without upstream detail
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Initialization(_) => "initialization",
            FetchError::Request(_) => "request",
            FetchError::Timeout(_) => "timeout",
            FetchError::Status { .. } => "status",
            FetchError::InvalidResponse(_) => "invalid_response",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e.to_string())
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

/// SPARQL 1.1 JSON results document
#[derive(Debug, Deserialize)]
pub struct SparqlResponse {
    pub results: SparqlResults,
}

#[derive(Debug, Deserialize)]
pub struct SparqlResults {
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindings_keep_variable_order() {
        let raw = r#"{
            "head": {"vars": ["capital", "capitalLabel"]},
            "results": {"bindings": [
                {"capitalLabel": {"type": "literal", "value": "Tokyo"},
                 "capital": {"type": "uri", "value": "http://www.wikidata.org/entity/Q1490"}}
            ]}
        }"#;

        let response: SparqlResponse = serde_json::from_str(raw).unwrap();
        let row = &response.results.bindings[0];
        let vars: Vec<&str> = row.keys().map(|k| k.as_str()).collect();

        assert_eq!(vars, vec!["capitalLabel", "capital"]);
        assert_eq!(row["capitalLabel"]["value"], "Tokyo");
    }

    #[test]
    fn test_missing_results_is_an_error() {
        let raw = r#"{"head": {"vars": []}}"#;
        assert!(serde_json::from_str::<SparqlResponse>(raw).is_err());
    }
}
