//! HTTP client for a SPARQL query service (Wikidata Query Service by default)

use super::{Binding, FetchError, KnowledgeBase, SparqlResponse};
use crate::config::KnowledgeConfig;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use tracing::{debug, error};

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// SPARQL endpoint client
pub struct SparqlClient {
    http: Client,
    config: KnowledgeConfig,
}

impl SparqlClient {
    pub fn new(config: KnowledgeConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FetchError::Initialization(e.to_string()))?;

        Ok(Self { http, config })
    }
}

#[async_trait]
impl KnowledgeBase for SparqlClient {
    async fn select(&self, query: &str) -> Result<Vec<Binding>, FetchError> {
        debug!("Querying {} ({} bytes)", self.config.endpoint, query.len());

        // One GET, query URL-encoded, JSON results requested
        let response = self
            .http
            .get(&self.config.endpoint)
            .query(&[("query", query), ("format", "json")])
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .header(USER_AGENT, &self.config.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("SPARQL endpoint returned {}", status);
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            });
        }

        let body: SparqlResponse = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;

        debug!("SPARQL endpoint returned {} rows", body.results.bindings.len());

        Ok(body.results.bindings)
    }

    fn source_name(&self) -> &str {
        &self.config.source_name
    }
}
