//! Evidence retrieval against the knowledge endpoint

use super::{Halt, Stage};
use crate::knowledge::{Binding, KnowledgeBase};
use crate::metrics::METRICS;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct EvidenceFetcher {
    knowledge: Arc<dyn KnowledgeBase>,
    redact_claims: bool,
}

impl EvidenceFetcher {
    pub fn new(knowledge: Arc<dyn KnowledgeBase>) -> Self {
        Self {
            knowledge,
            redact_claims: false,
        }
    }

    /// Endpoint error bodies and request URLs echo the query, so only the
    /// error kind is logged
    pub fn with_claim_redaction(mut self, redact: bool) -> Self {
        self.redact_claims = redact;
        self
    }

    /// Run the query once.
    ///
    /// Transport failures and empty result sets both end the run, with
    /// different confidence.
    pub async fn fetch(&self, query: &str) -> Result<Vec<Binding>, Halt> {
        let _timer = METRICS.stage_timer(Stage::FetchEvidence.as_str());

        let rows = match self.knowledge.select(query).await {
            Ok(rows) => rows,
            Err(e) => {
                METRICS.record_knowledge(None);
                if self.redact_claims {
                    warn!(kind = e.kind(), "Knowledge endpoint query failed");
                } else {
                    warn!("Knowledge endpoint query failed: {}", e);
                }
                return Err(Halt::FetchFailed(e));
            }
        };
        METRICS.record_knowledge(Some(rows.len()));

        if rows.is_empty() {
            debug!("Knowledge endpoint returned no rows");
            return Err(Halt::NoEvidence);
        }

        debug!("Fetched {} evidence rows", rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::FetchError;
    use crate::pipeline::test_support::{label_row, StaticKnowledge};

    #[tokio::test]
    async fn test_rows_pass_through() {
        let knowledge = Arc::new(StaticKnowledge::new(Ok(vec![
            label_row("capitalLabel", "Tokyo"),
            label_row("capitalLabel", "Kyoto"),
        ])));
        let fetcher = EvidenceFetcher::new(knowledge.clone());

        let rows = fetcher.fetch("SELECT ...").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(knowledge.queries(), vec!["SELECT ...".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_result_halts() {
        let fetcher = EvidenceFetcher::new(Arc::new(StaticKnowledge::new(Ok(vec![]))));
        let halt = fetcher.fetch("SELECT ...").await.unwrap_err();
        assert!(matches!(halt, Halt::NoEvidence));
    }

    #[tokio::test]
    async fn test_transport_failure_halts() {
        let fetcher = EvidenceFetcher::new(Arc::new(StaticKnowledge::new(Err(
            FetchError::Status {
                status: 500,
                body: "Internal Server Error".to_string(),
            },
        ))));

        let halt = fetcher.fetch("SELECT ...").await.unwrap_err();
        assert!(matches!(halt, Halt::FetchFailed(FetchError::Status { status: 500, .. })));
    }
}
