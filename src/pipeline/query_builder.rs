//! Query formulation: `Decomposition` -> SPARQL text
//!
//! The generated query is forwarded as-is. A malformed query only shows up
//! downstream, as an endpoint error or an empty result set.

use super::models::{Decomposition, QueryDirection};
use super::parsing::strip_fences;
use super::{loggable, Halt, Stage};
use crate::glossary::Glossary;
use crate::metrics::METRICS;
use crate::oracle::Oracle;
use std::sync::Arc;
use tracing::{debug, warn};

/// Few-shot examples included per prompt
const MAX_EXAMPLES: usize = 3;

pub struct QueryBuilder {
    oracle: Arc<dyn Oracle>,
    glossary: Arc<Glossary>,
    redact_claims: bool,
}

impl QueryBuilder {
    pub fn new(oracle: Arc<dyn Oracle>, glossary: Arc<Glossary>) -> Self {
        Self {
            oracle,
            glossary,
            redact_claims: false,
        }
    }

    /// Log only the query length; the query text names the claim's entities
    pub fn with_claim_redaction(mut self, redact: bool) -> Self {
        self.redact_claims = redact;
        self
    }

    pub fn build_prompt(&self, claim: &str, decomposition: &Decomposition) -> String {
        let (anchor, anchor_id) = decomposition.anchor();
        let (target, _) = decomposition.target();

        let property = match decomposition.property_code.as_deref() {
            Some(code) => {
                let label = self.glossary.property_label(code).unwrap_or(&decomposition.property);
                format!("{} (wdt:{})", label, code)
            }
            None => format!("{} (property code unknown, look it up)", decomposition.property),
        };

        let anchor_ref = match anchor_id {
            Some(id) => format!("wd:{}", id),
            None => format!("the Wikidata item for \"{}\" (resolve it by label)", anchor),
        };

        let side = match decomposition.query_direction {
            QueryDirection::Subject => "subject",
            QueryDirection::Object => "object",
        };

        let mut examples = String::new();
        for example in self
            .glossary
            .examples_for(decomposition.property_code.as_deref(), MAX_EXAMPLES)
        {
            examples.push_str(&format!(
                "Claim: \"{}\"\nQuery:\n{}\n\n",
                example.claim,
                example.query.trim()
            ));
        }

        format!(
            r#"Write one SPARQL query for the Wikidata Query Service that checks a claim.

Claim: "{claim}"
Subject: {subject}
Property: {property}
Object: {object}

Query from the {side} side: start at {anchor_ref} and select the values of
{property} together with their labels, so the results can be compared with
"{target}". Use the wd:/wdt: prefixes and the wikibase:label service for
English labels.

Examples:
{examples}Only return the query, with no explanation."#,
            claim = claim,
            subject = decomposition.subject,
            object = decomposition.object,
            property = property,
            side = side,
            anchor_ref = anchor_ref,
            target = target,
            examples = examples,
        )
    }

    /// Ask the oracle for a query. Any text it returns is forwarded.
    pub async fn build(&self, claim: &str, decomposition: &Decomposition) -> Result<String, Halt> {
        let _timer = METRICS.stage_timer(Stage::BuildQuery.as_str());
        let prompt = self.build_prompt(claim, decomposition);

        let raw = self.oracle.complete(&prompt).await.map_err(|error| {
            METRICS.record_oracle(Stage::BuildQuery.as_str(), false);
            Halt::OracleUnavailable {
                stage: Stage::BuildQuery,
                error,
            }
        })?;
        METRICS.record_oracle(Stage::BuildQuery.as_str(), true);

        let query = strip_fences(&raw);
        if query.is_empty() {
            warn!("Query builder produced an empty query");
        }
        debug!(
            query = %loggable(self.redact_claims, &query),
            query_len = query.len(),
            "Query built"
        );

        Ok(query)
    }
}
