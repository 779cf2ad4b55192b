//! Claim extraction: free text -> `Decomposition`

use super::models::Decomposition;
use super::parsing::parse_decomposition;
use super::{loggable, Halt, Stage};
use crate::glossary::Glossary;
use crate::metrics::METRICS;
use crate::oracle::Oracle;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ClaimExtractor {
    oracle: Arc<dyn Oracle>,
    glossary: Arc<Glossary>,
    redact_claims: bool,
}

impl ClaimExtractor {
    pub fn new(oracle: Arc<dyn Oracle>, glossary: Arc<Glossary>) -> Self {
        Self {
            oracle,
            glossary,
            redact_claims: false,
        }
    }

    /// Keep claim parts out of the logs
    pub fn with_claim_redaction(mut self, redact: bool) -> Self {
        self.redact_claims = redact;
        self
    }

    /// Prompt embedding the claim, the glossary and the direction rules
    pub fn build_prompt(&self, claim: &str) -> String {
        format!(
            r#"You decompose factual claims so they can be checked against Wikidata.

Claim: "{claim}"

Break the claim into subject, property and object. Use the reference below to
fill in Wikidata identifiers when you are confident of them; use null
otherwise.

{reference}
Direction rules (glossary {version}):
{guidance}

"queryDirection" names the side whose property should be queried: "subject"
to read the subject's property values, "object" to read the object's.

Respond with a single JSON object describing the claim and nothing else:
{{
  "subject": "Tokyo",
  "property": "capital of",
  "object": "Japan",
  "queryDirection": "object",
  "reasoning": "The capital is recorded on the country, so query Japan's P36.",
  "propertyCode": "P36",
  "subjectEntityId": "Q1490",
  "objectEntityId": "Q17"
}}"#,
            claim = claim,
            reference = self.glossary.render_reference(),
            version = self.glossary.version,
            guidance = self.glossary.render_guidance(),
        )
    }

    /// Ask the oracle for a decomposition and validate it
    pub async fn extract(&self, claim: &str) -> Result<Decomposition, Halt> {
        let _timer = METRICS.stage_timer(Stage::Extract.as_str());
        let prompt = self.build_prompt(claim);

        let raw = self.oracle.complete(&prompt).await.map_err(|error| {
            METRICS.record_oracle(Stage::Extract.as_str(), false);
            Halt::OracleUnavailable {
                stage: Stage::Extract,
                error,
            }
        })?;
        METRICS.record_oracle(Stage::Extract.as_str(), true);

        match parse_decomposition(&raw) {
            Ok(decomposition) => {
                debug!(
                    subject = %loggable(self.redact_claims, &decomposition.subject),
                    property = %loggable(self.redact_claims, &decomposition.property),
                    object = %loggable(self.redact_claims, &decomposition.object),
                    direction = decomposition.query_direction.as_str(),
                    property_code = ?decomposition.property_code,
                    "Claim decomposed"
                );
                Ok(decomposition)
            }
            Err(failure) => {
                warn!(
                    "Could not parse claim decomposition: {}",
                    loggable(self.redact_claims, &failure.reason)
                );
                Err(Halt::ClaimUnparseable(failure))
            }
        }
    }
}
