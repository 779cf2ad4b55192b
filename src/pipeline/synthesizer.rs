//! Verdict synthesis from the claim and a bounded slice of evidence

use super::models::{ConfidenceBand, Decomposition, Verdict};
use super::parsing::parse_verdict;
use super::{loggable, Halt, Stage};
use crate::knowledge::Binding;
use crate::metrics::METRICS;
use crate::oracle::Oracle;
use std::sync::Arc;
use tracing::{debug, warn};

/// Evidence rows shown to the oracle
pub const EVIDENCE_LIMIT: usize = 5;

pub struct VerdictSynthesizer {
    oracle: Arc<dyn Oracle>,
    source: String,
    redact_claims: bool,
}

impl VerdictSynthesizer {
    pub fn new(oracle: Arc<dyn Oracle>, source: impl Into<String>) -> Self {
        Self {
            oracle,
            source: source.into(),
            redact_claims: false,
        }
    }

    pub fn with_claim_redaction(mut self, redact: bool) -> Self {
        self.redact_claims = redact;
        self
    }

    fn render_rubric() -> String {
        ConfidenceBand::ALL
            .iter()
            .map(|band| {
                let range = band.range();
                format!("- {}-{} ({}): {}", range.start(), range.end(), band.as_str(), band.description())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn build_prompt(&self, claim: &str, decomposition: &Decomposition, evidence: &[Binding]) -> String {
        let shown = &evidence[..evidence.len().min(EVIDENCE_LIMIT)];
        let evidence_json =
            serde_json::to_string_pretty(shown).unwrap_or_else(|_| "[]".to_string());

        let property = match decomposition.property_code.as_deref() {
            Some(code) => format!("{} ({})", decomposition.property, code),
            None => decomposition.property.clone(),
        };

        format!(
            r#"We received the following {source} response (JSON):

{evidence}

Original claim: "{claim}"
Subject: {subject}
Property: {property}
Object: {object}

Does the data verify the claim? Choose the confidence with this rubric:
{rubric}

If the evidence is ambiguous or only loosely related, be conservative:
answer "unverified" and keep the confidence in the lower bands.

Respond in JSON only, like:
{{
  "status": "verified",
  "confidence": 92,
  "explanation": "One sentence explaining how the data supports or contradicts the claim."
}}
"status" must be "verified" or "unverified"."#,
            source = self.source,
            evidence = evidence_json,
            claim = claim,
            subject = decomposition.subject,
            property = property,
            object = decomposition.object,
            rubric = Self::render_rubric(),
        )
    }

    pub async fn synthesize(
        &self,
        claim: &str,
        decomposition: &Decomposition,
        evidence: &[Binding],
    ) -> Result<Verdict, Halt> {
        let _timer = METRICS.stage_timer(Stage::Synthesize.as_str());
        let prompt = self.build_prompt(claim, decomposition, evidence);

        let raw = self.oracle.complete(&prompt).await.map_err(|error| {
            METRICS.record_oracle(Stage::Synthesize.as_str(), false);
            Halt::OracleUnavailable {
                stage: Stage::Synthesize,
                error,
            }
        })?;
        METRICS.record_oracle(Stage::Synthesize.as_str(), true);

        match parse_verdict(&raw) {
            Ok(verdict) => {
                debug!(
                    status = ?verdict.status,
                    confidence = verdict.confidence,
                    band = ConfidenceBand::classify(verdict.confidence).map(|b| b.as_str()).unwrap_or("none"),
                    "Verdict synthesized"
                );
                Ok(verdict)
            }
            Err(failure) => {
                warn!(
                    "Could not parse verdict: {}",
                    loggable(self.redact_claims, &failure.reason)
                );
                Err(Halt::VerdictUnparseable(failure))
            }
        }
    }
}
