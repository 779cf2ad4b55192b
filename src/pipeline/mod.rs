//! Claim verification pipeline
//!
//! Four stages run strictly in order:
//! - `ClaimExtractor`: claim text -> `Decomposition`
//! - `QueryBuilder`: decomposition -> SPARQL query
//! - `EvidenceFetcher`: query -> binding rows
//! - `VerdictSynthesizer`: claim + rows -> `Verdict`
//!
//! Each stage returns `Result<_, Halt>`. A `Halt` ends the run early and is
//! converted into a negative `VerificationResult`, so `Verifier::verify`
//! always returns a complete result.

pub mod evidence;
pub mod extractor;
pub mod models;
pub mod parsing;
pub mod query_builder;
pub mod synthesizer;

pub use evidence::EvidenceFetcher;
pub use extractor::ClaimExtractor;
pub use models::{
    ConfidenceBand, Decomposition, QueryDirection, Verdict, VerdictStatus, VerificationResult,
};
pub use parsing::{parse_decomposition, parse_verdict, strip_fences, ParseFailure};
pub use query_builder::QueryBuilder;
pub use synthesizer::{VerdictSynthesizer, EVIDENCE_LIMIT};

use crate::config::VerifierConfig;
use crate::error::Result;
use crate::glossary::Glossary;
use crate::knowledge::{FetchError, KnowledgeBase, SparqlClient};
use crate::metrics::METRICS;
use crate::oracle::{self, Oracle, OracleError};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

/// Confidence reported when the endpoint answered with no rows
pub const NO_EVIDENCE_CONFIDENCE: u8 = 15;

/// Pipeline stage, used in logs, metrics and halt explanations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    BuildQuery,
    FetchEvidence,
    Synthesize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::BuildQuery => "build_query",
            Stage::FetchEvidence => "fetch_evidence",
            Stage::Synthesize => "synthesize",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Stage::Extract => "claim extraction",
            Stage::BuildQuery => "query generation",
            Stage::FetchEvidence => "evidence retrieval",
            Stage::Synthesize => "verdict synthesis",
        }
    }
}

/// Why a run stopped before producing a verdict
#[derive(Debug, thiserror::Error)]
pub enum Halt {
    #[error("oracle unavailable during {stage:?}: {error}")]
    OracleUnavailable { stage: Stage, error: OracleError },

    #[error("claim structure unparseable: {0}")]
    ClaimUnparseable(ParseFailure),

    #[error("knowledge endpoint fetch failed: {0}")]
    FetchFailed(FetchError),

    #[error("no evidence rows returned")]
    NoEvidence,

    #[error("verdict unparseable: {0}")]
    VerdictUnparseable(ParseFailure),
}

impl Halt {
    pub fn confidence(&self) -> u8 {
        match self {
            Halt::NoEvidence => NO_EVIDENCE_CONFIDENCE,
            _ => 0,
        }
    }

    /// User-facing explanation; internal error detail stays in the logs
    pub fn explanation(&self) -> String {
        match self {
            Halt::OracleUnavailable { stage, .. } => format!(
                "The language model could not be reached during {}.",
                stage.describe()
            ),
            Halt::ClaimUnparseable(_) => "Could not parse claim structure.".to_string(),
            Halt::FetchFailed(_) => "Could not fetch data from the knowledge base.".to_string(),
            Halt::NoEvidence => {
                "No supporting evidence was found in the knowledge base for this claim.".to_string()
            }
            Halt::VerdictUnparseable(_) => {
                "Could not parse the verdict synthesis response.".to_string()
            }
        }
    }

    /// Metrics label
    pub fn outcome(&self) -> &'static str {
        match self {
            Halt::OracleUnavailable { .. } => "oracle_unavailable",
            Halt::ClaimUnparseable(_) => "claim_unparseable",
            Halt::FetchFailed(_) => "fetch_failed",
            Halt::NoEvidence => "no_evidence",
            Halt::VerdictUnparseable(_) => "verdict_unparseable",
        }
    }

    pub fn into_result(self, source: &str) -> VerificationResult {
        VerificationResult::unverified(self.confidence(), self.explanation(), source)
    }
}

/// End-to-end claim verifier.
///
/// Holds only shared, immutable collaborators; every call to `verify` owns
/// its intermediate values, so one `Verifier` can serve concurrent calls.
pub struct Verifier {
    extractor: ClaimExtractor,
    query_builder: QueryBuilder,
    fetcher: EvidenceFetcher,
    synthesizer: VerdictSynthesizer,
    source: String,
    redact_claims: bool,
}

impl Verifier {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        knowledge: Arc<dyn KnowledgeBase>,
        glossary: Arc<Glossary>,
    ) -> Self {
        let source = knowledge.source_name().to_string();

        Self {
            extractor: ClaimExtractor::new(oracle.clone(), glossary.clone()),
            query_builder: QueryBuilder::new(oracle.clone(), glossary),
            fetcher: EvidenceFetcher::new(knowledge),
            synthesizer: VerdictSynthesizer::new(oracle, source.clone()),
            source,
            redact_claims: false,
        }
    }

    /// Log claim fingerprints instead of claim text, in every stage
    pub fn with_claim_redaction(mut self, redact: bool) -> Self {
        self.extractor = self.extractor.with_claim_redaction(redact);
        self.query_builder = self.query_builder.with_claim_redaction(redact);
        self.fetcher = self.fetcher.with_claim_redaction(redact);
        self.synthesizer = self.synthesizer.with_claim_redaction(redact);
        self.redact_claims = redact;
        self
    }

    /// Build the oracle, SPARQL client and glossary described by `config`
    pub fn from_config(config: &VerifierConfig) -> Result<Self> {
        let oracle = oracle::from_config(&config.oracle)?;
        let knowledge: Arc<dyn KnowledgeBase> =
            Arc::new(SparqlClient::new(config.knowledge.clone())?);
        let glossary = Arc::new(Glossary::load(config.glossary_path.as_deref())?);

        info!(
            model = oracle.model_name(),
            endpoint = %config.knowledge.endpoint,
            glossary = %glossary.version,
            "Verifier initialized"
        );

        Ok(Self::new(oracle, knowledge, glossary).with_claim_redaction(config.logging.redact_claims))
    }

    /// Name of the knowledge endpoint reported on every result
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Verify a claim. Never fails: every halt becomes a negative result.
    pub async fn verify(&self, claim: &str) -> VerificationResult {
        let run_id = uuid::Uuid::new_v4();
        let span = info_span!("verify", %run_id, claim = %self.claim_label(claim));

        async {
            match self.run(claim).await {
                Ok(result) => {
                    let outcome = if result.verified { "verified" } else { "unverified" };
                    METRICS.record_outcome(outcome);
                    info!(outcome, confidence = result.confidence, "Verification complete");
                    result
                }
                Err(halt) => {
                    METRICS.record_outcome(halt.outcome());
                    if self.redact_claims {
                        info!(outcome = halt.outcome(), "Verification halted");
                    } else {
                        info!(outcome = halt.outcome(), reason = %halt, "Verification halted");
                    }
                    halt.into_result(&self.source)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, claim: &str) -> std::result::Result<VerificationResult, Halt> {
        let decomposition = self.extractor.extract(claim).await?;
        let query = self.query_builder.build(claim, &decomposition).await?;
        let evidence = self.fetcher.fetch(&query).await?;
        let verdict = self
            .synthesizer
            .synthesize(claim, &decomposition, &evidence)
            .await?;

        Ok(VerificationResult::from_verdict(verdict, &self.source))
    }

    fn claim_label(&self, claim: &str) -> String {
        if self.redact_claims {
            claim_fingerprint(claim)
        } else {
            claim.chars().take(120).collect()
        }
    }
}

/// Text for a log field: as is, or only its length when redacting
pub(crate) fn loggable(redact: bool, text: &str) -> String {
    if redact {
        format!("[redacted, {} chars]", text.chars().count())
    } else {
        text.to_string()
    }
}

/// Short SHA-256 fingerprint used in place of claim text in logs
pub fn claim_fingerprint(claim: &str) -> String {
    let digest = Sha256::digest(claim.trim().as_bytes());
    format!("sha256:{}", &hex::encode(digest)[..16])
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    const TOKYO_DECOMPOSITION: &str = r#"```json
{"subject":"Tokyo","property":"capital of","object":"Japan","queryDirection":"object","propertyCode":"P36","subjectEntityId":"Q1490","objectEntityId":"Q17"}
```"#;

    const TOKYO_QUERY: &str = "```sparql\nSELECT ?capital ?capitalLabel WHERE { wd:Q17 wdt:P36 ?capital . SERVICE wikibase:label { bd:serviceParam wikibase:language \"en\". } }\n```";

    fn verifier(oracle: Arc<ScriptedOracle>, knowledge: Arc<StaticKnowledge>) -> Verifier {
        Verifier::new(oracle, knowledge, Arc::new(Glossary::builtin().unwrap()))
    }

    #[tokio::test]
    async fn test_tokyo_verified() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Ok(TOKYO_DECOMPOSITION.to_string()),
            Ok(TOKYO_QUERY.to_string()),
            Ok(r#"{"status":"verified","confidence":93,"explanation":"Wikidata records Tokyo as the capital of Japan."}"#.to_string()),
        ]));
        let knowledge = Arc::new(StaticKnowledge::new(Ok(vec![label_row("capitalLabel", "Tokyo")])));

        let result = verifier(oracle.clone(), knowledge.clone())
            .verify("Tokyo is the capital of Japan")
            .await;

        assert!(result.verified);
        assert!((80..=95).contains(&result.confidence));
        assert_eq!(result.source, "Wikidata");
        assert!(knowledge.queries()[0].starts_with("SELECT ?capital"));
        assert!(oracle.prompts()[2].contains("\"value\": \"Tokyo\""));
    }

    #[tokio::test]
    async fn test_unparseable_claim_stops_before_query() {
        let oracle = Arc::new(ScriptedOracle::new(vec![Ok(
            "I think this claim is about geography.".to_string(),
        )]));
        let knowledge = Arc::new(StaticKnowledge::new(Ok(vec![label_row("x", "y")])));

        let result = verifier(oracle.clone(), knowledge.clone())
            .verify("Tokyo is the capital of Japan")
            .await;

        assert!(!result.verified);
        assert_eq!(result.confidence, 0);
        assert_eq!(result.explanation, "Could not parse claim structure.");
        assert_eq!(oracle.prompts().len(), 1);
        assert!(knowledge.queries().is_empty());
    }

    #[tokio::test]
    async fn test_empty_evidence_is_weak_negative() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Ok(TOKYO_DECOMPOSITION.to_string()),
            Ok(TOKYO_QUERY.to_string()),
        ]));
        let knowledge = Arc::new(StaticKnowledge::new(Ok(vec![])));

        let result = verifier(oracle.clone(), knowledge)
            .verify("Osaka is the capital of Japan")
            .await;

        assert!(!result.verified);
        assert_eq!(result.confidence, NO_EVIDENCE_CONFIDENCE);
        assert_eq!(oracle.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_synthesis() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Ok(TOKYO_DECOMPOSITION.to_string()),
            Ok(TOKYO_QUERY.to_string()),
            Ok(r#"{"status":"verified","confidence":90,"explanation":"x"}"#.to_string()),
        ]));
        let knowledge = Arc::new(StaticKnowledge::new(Err(FetchError::Timeout(
            "20s".to_string(),
        ))));

        let result = verifier(oracle.clone(), knowledge)
            .verify("Tokyo is the capital of Japan")
            .await;

        assert!(!result.verified);
        assert_eq!(result.confidence, 0);
        assert_eq!(result.explanation, "Could not fetch data from the knowledge base.");
        assert_eq!(oracle.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_unparseable_verdict() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Ok(TOKYO_DECOMPOSITION.to_string()),
            Ok(TOKYO_QUERY.to_string()),
            Ok("The evidence supports the claim.".to_string()),
        ]));
        let knowledge = Arc::new(StaticKnowledge::new(Ok(vec![label_row("capitalLabel", "Tokyo")])));

        let result = verifier(oracle, knowledge).verify("Tokyo is the capital of Japan").await;

        assert!(!result.verified);
        assert_eq!(result.confidence, 0);
        assert!(result.explanation.contains("verdict synthesis"));
    }

    #[tokio::test]
    async fn test_oracle_down_during_query_generation() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Ok(TOKYO_DECOMPOSITION.to_string()),
            Err(OracleError::Network("connection reset".to_string())),
        ]));
        let knowledge = Arc::new(StaticKnowledge::new(Ok(vec![label_row("x", "y")])));

        let result = verifier(oracle, knowledge.clone())
            .verify("Tokyo is the capital of Japan")
            .await;

        assert!(!result.verified);
        assert_eq!(result.confidence, 0);
        assert!(result.explanation.contains("query generation"));
        assert!(knowledge.queries().is_empty());
    }

    #[test]
    fn test_every_halt_is_well_formed() {
        let halts = vec![
            Halt::OracleUnavailable {
                stage: Stage::Synthesize,
                error: OracleError::EmptyResponse,
            },
            Halt::ClaimUnparseable(ParseFailure::new("x")),
            Halt::FetchFailed(FetchError::Request("x".to_string())),
            Halt::NoEvidence,
            Halt::VerdictUnparseable(ParseFailure::new("x")),
        ];

        for halt in halts {
            let result = halt.into_result("Wikidata");
            assert!(!result.verified);
            assert!(result.confidence <= 100);
            assert!(!result.explanation.is_empty());
            assert_eq!(result.source, "Wikidata");
        }
    }

    const PRIVATE_CLAIM: &str = "Marie Secretname was diagnosed with Rarecondition";

    /// Log sink shared between the subscriber and the test
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    async fn logs_for_private_claim(redact: bool) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let oracle = Arc::new(ScriptedOracle::new(vec![
            Ok(r#"{"subject":"Marie Secretname","property":"diagnosed with","object":"Rarecondition","queryDirection":"subject","objectEntityId":"Rarecondition"}"#.to_string()),
            Ok(r#"SELECT ?c WHERE { ?p rdfs:label "Marie Secretname"@en . ?p wdt:P1050 ?c . }"#.to_string()),
        ]));
        let knowledge = Arc::new(StaticKnowledge::new(Err(FetchError::Status {
            status: 400,
            body: "MalformedQueryException near \"Marie Secretname\"".to_string(),
        })));

        let result = verifier(oracle, knowledge)
            .with_claim_redaction(redact)
            .verify(PRIVATE_CLAIM)
            .await;
        assert_eq!(result.confidence, 0);

        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn test_redaction_keeps_claim_text_out_of_logs() {
        let logs = logs_for_private_claim(true).await;

        assert!(logs.contains("Query built"));
        assert!(logs.contains(&claim_fingerprint(PRIVATE_CLAIM)));
        assert!(!logs.contains("Secretname"), "claim text leaked: {}", logs);
        assert!(!logs.contains("Rarecondition"), "claim text leaked: {}", logs);
        assert!(!logs.contains("diagnosed"), "claim text leaked: {}", logs);
    }

    #[tokio::test]
    async fn test_claim_text_logged_without_redaction() {
        let logs = logs_for_private_claim(false).await;

        assert!(logs.contains("Marie Secretname"));
        assert!(!logs.contains(&claim_fingerprint(PRIVATE_CLAIM)));
    }

    #[test]
    fn test_claim_fingerprint() {
        let a = claim_fingerprint("Tokyo is the capital of Japan");
        let b = claim_fingerprint("  Tokyo is the capital of Japan ");
        assert_eq!(a, b);
        assert!(a.starts_with("sha256:"));
        assert_eq!(a.len(), "sha256:".len() + 16);
    }
}
