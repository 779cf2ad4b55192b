//! Claim Verifier
//!
//! Checks short factual claims against Wikidata. A language model breaks the
//! claim into subject, property and object, writes a SPARQL query, and judges
//! the returned rows.

pub mod api;
pub mod config;
pub mod error;
pub mod glossary;
pub mod knowledge;
pub mod logging;
pub mod metrics;
pub mod oracle;
pub mod pipeline;

pub use config::VerifierConfig;
pub use error::{Result, VerifierError};
pub use glossary::Glossary;
pub use knowledge::{Binding, FetchError, KnowledgeBase, SparqlClient};
pub use oracle::{Oracle, OracleError};
pub use pipeline::{Halt, Stage, VerificationResult, Verifier};
