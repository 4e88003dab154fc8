//! LLM-based knowledge triple extraction.
//!
//! Turns one conversation message into zero or more `(subject, predicate,
//! object)` triples:
//!
//! - [`prompt`] builds the ontologist prompt around the message text
//! - [`parse`] recovers triples from whatever the model returned
//! - [`normalize`] and [`vocabulary`] canonicalize labels and predicates
//! - [`validate`] rejects code fragments, paths and numeric noise
//! - [`orchestrator`] drives the retry loop with shrinking input budgets
//! - [`memo`] remembers per-message results across runs

pub mod memo;
pub mod normalize;
pub mod orchestrator;
pub mod parse;
pub mod prompt;
pub mod validate;
pub mod vocabulary;

use serde::{Deserialize, Serialize};

pub use normalize::{normalize_entity, normalize_predicate, normalize_triple};
pub use orchestrator::{ExtractionConfig, ExtractionStats, TripleExtractor, extract_triples};
pub use parse::{MAX_TRIPLES_PER_MESSAGE, parse_triples_response};
pub use validate::{is_linkable_entity, is_valid_entity};
pub use vocabulary::Predicate;

/// A validated, normalized `(subject, predicate, object)` statement.
///
/// Both endpoints have passed [`is_valid_entity`]; constructing one directly
/// with [`KnowledgeTriple::new`] skips that check and is meant for tests and
/// for re-reading memoized results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KnowledgeTriple {
    pub subject: String,
    pub predicate: Predicate,
    pub object: String,
}

impl KnowledgeTriple {
    pub fn new(subject: impl Into<String>, predicate: Predicate, object: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            predicate,
            object: object.into(),
        }
    }
}

impl std::fmt::Display for KnowledgeTriple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.predicate, self.object)
    }
}
