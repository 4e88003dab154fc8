//! Entity linking: label → external knowledge-base identifier.
//!
//! The pipeline for one label is alias normalization, cache lookup, then
//! (on a miss) a [`Resolver`]. Two resolvers are provided:
//!
//! - [`HeuristicResolver`] ranks search hits by label, alias and domain
//!   keywords
//! - [`AgenticResolver`] lets an LLM drive up to three searches and pick
//!   among what it actually saw
//!
//! [`EntityLinker::link_batch`] adds batch-level filtering, parallel
//! resolution of cache misses and a final same-as deduplication pass.

pub mod agentic;
pub mod alias;
pub mod cache;
pub mod dedup;
pub mod error;
pub mod heuristic;
pub mod linker;
pub mod search;

pub use agentic::AgenticResolver;
pub use alias::AliasTable;
pub use cache::{CacheEntry, EntityCache};
pub use dedup::{SameAsEdge, dedup_same_as};
pub use error::{LinkError, SearchError};
pub use heuristic::HeuristicResolver;
pub use linker::{
    EntityLinker, LinkReport, LinkResult, LinkStats, LinkStatus, LinkerConfig, snapshot_report,
};
pub use search::{Candidate, EntitySearch, WikidataClient, WikidataConfig};

/// Context string passed to resolvers when the caller has nothing better.
pub const DEFAULT_CONTEXT: &str = "developer knowledge graph entity";

/// A resolver's pick for one label.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub external_id: String,
    /// Label of the chosen candidate in the external knowledge base.
    pub label: String,
    pub confidence: f64,
    pub description: Option<String>,
    /// Up to five alternative names of the chosen candidate.
    pub aliases: Vec<String>,
    /// Why this candidate was chosen.
    pub rationale: String,
}

/// Outcome of resolving one label. Not finding anything is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Matched(Match),
    NoMatch { reason: String },
}

/// Strategy for resolving a label the cache has never seen.
pub trait Resolver: Send + Sync {
    fn name(&self) -> &str;

    /// Resolve `label`; `context` hints at the domain (e.g. the message topic).
    fn resolve(&self, label: &str, context: &str) -> Result<Resolution, LinkError>;
}
