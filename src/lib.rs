// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # devkg
//!
//! Turns developer conversation logs into an RDF knowledge graph: an LLM
//! extracts `(subject, predicate, object)` facts from each message, a rule
//! cascade throws away the noise, and surviving entities are linked to
//! Wikidata.
//!
//! ## Architecture
//!
//! - **Extraction** (`extract`): prompt, response parser with truncation
//!   salvage, predicate vocabulary, entity validator, retry loop, memo
//! - **LLM providers** (`llm`): Ollama, OpenAI, Anthropic, Gemini behind one trait
//! - **Entity linking** (`link`): alias table, redb-backed cache, heuristic
//!   and agentic resolvers, same-as deduplication
//! - **RDF sink** (`graph`): oxigraph store with devkg node layout and Turtle I/O
//! - **Pipeline** (`pipeline`): ordered per-session processing, parallel across sessions
//! - **Storage** (`store`): DashMap hot tier over redb tables
//!
//! ## Library usage
//!
//! ```no_run
//! use devkg::extract::{ExtractionStats, TripleExtractor};
//! use devkg::llm::{ProviderConfig, ProviderKind, build_provider};
//!
//! let env = std::env::vars().collect();
//! let config = ProviderConfig::from_env(ProviderKind::detect(&env), &env);
//! let provider = build_provider(&config).unwrap();
//!
//! let mut stats = ExtractionStats::default();
//! let triples = TripleExtractor::new(&provider)
//!     .extract("Neo4j stores graph data as nodes and relationships.", &mut stats);
//! for t in &triples {
//!     println!("{t}");
//! }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod graph;
pub mod link;
pub mod llm;
pub mod paths;
pub mod pipeline;
pub mod store;
