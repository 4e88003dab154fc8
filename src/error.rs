//! Rich diagnostic error types for devkg.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

use crate::link::error::{LinkError, SearchError};
use crate::llm::LlmError;
use crate::paths::PathError;
use crate::pipeline::PipelineError;

/// Top-level error type for devkg.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum DevkgError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pipeline(#[from] PipelineError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(devkg::store::io),
        help(
            "A filesystem operation failed. Check that the cache directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(devkg::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             If another devkg process holds the cache open, use the snapshot \
             mode to inspect it instead. Deleting the cache file is safe: \
             labels are simply resolved again."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(devkg::store::serde),
        help(
            "Failed to serialize or deserialize a cache record. \
             This usually means the stored format changed between versions. \
             Remove the cache file to rebuild it."
        )
    )]
    Serialization { message: String },

    #[error("store is read-only: cannot write \"{key}\"")]
    #[diagnostic(
        code(devkg::store::read_only),
        help(
            "This store was opened as a snapshot for inspection. \
             Open it with `EntityCache::open` to write."
        )
    )]
    ReadOnly { key: String },
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("invalid IRI \"{iri}\": {message}")]
    #[diagnostic(
        code(devkg::graph::iri),
        help("IRIs are built from slugged labels; this usually means an identifier contains characters the slugger kept.")
    )]
    InvalidIri { iri: String, message: String },

    #[error("RDF store error: {message}")]
    #[diagnostic(
        code(devkg::graph::store),
        help("The in-memory oxigraph store rejected an operation.")
    )]
    Store { message: String },

    #[error("failed to serialize graph: {message}")]
    #[diagnostic(
        code(devkg::graph::serialize),
        help("Check that the output path is writable.")
    )]
    Serialize { message: String },

    #[error("failed to load Turtle from {path}: {message}")]
    #[diagnostic(
        code(devkg::graph::load),
        help("The input file must be valid Turtle, as written by `devkg extract`.")
    )]
    Load { path: String, message: String },
}

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(devkg::config::read),
        help("Ensure the config file exists and is readable, or omit --config to use defaults.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(devkg::config::parse),
        help("Check the TOML syntax. Every key is optional; remove unknown keys.")
    )]
    Parse { path: String, message: String },

    #[error("failed to read alias table {path}: {message}")]
    #[diagnostic(
        code(devkg::config::aliases),
        help("The alias file must be a JSON object mapping surface forms to canonical labels.")
    )]
    Aliases { path: String, message: String },

    #[error("unknown provider \"{name}\"")]
    #[diagnostic(
        code(devkg::config::provider),
        help("Supported providers: ollama, openai, anthropic, gemini.")
    )]
    UnknownProvider { name: String },
}

/// Result type for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Convenience alias used by the CLI and library entry points.
pub type DevkgResult<T> = std::result::Result<T, DevkgError>;
