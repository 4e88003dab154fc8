//! Error types for entity search and linking.
//!
//! Linking absorbs these per label (the label is cached as a miss), so they
//! surface to the user only through logs and `LinkStatus::Failed`.

use miette::Diagnostic;
use thiserror::Error;

use crate::llm::LlmError;

/// Errors from the external knowledge-base search API.
#[derive(Debug, Error, Diagnostic)]
pub enum SearchError {
    #[error("search API is rate limiting requests (HTTP {status})")]
    #[diagnostic(
        code(devkg::search::rate_limited),
        help("Raise linking.search_interval_ms or linking.rate_limit_backoff_secs in devkg.toml.")
    )]
    RateLimited { status: u16 },

    #[error("search request failed: {message}")]
    #[diagnostic(
        code(devkg::search::request),
        help("Check network connectivity to the search endpoint.")
    )]
    Request { message: String },

    #[error("malformed search response: {message}")]
    #[diagnostic(
        code(devkg::search::malformed),
        help("The search API returned JSON without the expected `search` array.")
    )]
    Malformed { message: String },
}

/// Errors from resolving one label.
#[derive(Debug, Error, Diagnostic)]
pub enum LinkError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Llm(#[from] LlmError),

    #[error("linking agent broke protocol: {message}")]
    #[diagnostic(
        code(devkg::link::agent),
        help("The model must reply with one JSON action per turn. Try a stronger model or heuristic mode.")
    )]
    Agent { message: String },

    #[error("failed to build resolver thread pool: {message}")]
    #[diagnostic(
        code(devkg::link::pool),
        help("Lower linking.max_parallel.")
    )]
    Pool { message: String },
}
