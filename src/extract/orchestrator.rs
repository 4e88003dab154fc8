//! The per-message extraction loop.
//!
//! One message in, a list of triples out, never an error. Each attempt sends
//! a slice of the message to the provider; the slice shrinks after a failure
//! and shrinks straight to the smallest budget when the model's answer was
//! cut off, because a shorter input leaves more of the output budget for
//! the answer.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::KnowledgeTriple;
use super::memo::TripleMemo;
use super::parse::parse_response;
use super::prompt::build_extraction_prompt;
use crate::llm::LlmProvider;

/// Limits for one extraction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Input characters sent on the first attempt.
    pub initial_max_chars: usize,
    /// Budget after a generic failure.
    pub retry_max_chars: usize,
    /// Budget after a truncated response could not be parsed.
    pub truncation_max_chars: usize,
    /// Messages whose trimmed text is shorter than this are skipped.
    pub min_text_chars: usize,
    pub max_attempts: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            initial_max_chars: 1500,
            retry_max_chars: 1000,
            truncation_max_chars: 800,
            min_text_chars: 30,
            max_attempts: 3,
        }
    }
}

impl ExtractionConfig {
    fn budgets(&self) -> [usize; 3] {
        [
            self.initial_max_chars,
            self.retry_max_chars,
            self.truncation_max_chars,
        ]
    }
}

/// Run-scoped extraction counters, owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub messages: u64,
    pub skipped: u64,
    pub llm_calls: u64,
    pub provider_errors: u64,
    pub parse_failures: u64,
    pub truncations: u64,
    pub salvage_recoveries: u64,
    pub triples: u64,
    pub memo_hits: u64,
}

impl ExtractionStats {
    /// Zero every counter at a run boundary.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Add another run's counters into this one.
    pub fn merge(&mut self, other: &Self) {
        self.messages += other.messages;
        self.skipped += other.skipped;
        self.llm_calls += other.llm_calls;
        self.provider_errors += other.provider_errors;
        self.parse_failures += other.parse_failures;
        self.truncations += other.truncations;
        self.salvage_recoveries += other.salvage_recoveries;
        self.triples += other.triples;
        self.memo_hits += other.memo_hits;
    }
}

impl std::fmt::Display for ExtractionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} messages ({} skipped, {} memoized), {} LLM calls, {} triples, \
             {} provider errors, {} parse failures, {} truncated, {} salvaged",
            self.messages,
            self.skipped,
            self.memo_hits,
            self.llm_calls,
            self.triples,
            self.provider_errors,
            self.parse_failures,
            self.truncations,
            self.salvage_recoveries,
        )
    }
}

/// Extracts triples from message text with one provider handle.
pub struct TripleExtractor<'p> {
    provider: &'p dyn LlmProvider,
    config: ExtractionConfig,
}

impl<'p> TripleExtractor<'p> {
    pub fn new(provider: &'p dyn LlmProvider) -> Self {
        Self::with_config(provider, ExtractionConfig::default())
    }

    pub fn with_config(provider: &'p dyn LlmProvider, config: ExtractionConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract triples from `text`. Returns an empty list when the text is
    /// too short or every attempt failed.
    pub fn extract(&self, text: &str, stats: &mut ExtractionStats) -> Vec<KnowledgeTriple> {
        stats.messages += 1;
        let triples = self.run_attempts(text, stats).unwrap_or_default();
        stats.triples += triples.len() as u64;
        triples
    }

    /// Like [`extract`](Self::extract), consulting `memo` first.
    ///
    /// Successful extractions (including a genuine empty answer) are
    /// memoized; exhausted retries are not, so a later run tries again.
    /// Memo I/O errors are logged and otherwise ignored.
    pub fn extract_memoized(
        &self,
        memo: &TripleMemo,
        message_id: &str,
        text: &str,
        stats: &mut ExtractionStats,
    ) -> Vec<KnowledgeTriple> {
        stats.messages += 1;

        match memo.lookup(message_id, text) {
            Ok(Some(triples)) => {
                debug!(message_id, count = triples.len(), "memo hit");
                stats.memo_hits += 1;
                stats.triples += triples.len() as u64;
                return triples;
            }
            Ok(None) => {}
            Err(e) => warn!(message_id, error = %e, "triple memo lookup failed"),
        }

        let outcome = self.run_attempts(text, stats);
        let long_enough = text.trim().chars().count() >= self.config.min_text_chars;
        if let (Some(triples), true) = (&outcome, long_enough) {
            if let Err(e) = memo.put(message_id, text, triples) {
                warn!(message_id, error = %e, "failed to memoize triples");
            }
        }

        let triples = outcome.unwrap_or_default();
        stats.triples += triples.len() as u64;
        triples
    }

    /// `Some` on a successful parse (possibly empty), `None` when exhausted.
    fn run_attempts(&self, text: &str, stats: &mut ExtractionStats) -> Option<Vec<KnowledgeTriple>> {
        let trimmed = text.trim();
        if trimmed.chars().count() < self.config.min_text_chars {
            stats.skipped += 1;
            return Some(Vec::new());
        }

        let budgets = self.config.budgets();
        let last = budgets.len() - 1;
        let mut step = 0;

        for attempt in 1..=self.config.max_attempts {
            let budget = budgets[step.min(last)];
            let prompt = build_extraction_prompt(truncate_chars(trimmed, budget));

            stats.llm_calls += 1;
            let response = match self.provider.generate_content(&prompt) {
                Ok(r) => r,
                Err(e) => {
                    stats.provider_errors += 1;
                    warn!(
                        provider = self.provider.name(),
                        attempt,
                        budget,
                        error = %e,
                        "provider call failed"
                    );
                    step += 1;
                    continue;
                }
            };

            let parsed = parse_response(&response.text);
            let truncated = parsed.truncated || response.stopped_at_limit;
            if truncated {
                stats.truncations += 1;
                warn!(attempt, budget, "LLM response truncated");
            }

            match parsed.triples {
                Some(triples) => {
                    if parsed.salvaged > 0 {
                        stats.salvage_recoveries += 1;
                        info!(
                            recovered = triples.len(),
                            attempt, "salvaged triples from truncated response"
                        );
                    } else if truncated {
                        info!(attempt, "parsed truncated response");
                    }
                    debug!(count = triples.len(), attempt, budget, "extracted triples");
                    return Some(triples);
                }
                None => {
                    stats.parse_failures += 1;
                    debug!(attempt, budget, truncated, "unparseable LLM response");
                    step = if truncated { last } else { step + 1 };
                }
            }
        }

        warn!(
            attempts = self.config.max_attempts,
            "giving up on message after repeated failures"
        );
        None
    }
}

/// Extract triples with the default limits.
pub fn extract_triples(
    provider: &dyn LlmProvider,
    text: &str,
    stats: &mut ExtractionStats,
) -> Vec<KnowledgeTriple> {
    TripleExtractor::new(provider).extract(text, stats)
}

/// The first `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
