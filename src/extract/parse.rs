//! Parsing raw LLM output into validated knowledge triples.
//!
//! Models return JSON arrays, JSON objects wrapping an array, arrays inside
//! markdown fences with chatty preambles, and (when the output token budget
//! runs out) arrays cut off mid-object. The parser handles all of these and
//! distinguishes "nothing recoverable" (`None`, a retry signal) from "the
//! model found no knowledge" (`Some(vec![])`).

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::KnowledgeTriple;
use super::normalize::normalize_triple;
use super::validate::is_valid_entity;

/// Upper bound on triples kept per message. The prompt asks for the most
/// important relationships first, so the head of the list is kept.
pub const MAX_TRIPLES_PER_MESSAGE: usize = 10;

static RE_JSON_ARRAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\[.*\]").unwrap());

static RE_COMPLETE_TRIPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\{[^{}]*"subject"\s*:\s*"[^"]*"\s*,\s*"predicate"\s*:\s*"[^"]*"\s*,\s*"object"\s*:\s*"[^"]*"[^{}]*\}"#,
    )
    .unwrap()
});

/// Everything the parser learned about one response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    /// `None` when no stage could recover a triple list.
    pub triples: Option<Vec<KnowledgeTriple>>,
    /// The raw text looked cut off mid-JSON.
    pub truncated: bool,
    /// Whole-document parsing failed on a truncated response and salvage ran.
    pub salvage_attempted: bool,
    /// Complete objects recovered by salvage (before validation).
    pub salvaged: usize,
}

/// Detect whether a response was truncated mid-JSON.
///
/// Heuristics: an opening `[` with no `]` at all, more openers than closers
/// for either brackets or braces, or a final character that can only occur
/// inside an unfinished document (`,` `:` `"` `{`).
pub fn is_truncated(raw: &str) -> bool {
    let stripped = raw.trim();
    if stripped.is_empty() {
        return false;
    }

    if stripped.contains('[') && !stripped.contains(']') {
        return true;
    }

    let count = |c: char| stripped.chars().filter(|&x| x == c).count() as i64;
    if count('[') - count(']') > 0 || count('{') - count('}') > 0 {
        return true;
    }

    matches!(stripped.chars().last(), Some(',' | ':' | '"' | '{'))
}

/// Recover every syntactically complete `{"subject", "predicate", "object"}`
/// object appearing in `raw`, parsing each independently.
///
/// Returns `None` when not a single object could be recovered.
pub fn salvage_truncated_json(raw: &str) -> Option<Vec<Value>> {
    let salvaged: Vec<Value> = RE_COMPLETE_TRIPLE
        .find_iter(raw)
        .filter_map(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .collect();

    if salvaged.is_empty() {
        None
    } else {
        Some(salvaged)
    }
}

/// Parse a raw response into at most [`MAX_TRIPLES_PER_MESSAGE`] validated,
/// normalized triples. `None` means full parse failure.
pub fn parse_triples_response(raw: &str) -> Option<Vec<KnowledgeTriple>> {
    parse_response(raw).triples
}

/// Like [`parse_triples_response`], also reporting truncation and salvage.
pub fn parse_response(raw: &str) -> ParsedResponse {
    let mut outcome = ParsedResponse {
        truncated: is_truncated(raw),
        ..Default::default()
    };

    let parsed = match serde_json::from_str::<Value>(raw) {
        Ok(value) => Some(value),
        Err(_) => {
            let from_array = RE_JSON_ARRAY
                .find(raw)
                .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok());

            match from_array {
                Some(value) => Some(value),
                None if outcome.truncated => {
                    outcome.salvage_attempted = true;
                    salvage_truncated_json(raw).map(|objects| {
                        outcome.salvaged = objects.len();
                        Value::Array(objects)
                    })
                }
                None => None,
            }
        }
    };

    outcome.triples = parsed.and_then(candidate_list).map(validate_candidates);
    outcome
}

/// Unwrap the candidate list: a bare array, or the first list-valued field
/// of a wrapper object such as `{"triples": [...]}`.
fn candidate_list(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.into_iter().find_map(|(_, v)| match v {
            Value::Array(items) => Some(items),
            _ => None,
        }),
        _ => None,
    }
}

fn validate_candidates(items: Vec<Value>) -> Vec<KnowledgeTriple> {
    items
        .iter()
        .filter_map(|item| {
            let subject = item.get("subject")?.as_str()?;
            let predicate = item.get("predicate")?.as_str()?;
            let object = item.get("object")?.as_str()?;
            Some(normalize_triple(subject, predicate, object))
        })
        .filter(|t| is_valid_entity(&t.subject) && is_valid_entity(&t.object))
        .take(MAX_TRIPLES_PER_MESSAGE)
        .collect()
}
