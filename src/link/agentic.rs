//! LLM-driven entity linking.
//!
//! The model works a small tool loop: each turn it replies with one JSON
//! action, either `{"action": "search", "query": ...}` or
//! `{"action": "answer", "id": ..., "confidence": ..., "rationale": ...}`.
//! Search observations are appended to the transcript for the next turn.
//! An answer naming an identifier that never appeared in an observation is
//! treated as fabricated and discarded.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;

use super::search::{Candidate, EntitySearch};
use super::{LinkError, Match, Resolution, Resolver};
use crate::llm::LlmProvider;

/// Default ceiling on search calls per label.
pub const MAX_SEARCHES: usize = 3;

const MAX_ALIASES: usize = 5;

const INSTRUCTIONS: &str = r#"You are a Wikidata entity linking agent for a developer knowledge graph.
You receive a technical entity name and the context where it appeared.

Your goal: find the correct Wikidata identifier (QID) for this entity.

Steps:
1. Search Wikidata with the entity name.
2. Examine the results. Prefer entries whose description mentions software, programming,
   framework, database, protocol, library, tool, or technology.
3. If no good match is found, reason about what the entity means in the given context,
   then search again with alternative or expanded terms. Examples:
   - "apis" -> try "application programming interface"
   - "k8s" -> try "kubernetes"
   - "js" -> try "javascript"
   - "backend" -> try "back end" or "backend development"
   - "agent" -> try "software agent" or "intelligent agent"
4. You may search at most {max_searches} times in total.
5. CRITICAL: Only answer with a QID that appeared in your search results. Never guess a QID from memory.
6. CRITICAL: The answered QID's label must semantically match the input entity. If the best
   result is about something unrelated, answer with "id": null.

Reply with exactly one JSON object per turn, nothing else:
  {"action": "search", "query": "<search terms>"}
  {"action": "answer", "id": "<QID or null>", "confidence": <0.0-1.0>, "rationale": "<one sentence>"}
Confidence: 0.9-1.0 exact match, 0.7-0.8 good match, 0.5-0.6 weak match, below 0.5 no match."#;

static RE_JSON_OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum AgentAction {
    Search {
        query: String,
    },
    Answer {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        confidence: f64,
        #[serde(default)]
        rationale: String,
    },
}

fn parse_action(raw: &str) -> Result<AgentAction, LinkError> {
    let direct = serde_json::from_str::<AgentAction>(raw.trim());
    direct
        .or_else(|e| {
            RE_JSON_OBJECT
                .find(raw)
                .ok_or(e)
                .and_then(|m| serde_json::from_str::<AgentAction>(m.as_str()))
        })
        .map_err(|e| LinkError::Agent {
            message: format!("unparseable action ({e}): {}", raw.chars().take(200).collect::<String>()),
        })
}

/// Entity resolver that lets an LLM drive the search.
pub struct AgenticResolver {
    llm: Arc<dyn LlmProvider>,
    search: Arc<dyn EntitySearch>,
    max_searches: usize,
}

impl AgenticResolver {
    pub fn new(llm: Arc<dyn LlmProvider>, search: Arc<dyn EntitySearch>) -> Self {
        Self {
            llm,
            search,
            max_searches: MAX_SEARCHES,
        }
    }

    pub fn with_max_searches(mut self, max_searches: usize) -> Self {
        self.max_searches = max_searches;
        self
    }

    fn prompt(&self, label: &str, context: &str, transcript: &str) -> String {
        let mut prompt = INSTRUCTIONS.replace("{max_searches}", &self.max_searches.to_string());
        let _ = write!(prompt, "\n\nEntity: {label}\nContext: {context}\n");
        if !transcript.is_empty() {
            prompt.push_str("\nSo far:\n");
            prompt.push_str(transcript);
        }
        prompt.push_str("\nNext action:");
        prompt
    }
}

fn describe_observation(query: &str, hits: &[Candidate]) -> String {
    let mut out = format!("search \"{query}\" returned {} result(s)\n", hits.len());
    for c in hits {
        let _ = writeln!(out, "  - {}: {} ({})", c.id, c.label, c.description);
    }
    out
}

impl Resolver for AgenticResolver {
    fn name(&self) -> &str {
        "agentic"
    }

    fn resolve(&self, label: &str, context: &str) -> Result<Resolution, LinkError> {
        let mut seen: HashMap<String, Candidate> = HashMap::new();
        let mut transcript = String::new();
        let mut searches = 0;
        // One answer turn beyond the search budget, plus one nudge.
        let max_turns = self.max_searches + 2;

        for turn in 1..=max_turns {
            let reply = self
                .llm
                .generate_content(&self.prompt(label, context, &transcript))?;

            match parse_action(&reply.text)? {
                AgentAction::Search { query } if searches < self.max_searches => {
                    searches += 1;
                    tracing::debug!(label, turn, query = %query, "agent search");
                    match self.search.search(&query) {
                        Ok(hits) => {
                            transcript.push_str(&describe_observation(&query, &hits));
                            for hit in hits {
                                seen.entry(hit.id.clone()).or_insert(hit);
                            }
                        }
                        Err(e) => {
                            let _ = writeln!(transcript, "search \"{query}\" failed: {e}");
                        }
                    }
                }
                AgentAction::Search { .. } => {
                    transcript.push_str("search budget exhausted; answer now\n");
                }
                AgentAction::Answer {
                    id,
                    confidence,
                    rationale,
                } => {
                    let id = id
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("none"));
                    let Some(id) = id else {
                        return Ok(Resolution::NoMatch {
                            reason: if rationale.is_empty() {
                                "agent found no match".into()
                            } else {
                                rationale
                            },
                        });
                    };
                    let Some(candidate) = seen.get(&id) else {
                        tracing::warn!(label, id = %id, "agent answered an unobserved identifier");
                        return Ok(Resolution::NoMatch {
                            reason: format!("{id} never appeared in search results"),
                        });
                    };
                    return Ok(Resolution::Matched(Match {
                        external_id: id,
                        label: candidate.label.clone(),
                        confidence: confidence.clamp(0.0, 1.0),
                        description: (!candidate.description.is_empty())
                            .then(|| candidate.description.clone()),
                        aliases: candidate.aliases.iter().take(MAX_ALIASES).cloned().collect(),
                        rationale,
                    }));
                }
            }
        }

        Err(LinkError::Agent {
            message: format!("no answer after {max_turns} turns"),
        })
    }
}
