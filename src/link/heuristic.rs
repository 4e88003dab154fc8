//! Rule-based candidate ranking.

use std::sync::Arc;

use super::search::{Candidate, EntitySearch};
use super::{LinkError, Match, Resolution, Resolver};

/// Description words that mark a candidate as a software/tech concept.
pub const TECH_KEYWORDS: &[&str] = &[
    "software",
    "database",
    "framework",
    "library",
    "programming",
    "language",
    "tool",
    "platform",
    "application",
    "system",
    "service",
    "api",
    "protocol",
    "standard",
    "specification",
    "technology",
    "infrastructure",
    "container",
    "orchestration",
];

/// Maximum aliases carried over from the chosen candidate.
const MAX_ALIASES: usize = 5;

/// Why a candidate was picked, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    ExactLabel,
    Alias,
    TechKeyword,
    FirstResult,
}

impl MatchKind {
    pub fn confidence(self) -> f64 {
        match self {
            Self::ExactLabel => 1.0,
            Self::Alias | Self::TechKeyword => 0.8,
            Self::FirstResult => 0.5,
        }
    }
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExactLabel => write!(f, "exact label match"),
            Self::Alias => write!(f, "alias match"),
            Self::TechKeyword => write!(f, "technical description"),
            Self::FirstResult => write!(f, "first search result"),
        }
    }
}

pub fn is_technical(candidate: &Candidate) -> bool {
    let description = candidate.description.to_lowercase();
    TECH_KEYWORDS.iter().any(|kw| description.contains(kw))
}

/// Pick the best candidate for `label`: exact label, then alias, then a
/// technical description, then the first hit.
pub fn select_best_match<'a>(label: &str, candidates: &'a [Candidate]) -> Option<(&'a Candidate, MatchKind)> {
    let wanted = label.trim().to_lowercase();

    if let Some(c) = candidates.iter().find(|c| c.label.to_lowercase() == wanted) {
        return Some((c, MatchKind::ExactLabel));
    }
    if let Some(c) = candidates
        .iter()
        .find(|c| c.aliases.iter().any(|a| a.to_lowercase() == wanted))
    {
        return Some((c, MatchKind::Alias));
    }
    if let Some(c) = candidates.iter().find(|c| is_technical(c)) {
        return Some((c, MatchKind::TechKeyword));
    }
    candidates.first().map(|c| (c, MatchKind::FirstResult))
}

/// Search once, rank the hits, no LLM involved.
pub struct HeuristicResolver {
    search: Arc<dyn EntitySearch>,
}

impl HeuristicResolver {
    pub fn new(search: Arc<dyn EntitySearch>) -> Self {
        Self { search }
    }
}

impl Resolver for HeuristicResolver {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn resolve(&self, label: &str, _context: &str) -> Result<Resolution, LinkError> {
        let candidates = self.search.search(label)?;
        let Some((best, kind)) = select_best_match(label, &candidates) else {
            return Ok(Resolution::NoMatch {
                reason: "no search results".into(),
            });
        };

        let technical: Vec<&str> = candidates
            .iter()
            .filter(|c| is_technical(c))
            .map(|c| c.id.as_str())
            .collect();
        if technical.len() > 1 {
            tracing::warn!(
                label,
                chosen = %best.id,
                candidates = ?technical,
                "ambiguous label: several technical candidates"
            );
        }

        Ok(Resolution::Matched(Match {
            external_id: best.id.clone(),
            label: best.label.clone(),
            confidence: kind.confidence(),
            description: (!best.description.is_empty()).then(|| best.description.clone()),
            aliases: best.aliases.iter().take(MAX_ALIASES).cloned().collect(),
            rationale: kind.to_string(),
        }))
    }
}
