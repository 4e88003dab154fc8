//! Canonicalization of triple endpoints and predicates.

use super::KnowledgeTriple;
use super::vocabulary::Predicate;

/// Lowercase, trim, collapse internal whitespace and strip trailing `.,;:`.
pub fn normalize_entity(name: &str) -> String {
    let collapsed = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':') || c.is_whitespace())
        .to_string()
}

/// Map a free-text predicate onto the closed vocabulary.
///
/// Tries, in order: exact match; snake_case / space / hyphen separated words
/// joined as camelCase; case-insensitive match. Anything else becomes
/// [`Predicate::RelatedTo`]. Total: never fails, never leaves the vocabulary.
pub fn normalize_predicate(raw: &str) -> Predicate {
    let pred = raw.trim();

    if let Some(p) = Predicate::from_name(pred) {
        return p;
    }

    let lower = pred.to_lowercase();
    let parts: Vec<&str> = lower
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    if parts.len() > 1 {
        let mut camel = parts[0].to_string();
        for part in &parts[1..] {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                camel.extend(first.to_uppercase());
                camel.push_str(chars.as_str());
            }
        }
        if let Some(p) = Predicate::from_name(&camel) {
            return p;
        }
    }

    Predicate::from_name_ignore_case(pred).unwrap_or(Predicate::FALLBACK)
}

/// Normalize all three parts of a raw triple.
pub fn normalize_triple(subject: &str, predicate: &str, object: &str) -> KnowledgeTriple {
    KnowledgeTriple {
        subject: normalize_entity(subject),
        predicate: normalize_predicate(predicate),
        object: normalize_entity(object),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_lowercase_and_trim() {
        assert_eq!(normalize_entity("Neo4j"), "neo4j");
        assert_eq!(normalize_entity("  python  "), "python");
        assert_eq!(normalize_entity("graph   database"), "graph database");
        assert_eq!(normalize_entity("  Graph \t Database.  "), "graph database");
    }

    #[test]
    fn entity_strips_trailing_punctuation() {
        for raw in ["neo4j.", "neo4j,", "neo4j;", "neo4j:", "neo4j.;"] {
            assert_eq!(normalize_entity(raw), "neo4j", "{raw}");
        }
    }

    #[test]
    fn entity_punctuation_after_space_is_stripped() {
        for raw in ["Neo4j .", "neo4j . ,", "neo4j:  ;"] {
            let once = normalize_entity(raw);
            assert_eq!(once, "neo4j", "{raw}");
            assert_eq!(normalize_entity(&once), once);
        }
        assert_eq!(normalize_entity("node.js"), "node.js");
    }

    #[test]
    fn predicate_exact_match() {
        for p in Predicate::ALL {
            assert_eq!(normalize_predicate(p.as_str()), p);
        }
    }

    #[test]
    fn predicate_separator_conversion() {
        assert_eq!(normalize_predicate("is_part_of"), Predicate::IsPartOf);
        assert_eq!(normalize_predicate("depends_on"), Predicate::DependsOn);
        assert_eq!(normalize_predicate("built_with"), Predicate::BuiltWith);
        assert_eq!(normalize_predicate("is part of"), Predicate::IsPartOf);
        assert_eq!(normalize_predicate("depends-on"), Predicate::DependsOn);
        assert_eq!(normalize_predicate("Stores In"), Predicate::StoresIn);
    }

    #[test]
    fn predicate_case_insensitive() {
        assert_eq!(normalize_predicate("USES"), Predicate::Uses);
        assert_eq!(normalize_predicate("IsPartOf"), Predicate::IsPartOf);
        assert_eq!(normalize_predicate("  uses  "), Predicate::Uses);
    }

    #[test]
    fn predicate_fallback() {
        assert_eq!(normalize_predicate("unknownPredicate"), Predicate::RelatedTo);
        assert_eq!(normalize_predicate("invented_by"), Predicate::RelatedTo);
        assert_eq!(normalize_predicate(""), Predicate::RelatedTo);
    }

    #[test]
    fn triple_normalizes_every_part() {
        let t = normalize_triple("  Neo4j ", "stores_in", "Disk.");
        assert_eq!(t, KnowledgeTriple::new("neo4j", Predicate::StoresIn, "disk"));
    }

    #[test]
    fn predicate_normalization_is_idempotent() {
        for raw in ["is_part_of", "USES", "whatever", "", "depends-on", "queried with"] {
            let once = normalize_predicate(raw);
            assert_eq!(normalize_predicate(once.as_str()), once, "{raw}");
        }
    }
}
