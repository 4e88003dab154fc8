//! Entity validity filter.
//!
//! LLM-extracted "entities" are frequently contaminated by code fragments,
//! file paths and numeric artifacts from the source transcripts. This module
//! is the quality gate that separates genuine technical concepts from that
//! noise. It runs on extraction output and again on labels collected for
//! linking; both call sites go through [`classify_entity`].
//!
//! The cascade is evaluated in order and the first matching rule wins. The
//! whitelist sits third: a whitelisted term is accepted without consulting
//! any later rule, whatever its length.

use std::sync::LazyLock;

use regex::Regex;

// ── Word lists ──────────────────────────────────────────────────────────

/// Conversational filler, booleans and nulls the LLM likes to promote to entities.
const STOPWORDS: &[&str] = &[
    "command name",
    "exit",
    "yes",
    "no",
    "ok",
    "the",
    "it",
    "this",
    "that",
    "none",
    "null",
    "undefined",
    "true",
    "false",
    "n/a",
    "[object object]",
    "object object",
];

/// Well-known short tech terms that would otherwise trip the 2-char or
/// filename rules.
pub const WHITELISTED_ENTITIES: &[&str] = &[
    "ai", "ui", "db", "os", "ip", "ci", "cd", "js", "ts", "go", "ml", "api", "sdk", "sql", "css",
    "jwt", "ssh", "ssl", "tls", "dns", "cdn", "gpu", "cpu", "ram", "ssd", "hdd", "cli", "gui",
    "ide", "nlp", "llm", "rag", "rdf", "owl", "uri", "url", "xml", "csv", "pdf", "svg", "png",
    "gif", "npm", "pip", "git", "aws", "gcp", "mcp", "rpa",
];

/// Leading characters that mark hex colors, issue refs, npm scopes, env vars,
/// globs, negations, home paths, dotfiles, ports and CLI flags.
const LEADING_SIGILS: &[char] = &['#', '@', '$', '*', '!', '~', '.', ':', '-'];

// ── Regex patterns ──────────────────────────────────────────────────────

static RE_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[\w@./-][\w./-]*\.(ts|tsx|js|jsx|py|json|yaml|yml|css|html|md|sql|sh|env|db|sqlite|txt|png|csv|jsonl|xml|toml|lock|cfg|ini|log|ttl|rdf|sparql|ipynb|whl|gz|tar|zip|jpg|jpeg|gif|svg|wasm|map|d\.ts|mjs|cjs|exe|dll)$",
    )
    .unwrap()
});

static RE_ICD_SHORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z]\d{2,}(\.\d+)?$").unwrap());

static RE_ICD_UNDERSCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z]+_\d{3}_\d{3}$").unwrap());

static RE_PROTOCOL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z]+_\d+$").unwrap());

static RE_SNAKE_CASE_3SEG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9]*(_[a-z0-9]+){2,}$").unwrap());

static RE_NUMERIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\s").unwrap());

static RE_VERSION_DECIMAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\d+").unwrap());

static RE_PIXELS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+px").unwrap());

static RE_INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

static RE_IPV4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$").unwrap());

static RE_MEASUREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\d+\s*(seconds?|minutes?|hours?|days?|ms|s|m|h|kb|mb|gb|tb)\b").unwrap()
});

static RE_HEX_HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[0-9a-f]{6,}$").unwrap());

static RE_QUANTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\s+\w+s$").unwrap());

static RE_ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\d+(st|nd|rd|th)\b").unwrap());

static RE_FRACTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+/\d+").unwrap());

static RE_CSS_DIMENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d+(px|vh|vw|em|rem|pt|%)\b").unwrap());

// ── Types ───────────────────────────────────────────────────────────────

/// The numeric artifact that caused a [`Rejection::Numeric`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericNoise {
    /// "0 bytes data", "1 llm call"
    LeadingNumber,
    /// "0.3", "5.0.0", "0.75 confidence"
    Version,
    /// "1400px", "800px+ width"
    Pixels,
    /// "42"
    Integer,
    /// "10.158.0.38"
    Ipv4,
    /// "120 seconds", "500ms", "50 mb limit"
    Measurement,
    /// "7f9ef80"
    HexHash,
    /// "80 tests", "3 files"
    Quantity,
    /// "7th character extensions"
    Ordinal,
    /// "3/4", "8/8h"
    Fraction,
}

/// Why a candidate label was rejected. One variant per cascade rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    TooShort,
    Stopword,
    LeadingSigil,
    PathLike,
    Filename,
    MedicalCode,
    ProtocolCode,
    SnakeCaseIdentifier,
    Numeric(NumericNoise),
    CssDimension,
    Percentage,
    CodeSyntax,
    AmbiguousShort,
    TooManyWords,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort => write!(f, "empty or single character"),
            Self::Stopword => write!(f, "stopword"),
            Self::LeadingSigil => write!(f, "leading sigil"),
            Self::PathLike => write!(f, "path"),
            Self::Filename => write!(f, "filename"),
            Self::MedicalCode => write!(f, "medical code"),
            Self::ProtocolCode => write!(f, "protocol code"),
            Self::SnakeCaseIdentifier => write!(f, "snake_case identifier"),
            Self::Numeric(kind) => write!(f, "numeric ({kind:?})"),
            Self::CssDimension => write!(f, "css dimension"),
            Self::Percentage => write!(f, "percentage"),
            Self::CodeSyntax => write!(f, "code syntax"),
            Self::AmbiguousShort => write!(f, "ambiguous two-character token"),
            Self::TooManyWords => write!(f, "more than three words"),
        }
    }
}

/// Outcome of running the cascade on one label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Passed every rule.
    Accepted,
    /// Short-circuited by the whitelist.
    Whitelisted,
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_valid(self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

// ── Cascade ─────────────────────────────────────────────────────────────

/// Run the rejection cascade on `name` as given (no normalization).
pub fn classify_entity(name: &str) -> Verdict {
    let char_len = name.chars().count();
    if char_len <= 1 {
        return Verdict::Rejected(Rejection::TooShort);
    }
    if STOPWORDS.contains(&name) {
        return Verdict::Rejected(Rejection::Stopword);
    }
    if WHITELISTED_ENTITIES.contains(&name) {
        return Verdict::Whitelisted;
    }

    match check_shape(name, char_len) {
        Some(rejection) => Verdict::Rejected(rejection),
        None => Verdict::Accepted,
    }
}

/// Rules 4 through 14, after the whitelist had its chance.
fn check_shape(name: &str, char_len: usize) -> Option<Rejection> {
    if name.starts_with(LEADING_SIGILS) {
        return Some(Rejection::LeadingSigil);
    }
    if name.starts_with('/') || name.contains('\\') {
        return Some(Rejection::PathLike);
    }
    if RE_FILENAME.is_match(name) {
        return Some(Rejection::Filename);
    }
    if RE_ICD_SHORT.is_match(name) || RE_ICD_UNDERSCORE.is_match(name) {
        return Some(Rejection::MedicalCode);
    }
    if RE_PROTOCOL_CODE.is_match(name) {
        return Some(Rejection::ProtocolCode);
    }
    if RE_SNAKE_CASE_3SEG.is_match(name) {
        return Some(Rejection::SnakeCaseIdentifier);
    }
    if let Some(kind) = numeric_noise(name) {
        return Some(Rejection::Numeric(kind));
    }
    if RE_CSS_DIMENSION.is_match(name) {
        return Some(Rejection::CssDimension);
    }
    if name.contains('%') {
        return Some(Rejection::Percentage);
    }
    if name.contains(['[', ']', '(', ')']) {
        return Some(Rejection::CodeSyntax);
    }
    if char_len == 2 {
        return Some(Rejection::AmbiguousShort);
    }
    if name.split_whitespace().count() > 3 {
        return Some(Rejection::TooManyWords);
    }
    None
}

fn numeric_noise(name: &str) -> Option<NumericNoise> {
    let checks: [(&LazyLock<Regex>, NumericNoise); 10] = [
        (&RE_NUMERIC_PREFIX, NumericNoise::LeadingNumber),
        (&RE_VERSION_DECIMAL, NumericNoise::Version),
        (&RE_PIXELS, NumericNoise::Pixels),
        (&RE_INTEGER, NumericNoise::Integer),
        (&RE_IPV4, NumericNoise::Ipv4),
        (&RE_MEASUREMENT, NumericNoise::Measurement),
        (&RE_HEX_HASH, NumericNoise::HexHash),
        (&RE_QUANTITY, NumericNoise::Quantity),
        (&RE_ORDINAL, NumericNoise::Ordinal),
        (&RE_FRACTION, NumericNoise::Fraction),
    ];
    checks
        .into_iter()
        .find(|(re, _)| re.is_match(name))
        .map(|(_, kind)| kind)
}

/// Return `false` for labels that are noise rather than real technical concepts.
pub fn is_valid_entity(name: &str) -> bool {
    classify_entity(name).is_valid()
}

/// Link-stage gate: the same cascade, applied to a trimmed, lowercased label.
///
/// Labels collected from Turtle files or typed by a user have not been
/// through the extraction normalizer, so case and surrounding whitespace are
/// folded here before classification.
pub fn is_linkable_entity(label: &str) -> bool {
    is_valid_entity(&label.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(name: &str) -> Option<Rejection> {
        match classify_entity(name) {
            Verdict::Rejected(r) => Some(r),
            _ => None,
        }
    }

    #[test]
    fn empty_and_single_char() {
        assert_eq!(rejected(""), Some(Rejection::TooShort));
        assert_eq!(rejected("x"), Some(Rejection::TooShort));
    }

    #[test]
    fn stopwords() {
        for sw in ["exit", "yes", "no", "null", "undefined", "true", "false", "n/a"] {
            assert_eq!(rejected(sw), Some(Rejection::Stopword), "{sw}");
        }
    }

    #[test]
    fn whitelist_bypasses_everything() {
        for term in WHITELISTED_ENTITIES {
            assert_eq!(classify_entity(term), Verdict::Whitelisted, "{term}");
        }
        // "ai" is two characters and would otherwise be ambiguous noise.
        assert!(is_valid_entity("ai"));
        assert!(is_valid_entity("db"));
    }

    #[test]
    fn leading_sigils() {
        for name in ["#ff0000", "@radix-ui/react-dialog", "$PATH", "*.ts", ".env", "--verbose", ":3000", "~/.config", "!important"] {
            assert_eq!(rejected(name), Some(Rejection::LeadingSigil), "{name}");
        }
    }

    #[test]
    fn paths() {
        assert_eq!(rejected("/usr/bin/python"), Some(Rejection::PathLike));
        assert_eq!(rejected("c:\\users\\test"), Some(Rejection::PathLike));
    }

    #[test]
    fn filenames() {
        for name in ["__init__.py", "config.json", "auth-utils.ts", "index.d.ts", "program.exe"] {
            assert_eq!(rejected(name), Some(Rejection::Filename), "{name}");
        }
        assert!(is_valid_entity("dockerfile"));
    }

    #[test]
    fn codes_and_identifiers() {
        assert_eq!(rejected("a021"), Some(Rejection::MedicalCode));
        assert_eq!(rejected("k25.0"), Some(Rejection::MedicalCode));
        assert_eq!(rejected("ansied_022_001"), Some(Rejection::MedicalCode));
        assert_eq!(rejected("cefaleia_007"), Some(Rejection::ProtocolCode));
        assert_eq!(rejected("anthropic_api_key"), Some(Rejection::SnakeCaseIdentifier));
        assert!(is_valid_entity("knowledge_graph"));
    }

    #[test]
    fn numeric_noise_kinds() {
        let cases = [
            ("0 bytes data", NumericNoise::LeadingNumber),
            ("5.0.0", NumericNoise::Version),
            ("0.75 confidence", NumericNoise::Version),
            ("192.168.1.1", NumericNoise::Version),
            ("1400px", NumericNoise::Pixels),
            ("42", NumericNoise::Integer),
            ("500ms", NumericNoise::Measurement),
            ("120s", NumericNoise::Measurement),
            ("7f9ef80", NumericNoise::HexHash),
            ("7th character", NumericNoise::Ordinal),
            ("3/4", NumericNoise::Fraction),
        ];
        for (name, kind) in cases {
            assert_eq!(rejected(name), Some(Rejection::Numeric(kind)), "{name}");
        }
        // Leading-number phrases are caught before the quantity rule.
        assert!(matches!(rejected("80 tests"), Some(Rejection::Numeric(_))));
        assert!(matches!(rejected("120 seconds"), Some(Rejection::Numeric(_))));
    }

    #[test]
    fn dimensions_and_percentages() {
        assert_eq!(rejected("height 280px"), Some(Rejection::CssDimension));
        assert_eq!(rejected("full 100vh"), Some(Rejection::CssDimension));
        assert_eq!(rejected("50% discount"), Some(Rejection::Percentage));
    }

    #[test]
    fn code_syntax() {
        assert_eq!(rejected("candidates[0]"), Some(Rejection::CodeSyntax));
        assert_eq!(rejected("express.json()"), Some(Rejection::CodeSyntax));
    }

    #[test]
    fn two_char_noise() {
        assert_eq!(rejected("bp"), Some(Rejection::AmbiguousShort));
        assert_eq!(rejected("ct"), Some(Rejection::AmbiguousShort));
    }

    #[test]
    fn word_count() {
        assert_eq!(rejected("this is too long"), Some(Rejection::TooManyWords));
        assert!(is_valid_entity("graph query language"));
    }

    #[test]
    fn real_entities_pass() {
        for name in [
            "neo4j",
            "python",
            "docker",
            "kubernetes",
            "k8s",
            "graph database",
            "knowledge graph",
            "triple store",
            "claude agent sdk",
            "python 3.12",
        ] {
            assert_eq!(classify_entity(name), Verdict::Accepted, "{name}");
        }
    }

    #[test]
    fn classification_is_deterministic() {
        for name in ["neo4j", "__init__.py", "ai", "80 tests"] {
            assert_eq!(classify_entity(name), classify_entity(name));
        }
    }

    #[test]
    fn linkable_folds_case_and_whitespace() {
        assert!(!is_linkable_entity(""));
        assert!(!is_linkable_entity("   "));
        assert!(is_linkable_entity("  Neo4j "));
        assert!(is_linkable_entity("AI"));
        assert!(!is_linkable_entity("server.py"));
        assert!(!is_linkable_entity("@types/node"));
        assert!(!is_linkable_entity("arr[0]"));
        assert!(!is_linkable_entity("2.5.1"));
    }
}
