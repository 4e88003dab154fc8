//! RDF sink for the developer knowledge graph.
//!
//! Everything lands in the default graph of an in-memory oxigraph [`Store`]
//! wrapped by [`DevKgGraph`], which knows how to lay out sessions, messages,
//! extracted knowledge triples and entity links, and how to read entity
//! labels back from Turtle written by an earlier run.
//!
//! IRIs are deterministic: entities are content addressed by their label,
//! so the same concept extracted from two messages is one node. Labels whose
//! slug would lose information carry a short hash so distinct labels never
//! share a node.
//!
//! [`Store`]: oxigraph::store::Store

pub mod sink;
pub mod vocab;

use oxigraph::model::NamedNode;
use sha2::{Digest, Sha256};

use crate::error::{GraphError, GraphResult};

pub use sink::{DevKgGraph, MessageNode, Role, SessionNode};

// ── Namespaces ──────────────────────────────────────────────────────────

pub const DEVKG: &str = "http://devkg.local/ontology#";
pub const DATA: &str = "http://devkg.local/data/";
pub const WD: &str = "http://www.wikidata.org/entity/";
pub const PROV: &str = "http://www.w3.org/ns/prov#";
pub const SIOC: &str = "http://rdfs.org/sioc/ns#";
pub const SCHEMA: &str = "http://schema.org/";
pub const DCTERMS: &str = "http://purl.org/dc/terms/";
pub const SKOS: &str = "http://www.w3.org/2004/02/skos/core#";
pub const OWL: &str = "http://www.w3.org/2002/07/owl#";

/// Prefixes bound on every serialized graph.
pub const PREFIXES: &[(&str, &str)] = &[
    ("prov", PROV),
    ("sioc", SIOC),
    ("skos", SKOS),
    ("dcterms", DCTERMS),
    ("schema", SCHEMA),
    ("devkg", DEVKG),
    ("data", DATA),
    ("owl", OWL),
    ("wd", WD),
];

// ── IRI helpers ─────────────────────────────────────────────────────────

/// URI-safe slug: lowercase, runs of anything outside `[a-z0-9]` become one
/// `-`, leading and trailing dashes stripped.
pub fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out
}

/// IRI path segment for `key`: the bare slug when it spells the trimmed,
/// lowercased key exactly, otherwise the slug plus 8 hex chars of the key's
/// SHA-256 (`café` and `caf` stay apart, `机器学习` gets a non-empty segment).
pub fn segment(key: &str) -> String {
    let key = key.trim().to_lowercase();
    let slugged = slug(&key);
    if slugged == key && !slugged.is_empty() {
        return slugged;
    }
    let digest = Sha256::digest(key.as_bytes());
    let tag: String = digest.iter().take(4).map(|b| format!("{b:02x}")).collect();
    if slugged.is_empty() {
        tag
    } else {
        format!("{slugged}-{tag}")
    }
}

fn named(iri: String) -> GraphResult<NamedNode> {
    NamedNode::new(iri.clone()).map_err(|e| GraphError::InvalidIri {
        iri,
        message: e.to_string(),
    })
}

/// `data:entity/{segment}`; the node for an extracted concept.
pub fn entity_iri(label: &str) -> GraphResult<NamedNode> {
    named(format!("{DATA}entity/{}", segment(label)))
}

pub fn session_iri(session_id: &str) -> GraphResult<NamedNode> {
    named(format!("{DATA}session/{}", segment(session_id)))
}

pub fn message_iri(message_id: &str) -> GraphResult<NamedNode> {
    named(format!("{DATA}message/{}", segment(message_id)))
}

pub fn developer_iri(id: &str) -> GraphResult<NamedNode> {
    named(format!("{DATA}developer/{}", segment(id)))
}

/// `wd:{id}` for a Wikidata item.
pub fn wikidata_iri(external_id: &str) -> GraphResult<NamedNode> {
    named(format!("{WD}{}", external_id.trim()))
}

/// `devkg:{local}` for an ontology term not in [`vocab`], e.g. a predicate.
pub fn devkg_iri(local: &str) -> GraphResult<NamedNode> {
    named(format!("{DEVKG}{local}"))
}

/// Stable id of a reified triple: 12 hex chars of
/// `sha256("{subject}|{predicate}|{object}|{message iri}")`.
pub fn triple_id(subject: &str, predicate: &str, object: &str, message: &NamedNode) -> String {
    let key = format!("{subject}|{predicate}|{object}|{}", message.as_str());
    let digest = Sha256::digest(key.as_bytes());
    digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
}

pub fn triple_iri(id: &str) -> GraphResult<NamedNode> {
    named(format!("{DATA}triple/{id}"))
}
