//! The [`DevKgGraph`] node builders and Turtle I/O.

use std::collections::BTreeSet;
use std::io::BufReader;
use std::path::Path;

use oxigraph::io::{RdfFormat, RdfSerializer};
use oxigraph::model::vocab::{rdf, rdfs, xsd};
use oxigraph::model::{GraphNameRef, Literal, NamedNode, NamedNodeRef, Quad, QuadRef, Term};
use oxigraph::store::Store;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    PREFIXES, developer_iri, devkg_iri, entity_iri, message_iri, session_iri, triple_id, triple_iri,
    vocab, wikidata_iri,
};
use crate::error::{GraphError, GraphResult};
use crate::extract::{KnowledgeTriple, is_valid_entity};
use crate::link::{LinkReport, LinkResult, SameAsEdge};

/// Stored message bodies are cut to this many characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Aliases written as `skos:altLabel` per linked entity.
const MAX_ALT_LABELS: usize = 5;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// `"user"` (any case) is a user message; every other role is the assistant.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("user") {
            Self::User
        } else {
            Self::Assistant
        }
    }
}

/// Metadata for a `devkg:Session` node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionNode {
    pub id: String,
    pub platform: String,
    /// `xsd:dateTime` lexical form.
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source_file: Option<String>,
}

/// Borrowed view of one message for [`DevKgGraph::add_message`].
#[derive(Debug, Clone, Copy)]
pub struct MessageNode<'a> {
    pub id: &'a str,
    pub role: Role,
    pub timestamp: Option<&'a str>,
    pub content: Option<&'a str>,
    /// Developer node, only recorded on user messages.
    pub creator: Option<&'a NamedNode>,
    pub parent: Option<&'a NamedNode>,
}

/// In-memory RDF graph with devkg-specific builders.
pub struct DevKgGraph {
    store: Store,
}

fn store_err(e: impl std::fmt::Display) -> GraphError {
    GraphError::Store {
        message: e.to_string(),
    }
}

fn english(text: &str) -> GraphResult<Literal> {
    Literal::new_language_tagged_literal(text, "en").map_err(store_err)
}

fn date_time(value: &str) -> Literal {
    Literal::new_typed_literal(value, xsd::DATE_TIME.into_owned())
}

fn clip_content(content: &str) -> String {
    match content.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((end, _)) => format!("{}...", &content[..end]),
        None => content.to_string(),
    }
}

impl DevKgGraph {
    pub fn new() -> GraphResult<Self> {
        let store = Store::new().map_err(|e| GraphError::Store {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        Ok(Self { store })
    }

    /// Number of triples in the graph.
    pub fn len(&self) -> GraphResult<usize> {
        self.store.len().map_err(store_err)
    }

    pub fn is_empty(&self) -> GraphResult<bool> {
        self.store.is_empty().map_err(store_err)
    }

    fn insert(&self, subject: &NamedNode, predicate: NamedNodeRef<'_>, object: impl Into<Term>) -> GraphResult<()> {
        let quad = Quad::new(
            subject.clone(),
            predicate.into_owned(),
            object,
            GraphNameRef::DefaultGraph,
        );
        self.store.insert(&quad).map_err(|e| GraphError::Store {
            message: format!("insert failed: {e}"),
        })?;
        Ok(())
    }

    /// Whether `subject predicate object` is in the graph.
    pub fn contains(&self, subject: &NamedNode, predicate: NamedNodeRef<'_>, object: &Term) -> GraphResult<bool> {
        let quad = QuadRef::new(subject.as_ref(), predicate, object.as_ref(), GraphNameRef::DefaultGraph);
        self.store.contains(quad).map_err(store_err)
    }

    fn has_type(&self, node: &NamedNode, class: NamedNodeRef<'_>) -> GraphResult<bool> {
        self.contains(node, rdf::TYPE, &Term::from(class.into_owned()))
    }

    // ── Node builders ───────────────────────────────────────────────────

    pub fn add_session(&self, session: &SessionNode) -> GraphResult<NamedNode> {
        let iri = session_iri(&session.id)?;
        self.insert(&iri, rdf::TYPE, vocab::SESSION.into_owned())?;
        self.insert(
            &iri,
            vocab::HAS_SOURCE_PLATFORM,
            Literal::new_simple_literal(&session.platform),
        )?;
        if let Some(created) = &session.created {
            self.insert(&iri, vocab::DCTERMS_CREATED, date_time(created))?;
        }
        if let Some(modified) = &session.modified {
            self.insert(&iri, vocab::DCTERMS_MODIFIED, date_time(modified))?;
        }
        if let Some(title) = &session.title {
            self.insert(&iri, vocab::DCTERMS_TITLE, Literal::new_simple_literal(title))?;
        }
        if let Some(file) = &session.source_file {
            self.insert(&iri, vocab::HAS_SOURCE_FILE, Literal::new_simple_literal(file))?;
        }
        Ok(iri)
    }

    /// `devkg:Developer` node keyed by `id`, or by `name` when no id is known.
    pub fn add_developer(&self, name: &str, id: Option<&str>) -> GraphResult<NamedNode> {
        let iri = developer_iri(id.unwrap_or(name))?;
        if !self.has_type(&iri, vocab::DEVELOPER)? {
            self.insert(&iri, rdf::TYPE, vocab::DEVELOPER.into_owned())?;
            self.insert(&iri, rdfs::LABEL, Literal::new_simple_literal(name))?;
        }
        Ok(iri)
    }

    pub fn add_message(&self, message: &MessageNode<'_>, session: &NamedNode) -> GraphResult<NamedNode> {
        let iri = message_iri(message.id)?;
        match message.role {
            Role::User => {
                self.insert(&iri, rdf::TYPE, vocab::USER_MESSAGE.into_owned())?;
                if let Some(creator) = message.creator {
                    self.insert(&iri, vocab::SIOC_HAS_CREATOR, creator.clone())?;
                }
            }
            Role::Assistant => self.insert(&iri, rdf::TYPE, vocab::ASSISTANT_MESSAGE.into_owned())?,
        }
        self.insert(&iri, vocab::HAS_MESSAGE_ID, Literal::new_simple_literal(message.id))?;
        self.insert(&iri, vocab::USED_IN_SESSION, session.clone())?;
        self.insert(&iri, vocab::SIOC_HAS_CONTAINER, session.clone())?;

        if let Some(ts) = message.timestamp {
            self.insert(&iri, vocab::DCTERMS_CREATED, date_time(ts))?;
        }
        if let Some(content) = message.content.filter(|c| !c.is_empty()) {
            self.insert(&iri, vocab::SIOC_CONTENT, Literal::new_simple_literal(clip_content(content)))?;
        }
        if let Some(parent) = message.parent {
            self.insert(&iri, vocab::HAS_PARENT_MESSAGE, parent.clone())?;
        }
        Ok(iri)
    }

    /// `devkg:Entity` node with a plain `rdfs:label`; created once per IRI.
    pub fn add_entity(&self, label: &str) -> GraphResult<NamedNode> {
        let iri = entity_iri(label)?;
        if !self.has_type(&iri, vocab::ENTITY)? {
            self.insert(&iri, rdf::TYPE, vocab::ENTITY.into_owned())?;
            self.insert(&iri, rdfs::LABEL, Literal::new_simple_literal(label))?;
        }
        Ok(iri)
    }

    /// Add extracted triples for one message.
    ///
    /// Each triple becomes a direct `devkg:{predicate}` edge between entity
    /// nodes, a reified `devkg:KnowledgeTriple` pointing back to the message
    /// and session, and two `devkg:mentionsTopic` links from the message.
    /// Triples with an endpoint the entity validator rejects are skipped.
    /// Returns how many were added.
    pub fn add_knowledge_triples(
        &self,
        message: &NamedNode,
        session: &NamedNode,
        triples: &[KnowledgeTriple],
    ) -> GraphResult<usize> {
        let mut added = 0;
        for t in triples {
            if !is_valid_entity(&t.subject) || !is_valid_entity(&t.object) {
                debug!(triple = %t, "invalid endpoint, not added");
                continue;
            }
            let subject = self.add_entity(&t.subject)?;
            let object = self.add_entity(&t.object)?;
            let predicate_name = t.predicate.as_str();

            let predicate = devkg_iri(predicate_name)?;
            self.insert(&subject, predicate.as_ref(), object.clone())?;

            let record = triple_iri(&triple_id(&t.subject, predicate_name, &t.object, message))?;
            self.insert(&record, rdf::TYPE, vocab::KNOWLEDGE_TRIPLE.into_owned())?;
            self.insert(&record, vocab::TRIPLE_SUBJECT, subject.clone())?;
            self.insert(&record, vocab::TRIPLE_OBJECT, object.clone())?;
            self.insert(
                &record,
                vocab::TRIPLE_PREDICATE_LABEL,
                Literal::new_simple_literal(predicate_name),
            )?;
            self.insert(&record, vocab::EXTRACTED_FROM, message.clone())?;
            self.insert(&record, vocab::EXTRACTED_IN_SESSION, session.clone())?;

            self.insert(message, vocab::MENTIONS_TOPIC, subject)?;
            self.insert(message, vocab::MENTIONS_TOPIC, object)?;
            added += 1;
        }
        Ok(added)
    }

    // ── Links ───────────────────────────────────────────────────────────

    /// Record one link outcome: the entity node with an English label, and
    /// for a confident link `owl:sameAs`, description and alt labels.
    /// Returns whether a same-as edge to the external item was written.
    pub fn add_link(&self, result: &LinkResult) -> GraphResult<bool> {
        let iri = entity_iri(&result.label)?;
        self.insert(&iri, rdf::TYPE, vocab::ENTITY.into_owned())?;
        self.insert(&iri, rdfs::LABEL, english(&result.label)?)?;

        let Some(id) = result.external_id.as_deref() else {
            return Ok(false);
        };
        self.insert(&iri, vocab::OWL_SAME_AS, wikidata_iri(id)?)?;
        if let Some(description) = result.description.as_deref().filter(|d| !d.is_empty()) {
            self.insert(&iri, vocab::DCTERMS_DESCRIPTION, english(description)?)?;
        }
        for alias in result.aliases.iter().take(MAX_ALT_LABELS) {
            self.insert(&iri, vocab::SKOS_ALT_LABEL, english(alias)?)?;
        }
        Ok(true)
    }

    /// `owl:sameAs` from each duplicate entity to its canonical entity.
    pub fn add_same_as(&self, edges: &[SameAsEdge]) -> GraphResult<()> {
        for edge in edges {
            let from = entity_iri(&edge.from)?;
            let to = entity_iri(&edge.to)?;
            if from != to {
                self.insert(&from, vocab::OWL_SAME_AS, to)?;
            }
        }
        Ok(())
    }

    /// Write every result and same-as edge of a batch. Returns links written.
    pub fn add_link_report(&self, report: &LinkReport) -> GraphResult<usize> {
        let mut linked = 0;
        for result in &report.results {
            if self.add_link(result)? {
                linked += 1;
            }
        }
        self.add_same_as(&report.same_as)?;
        Ok(linked)
    }

    // ── Turtle I/O ──────────────────────────────────────────────────────

    pub fn to_turtle(&self) -> GraphResult<String> {
        let mut serializer = RdfSerializer::from_format(RdfFormat::Turtle);
        for (prefix, namespace) in PREFIXES {
            serializer = serializer
                .with_prefix(*prefix, *namespace)
                .map_err(|e| GraphError::Serialize {
                    message: format!("bad prefix {prefix}: {e}"),
                })?;
        }
        let bytes = self
            .store
            .dump_graph_to_writer(GraphNameRef::DefaultGraph, serializer, Vec::new())
            .map_err(|e| GraphError::Serialize {
                message: e.to_string(),
            })?;
        String::from_utf8(bytes).map_err(|e| GraphError::Serialize {
            message: e.to_string(),
        })
    }

    /// Serialize to Turtle at `path`, creating parent directories.
    pub fn write_turtle(&self, path: &Path) -> GraphResult<()> {
        let turtle = self.to_turtle()?;
        let io_err = |e: std::io::Error| GraphError::Serialize {
            message: format!("{}: {e}", path.display()),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, turtle).map_err(io_err)?;
        info!(path = %path.display(), "wrote graph");
        Ok(())
    }

    /// Merge a Turtle file into this graph. Returns the number of new triples.
    pub fn load_turtle(&self, path: &Path) -> GraphResult<usize> {
        let load_err = |message: String| GraphError::Load {
            path: path.display().to_string(),
            message,
        };
        let file = std::fs::File::open(path).map_err(|e| load_err(e.to_string()))?;
        let before = self.len()?;
        self.store
            .load_from_reader(RdfFormat::Turtle, BufReader::new(file))
            .map_err(|e| load_err(e.to_string()))?;
        Ok(self.len()? - before)
    }

    /// Distinct labels of all `devkg:Entity` nodes, sorted.
    pub fn entity_labels(&self) -> GraphResult<Vec<String>> {
        let entity_class = Term::from(vocab::ENTITY.into_owned());
        let mut labels = BTreeSet::new();
        for typed in self
            .store
            .quads_for_pattern(None, Some(rdf::TYPE), Some(entity_class.as_ref()), None)
        {
            let typed = typed.map_err(store_err)?;
            for label in self
                .store
                .quads_for_pattern(Some(typed.subject.as_ref()), Some(rdfs::LABEL), None, None)
            {
                if let Term::Literal(literal) = label.map_err(store_err)?.object {
                    let value = literal.value().trim();
                    if !value.is_empty() {
                        labels.insert(value.to_string());
                    }
                }
            }
        }
        Ok(labels.into_iter().collect())
    }

    /// Load every file into one graph and return its entity labels.
    pub fn collect_entity_labels<P: AsRef<Path>>(paths: &[P]) -> GraphResult<Vec<String>> {
        let graph = Self::new()?;
        for path in paths {
            let added = graph.load_turtle(path.as_ref())?;
            debug!(path = %path.as_ref().display(), added, "loaded turtle");
        }
        graph.entity_labels()
    }
}
