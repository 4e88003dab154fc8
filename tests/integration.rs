//! End-to-end tests for devkg.
//!
//! These run the extraction pipeline, the graph sink and the entity linker
//! together against scripted providers and searchers; nothing touches the
//! network.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use oxigraph::model::Term;

use devkg::extract::{ExtractionStats, Predicate, TripleExtractor};
use devkg::graph::{DevKgGraph, Role, SessionNode, devkg_iri, entity_iri, vocab, wikidata_iri};
use devkg::link::{
    AgenticResolver, AliasTable, Candidate, EntityCache, EntityLinker, EntitySearch,
    HeuristicResolver, LinkStatus, LinkerConfig, SearchError,
};
use devkg::llm::{LlmError, LlmProvider, ModelResponse};
use devkg::pipeline::{Pipeline, SessionInput, SourceMessage};

// ── Test doubles ────────────────────────────────────────────────────────

/// Replies in order; errors once the script runs out.
struct ScriptedProvider {
    replies: Mutex<VecDeque<ModelResponse>>,
}

impl ScriptedProvider {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| ModelResponse::new(*r)).collect()),
        }
    }

    fn with_responses(responses: Vec<ModelResponse>) -> Self {
        Self {
            replies: Mutex::new(responses.into()),
        }
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }
    fn model(&self) -> &str {
        "test"
    }
    fn generate_content(&self, _prompt: &str) -> Result<ModelResponse, LlmError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::RequestFailed {
                message: "script exhausted".into(),
            })
    }
}

#[derive(Default)]
struct StaticSearch {
    hits: HashMap<String, Vec<Candidate>>,
    calls: AtomicUsize,
}

impl StaticSearch {
    fn with(mut self, query: &str, hits: Vec<Candidate>) -> Self {
        self.hits.insert(query.to_string(), hits);
        self
    }
}

impl EntitySearch for StaticSearch {
    fn search(&self, query: &str) -> Result<Vec<Candidate>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.hits.get(query).cloned().unwrap_or_default())
    }
}

fn javascript() -> Candidate {
    Candidate::new("Q2005", "JavaScript", "high-level programming language")
        .with_aliases(&["JS", "ECMAScript"])
}

fn one_message_session(text: &str) -> SessionInput {
    SessionInput {
        session: SessionNode {
            id: "sess-1".into(),
            platform: "claude-code".into(),
            ..Default::default()
        },
        messages: vec![SourceMessage {
            id: "msg-1".into(),
            role: Role::Assistant,
            text: text.into(),
            timestamp: Some("2026-02-01T09:00:00Z".into()),
            author: None,
        }],
    }
}

// ── Extraction → graph ──────────────────────────────────────────────────

#[test]
fn neo4j_stores_in_graph_data() {
    let provider = ScriptedProvider::new(&[
        r#"[{"subject": "Neo4j", "predicate": "storesIn", "object": "Graph Data"}]"#,
    ]);
    let mut stats = ExtractionStats::default();
    let triples = TripleExtractor::new(&provider).extract(
        "Neo4j stores graph data as nodes and relationships on disk.",
        &mut stats,
    );

    assert_eq!(triples.len(), 1);
    assert_eq!(triples[0].subject, "neo4j");
    assert_eq!(triples[0].predicate, Predicate::StoresIn);
    assert_eq!(triples[0].object, "graph data");
    assert_eq!(stats.llm_calls, 1);
}

#[test]
fn neo4j_stores_data_as_a_property_graph() {
    let provider = ScriptedProvider::new(&[
        r#"[{"subject": "Neo4j", "predicate": "storesIn", "object": "property graph"}]"#,
    ]);
    let extractor = TripleExtractor::new(&provider);
    let graph = DevKgGraph::new().unwrap();

    let summary = Pipeline::new(&graph)
        .with_extractor(&extractor)
        .process_session(&one_message_session("Neo4j stores data as a property graph"))
        .unwrap();

    assert_eq!(summary.triples, 1);
    assert_eq!(summary.stats.llm_calls, 1);
    assert_eq!(graph.entity_labels().unwrap(), vec!["neo4j", "property graph"]);
    let stores_in = devkg_iri("storesIn").unwrap();
    assert!(graph
        .contains(
            &entity_iri("neo4j").unwrap(),
            stores_in.as_ref(),
            &Term::from(entity_iri("property graph").unwrap())
        )
        .unwrap());
}

#[test]
fn noise_entities_never_reach_the_graph() {
    let provider = ScriptedProvider::new(&[r#"{"triples": [
        {"subject": "__init__.py", "predicate": "isPartOf", "object": "python package"},
        {"subject": "FastAPI", "predicate": "built_with", "object": "Starlette"},
        {"subject": "42", "predicate": "uses", "object": "redis"}
    ]}"#]);
    let extractor = TripleExtractor::new(&provider);
    let graph = DevKgGraph::new().unwrap();

    let summary = Pipeline::new(&graph)
        .with_extractor(&extractor)
        .process_session(&one_message_session(
            "The package __init__.py wires FastAPI, which is built on Starlette.",
        ))
        .unwrap();

    assert_eq!(summary.triples, 1);
    assert_eq!(graph.entity_labels().unwrap(), vec!["fastapi", "starlette"]);
    let built_with = devkg_iri("builtWith").unwrap();
    assert!(graph
        .contains(
            &entity_iri("fastapi").unwrap(),
            built_with.as_ref(),
            &Term::from(entity_iri("starlette").unwrap())
        )
        .unwrap());
}

#[test]
fn truncated_answer_is_salvaged_into_the_graph() {
    let cut_off = r#"[{"subject": "neo4j", "predicate": "storesIn", "object": "graph data"}, {"subject": "cypher", "predicate": "queriedWi"#;
    let provider = ScriptedProvider::with_responses(vec![ModelResponse {
        text: cut_off.into(),
        stopped_at_limit: true,
    }]);
    let extractor = TripleExtractor::new(&provider);
    let graph = DevKgGraph::new().unwrap();

    let summary = Pipeline::new(&graph)
        .with_extractor(&extractor)
        .process_session(&one_message_session(
            "Neo4j keeps graph data in native store files and is queried with Cypher.",
        ))
        .unwrap();

    assert_eq!(summary.triples, 1);
    assert_eq!(summary.stats.truncations, 1);
    assert_eq!(summary.stats.salvage_recoveries, 1);
    assert_eq!(graph.entity_labels().unwrap(), vec!["graph data", "neo4j"]);
}

#[test]
fn exhausted_provider_degrades_to_no_triples() {
    let provider = ScriptedProvider::new(&["not json", "still not json"]);
    let extractor = TripleExtractor::new(&provider);
    let graph = DevKgGraph::new().unwrap();

    let summary = Pipeline::new(&graph)
        .with_extractor(&extractor)
        .process_session(&one_message_session(
            "Kubernetes schedules containers across a cluster of nodes.",
        ))
        .unwrap();

    assert_eq!(summary.messages, 1);
    assert_eq!(summary.triples, 0);
    assert_eq!(summary.stats.llm_calls, 3);
    assert_eq!(summary.stats.parse_failures, 2);
    assert_eq!(summary.stats.provider_errors, 1);
}

// ── Linking → graph ─────────────────────────────────────────────────────

#[test]
fn js_and_javascript_link_to_one_item() {
    let dir = tempfile::TempDir::new().unwrap();
    let search = Arc::new(
        StaticSearch::default()
            .with("js", vec![javascript()])
            .with("javascript", vec![javascript()]),
    );
    let linker = EntityLinker::new(
        EntityCache::open(dir.path()).unwrap(),
        Box::new(HeuristicResolver::new(search)),
        AliasTable::empty(),
        LinkerConfig::default(),
    );

    let report = linker.link_batch(&["js", "javascript"], "").unwrap();
    assert!(report
        .results
        .iter()
        .all(|r| r.external_id.as_deref() == Some("Q2005")));
    assert_eq!(report.same_as.len(), 1);

    let graph = DevKgGraph::new().unwrap();
    assert_eq!(graph.add_link_report(&report).unwrap(), 2);

    let q2005 = Term::from(wikidata_iri("Q2005").unwrap());
    let js = entity_iri("js").unwrap();
    let javascript_iri = entity_iri("javascript").unwrap();
    assert!(graph.contains(&js, vocab::OWL_SAME_AS, &q2005).unwrap());
    assert!(graph.contains(&javascript_iri, vocab::OWL_SAME_AS, &q2005).unwrap());
    assert!(graph
        .contains(&javascript_iri, vocab::OWL_SAME_AS, &Term::from(js))
        .unwrap());
}

#[test]
fn builtin_aliases_collapse_labels_before_search() {
    let dir = tempfile::TempDir::new().unwrap();
    let search = Arc::new(StaticSearch::default().with("javascript", vec![javascript()]));
    let linker = EntityLinker::new(
        EntityCache::open(dir.path()).unwrap(),
        Box::new(HeuristicResolver::new(search.clone())),
        AliasTable::builtin(),
        LinkerConfig::default(),
    );

    let report = linker.link_batch(&["js", "JavaScript"], "").unwrap();
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].label, "javascript");
    assert!(report.same_as.is_empty());
    assert_eq!(search.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn agentic_linking_from_turtle_labels() {
    let dir = tempfile::TempDir::new().unwrap();
    let ttl = dir.path().join("session.ttl");

    // Extraction run writes a session graph.
    let provider = ScriptedProvider::new(&[
        r#"[{"subject": "js", "predicate": "relatedTo", "object": "frobnicator"}]"#,
    ]);
    let extractor = TripleExtractor::new(&provider);
    let graph = DevKgGraph::new().unwrap();
    Pipeline::new(&graph)
        .with_extractor(&extractor)
        .process_session(&one_message_session(
            "Our js bundle calls the frobnicator on every page load.",
        ))
        .unwrap();
    graph.write_turtle(&ttl).unwrap();

    // Linking run reads the labels back.
    let labels = DevKgGraph::collect_entity_labels(&[&ttl]).unwrap();
    assert_eq!(labels, vec!["frobnicator", "js"]);

    let search = Arc::new(
        StaticSearch::default()
            .with("js", vec![Candidate::new("Q1", "JS", "disambiguation page")])
            .with("javascript", vec![javascript()]),
    );
    // Labels are linked in parallel, so each script is keyed off the prompt.
    struct Agent;
    impl LlmProvider for Agent {
        fn name(&self) -> &str {
            "agent"
        }
        fn model(&self) -> &str {
            "test"
        }
        fn generate_content(&self, prompt: &str) -> Result<ModelResponse, LlmError> {
            let entity = prompt
                .lines()
                .find_map(|l| l.strip_prefix("Entity: "))
                .unwrap_or_default();
            let reply = match (entity, prompt.contains("search \"javascript\"")) {
                ("javascript", false) => r#"{"action": "search", "query": "javascript"}"#,
                ("javascript", true) => {
                    r#"{"action": "answer", "id": "Q2005", "confidence": 0.95, "rationale": "language"}"#
                }
                _ => r#"{"action": "answer", "id": null, "rationale": "no technical match"}"#,
            };
            Ok(ModelResponse::new(reply))
        }
    }

    let linker = EntityLinker::new(
        EntityCache::open(&dir.path().join("cache")).unwrap(),
        Box::new(AgenticResolver::new(Arc::new(Agent), search)),
        AliasTable::builtin(),
        LinkerConfig::default(),
    );
    let report = linker.link_batch(&labels, "developer knowledge graph entity").unwrap();

    let by_label: HashMap<&str, &LinkStatus> = report
        .results
        .iter()
        .map(|r| (r.label.as_str(), &r.status))
        .collect();
    assert_eq!(by_label["javascript"], &LinkStatus::Linked);
    assert_eq!(by_label["frobnicator"], &LinkStatus::NotFound);

    let links = DevKgGraph::new().unwrap();
    assert_eq!(links.add_link_report(&report).unwrap(), 1);
}
