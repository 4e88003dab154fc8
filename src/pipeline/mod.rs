//! Session pipeline: parsed conversations in, graph nodes and triples out.
//!
//! Messages of one session are handled strictly in order so each message can
//! point at its predecessor with `devkg:hasParentMessage`. Sessions share
//! nothing but the graph, the memo and the provider, all of which are
//! thread-safe, so [`Pipeline::process_sessions`] fans them out on rayon.

use std::path::Path;

use miette::Diagnostic;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::GraphError;
use crate::extract::memo::TripleMemo;
use crate::extract::{ExtractionStats, TripleExtractor};
use crate::graph::{DevKgGraph, MessageNode, Role, SessionNode};

/// Errors from reading session input or writing it to the graph.
#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error("failed to read sessions from {path}")]
    #[diagnostic(
        code(devkg::pipeline::read),
        help("Check that the input file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid session record in {path} at line {line}: {message}")]
    #[diagnostic(
        code(devkg::pipeline::parse),
        help(
            "Input is a JSON array of sessions or one session object per line. \
             Each session needs a `session` object with `id` and `platform`, \
             and a `messages` list of `{{id, role, text}}` objects."
        )
    )]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// One message as handed over by a source-specific parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMessage {
    pub id: String,
    pub role: Role,
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Display name of the human author, for user messages.
    #[serde(default)]
    pub author: Option<String>,
}

/// A parsed conversation: session metadata plus its messages in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInput {
    pub session: SessionNode,
    #[serde(default)]
    pub messages: Vec<SourceMessage>,
}

/// What one session contributed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub messages: usize,
    /// Triples that made it into the graph.
    pub triples: usize,
    pub stats: ExtractionStats,
}

/// Totals over a batch of sessions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub sessions: usize,
    pub messages: usize,
    pub triples: usize,
    pub stats: ExtractionStats,
}

impl BatchSummary {
    fn absorb(&mut self, session: &SessionSummary) {
        self.sessions += 1;
        self.messages += session.messages;
        self.triples += session.triples;
        self.stats.merge(&session.stats);
    }
}

/// Writes sessions into a graph, optionally extracting triples on the way.
pub struct Pipeline<'a> {
    graph: &'a DevKgGraph,
    extractor: Option<&'a TripleExtractor<'a>>,
    memo: Option<&'a TripleMemo>,
}

impl<'a> Pipeline<'a> {
    /// A pipeline that only records sessions and messages.
    pub fn new(graph: &'a DevKgGraph) -> Self {
        Self {
            graph,
            extractor: None,
            memo: None,
        }
    }

    pub fn with_extractor(mut self, extractor: &'a TripleExtractor<'a>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_memo(mut self, memo: &'a TripleMemo) -> Self {
        self.memo = Some(memo);
        self
    }

    /// Process one session, messages in order.
    pub fn process_session(&self, input: &SessionInput) -> PipelineResult<SessionSummary> {
        let session = self.graph.add_session(&input.session)?;
        let mut summary = SessionSummary {
            session_id: input.session.id.clone(),
            ..Default::default()
        };
        let mut parent = None;

        for message in &input.messages {
            let creator = match (&message.role, &message.author) {
                (Role::User, Some(author)) => Some(self.graph.add_developer(author, None)?),
                _ => None,
            };
            let node = self.graph.add_message(
                &MessageNode {
                    id: &message.id,
                    role: message.role,
                    timestamp: message.timestamp.as_deref(),
                    content: Some(&message.text),
                    creator: creator.as_ref(),
                    parent: parent.as_ref(),
                },
                &session,
            )?;
            summary.messages += 1;

            if let Some(extractor) = self.extractor {
                if !message.text.trim().is_empty() {
                    let triples = match self.memo {
                        Some(memo) => {
                            extractor.extract_memoized(memo, &message.id, &message.text, &mut summary.stats)
                        }
                        None => extractor.extract(&message.text, &mut summary.stats),
                    };
                    let added = self.graph.add_knowledge_triples(&node, &session, &triples)?;
                    if added > 0 {
                        debug!(message = %message.id, added, "triples added");
                    }
                    summary.triples += added;
                }
            }
            parent = Some(node);
        }

        info!(
            session = %summary.session_id,
            messages = summary.messages,
            triples = summary.triples,
            "session processed"
        );
        Ok(summary)
    }

    /// Process independent sessions in parallel; stats are merged.
    ///
    /// Stops at the first graph error.
    pub fn process_sessions(&self, inputs: &[SessionInput]) -> PipelineResult<BatchSummary> {
        let summaries: Vec<SessionSummary> = inputs
            .par_iter()
            .map(|input| self.process_session(input))
            .collect::<PipelineResult<_>>()?;

        let mut batch = BatchSummary::default();
        for summary in &summaries {
            batch.absorb(summary);
        }
        info!(
            sessions = batch.sessions,
            triples = batch.triples,
            stats = %batch.stats,
            "batch processed"
        );
        Ok(batch)
    }
}

/// Read sessions from a JSON array or from JSON lines (one session per line).
pub fn load_sessions(path: &Path) -> PipelineResult<Vec<SessionInput>> {
    let read_err = |source: std::io::Error| PipelineError::Read {
        path: path.display().to_string(),
        source,
    };
    let parse_err = |line: usize, e: serde_json::Error| PipelineError::Parse {
        path: path.display().to_string(),
        line,
        message: e.to_string(),
    };

    let content = std::fs::read_to_string(path).map_err(read_err)?;

    if content.trim_start().starts_with('[') {
        return serde_json::from_str(&content).map_err(|e| parse_err(e.line(), e));
    }

    let mut sessions = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        sessions.push(serde_json::from_str(line).map_err(|e| parse_err(idx + 1, e))?);
    }
    Ok(sessions)
}
