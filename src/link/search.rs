//! External knowledge-base search.
//!
//! [`EntitySearch`] is the seam between the linker and the network. The
//! production implementation is [`WikidataClient`], a rate-limited wrapper
//! around the `wbsearchentities` API; tests substitute canned searchers.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::SearchError;

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// External identifier, e.g. `Q2005`.
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: description.into(),
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }
}

/// Query an external knowledge base for candidate entities.
pub trait EntitySearch: Send + Sync {
    fn search(&self, query: &str) -> Result<Vec<Candidate>, SearchError>;
}

/// Settings for [`WikidataClient`].
#[derive(Debug, Clone)]
pub struct WikidataConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub limit: usize,
    /// Minimum spacing between two requests, across all threads.
    pub min_interval: Duration,
    /// Pause after the API signals rate limiting.
    pub rate_limit_backoff: Duration,
    pub timeout: Duration,
}

impl Default for WikidataConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.wikidata.org/w/api.php".into(),
            user_agent: format!("devkg-entity-linker/{}", env!("CARGO_PKG_VERSION")),
            limit: 5,
            min_interval: Duration::from_millis(1000),
            rate_limit_backoff: Duration::from_secs(5),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Blocking `wbsearchentities` client.
///
/// Requests are serialized through a shared clock so concurrent resolvers
/// never exceed one call per `min_interval`. A 403 or 429 triggers one
/// backoff-and-retry before the label is given up as rate limited.
pub struct WikidataClient {
    config: WikidataConfig,
    agent: ureq::Agent,
    last_call: Mutex<Option<Instant>>,
}

impl WikidataClient {
    pub fn new(config: WikidataConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self {
            config,
            agent,
            last_call: Mutex::new(None),
        }
    }

    fn wait_turn(&self) {
        let mut last = self
            .last_call
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.config.min_interval {
                std::thread::sleep(self.config.min_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    fn request(&self, query: &str) -> Result<Vec<Candidate>, SearchError> {
        self.wait_turn();
        let limit = self.config.limit.to_string();
        let resp = self
            .agent
            .get(&self.config.endpoint)
            .set("User-Agent", &self.config.user_agent)
            .query("action", "wbsearchentities")
            .query("search", query)
            .query("language", "en")
            .query("format", "json")
            .query("limit", &limit)
            .call();

        match resp {
            Ok(resp) => {
                let body = resp.into_string().map_err(|e| SearchError::Request {
                    message: e.to_string(),
                })?;
                let json: Value =
                    serde_json::from_str(&body).map_err(|e| SearchError::Malformed {
                        message: e.to_string(),
                    })?;
                parse_search_response(&json)
            }
            Err(ureq::Error::Status(status @ (403 | 429), _)) => {
                Err(SearchError::RateLimited { status })
            }
            Err(e) => Err(SearchError::Request {
                message: e.to_string(),
            }),
        }
    }
}

impl EntitySearch for WikidataClient {
    fn search(&self, query: &str) -> Result<Vec<Candidate>, SearchError> {
        match self.request(query) {
            Err(SearchError::RateLimited { status }) => {
                tracing::warn!(
                    query,
                    status,
                    backoff_secs = self.config.rate_limit_backoff.as_secs(),
                    "search rate limited, backing off"
                );
                std::thread::sleep(self.config.rate_limit_backoff);
                self.request(query)
            }
            other => other,
        }
    }
}

/// Decode a `wbsearchentities` response body.
pub fn parse_search_response(json: &Value) -> Result<Vec<Candidate>, SearchError> {
    let hits = json["search"]
        .as_array()
        .ok_or_else(|| SearchError::Malformed {
            message: "missing 'search' array".into(),
        })?;

    Ok(hits
        .iter()
        .filter_map(|hit| {
            let id = hit["id"].as_str()?;
            Some(Candidate {
                id: id.to_string(),
                label: hit["label"].as_str().unwrap_or_default().to_string(),
                description: hit["description"].as_str().unwrap_or_default().to_string(),
                aliases: hit["aliases"]
                    .as_array()
                    .map(|arr| {
                        arr.iter()
                            .filter_map(|a| a.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default(),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_hits() {
        let body = json!({
            "searchinfo": {"search": "neo4j"},
            "search": [
                {
                    "id": "Q1628290",
                    "label": "Neo4j",
                    "description": "graph database management system",
                    "aliases": ["Neo4J"]
                },
                { "id": "Q999", "label": "Neo" },
                { "label": "no id" }
            ]
        });
        let hits = parse_search_response(&body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "Q1628290");
        assert_eq!(hits[0].aliases, vec!["Neo4J"]);
        assert_eq!(hits[1].description, "");
    }

    #[test]
    fn error_body_is_malformed() {
        let body = json!({"error": {"code": "missingparam"}});
        assert!(matches!(
            parse_search_response(&body),
            Err(SearchError::Malformed { .. })
        ));
    }

    #[test]
    fn default_config_is_polite() {
        let config = WikidataConfig::default();
        assert_eq!(config.limit, 5);
        assert!(config.min_interval >= Duration::from_secs(1));
        assert!(config.user_agent.starts_with("devkg"));
    }
}
