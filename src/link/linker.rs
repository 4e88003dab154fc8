//! The entity linker: cache in front of a resolver, with batch support.

use std::collections::HashSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::alias::AliasTable;
use super::cache::{CacheEntry, EntityCache};
use super::dedup::{SameAsEdge, dedup_same_as};
use super::{LinkError, Resolution, Resolver};
use crate::extract::validate::is_linkable_entity;

/// Tunables for [`EntityLinker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    /// Minimum confidence for a link to be materialized.
    pub confidence_threshold: f64,
    /// Ceiling on concurrently resolved cache misses in a batch.
    pub max_parallel: usize,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            max_parallel: 8,
        }
    }
}

/// How a label's resolution ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LinkStatus {
    Linked,
    /// A candidate was found but scored below the threshold.
    LowConfidence { candidate: String },
    NotFound,
    /// Resolution errored this run; the label is now cached as a miss.
    Failed { message: String },
}

/// Outcome for one label. `external_id` is set only for confident links.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkResult {
    pub label: String,
    pub external_id: Option<String>,
    pub confidence: f64,
    pub description: Option<String>,
    /// Alternative names of the linked item (fresh resolutions only).
    pub aliases: Vec<String>,
    pub status: LinkStatus,
    /// Served from the entity cache.
    pub cached: bool,
}

impl LinkResult {
    pub fn is_linked(&self) -> bool {
        self.status == LinkStatus::Linked
    }
}

/// Batch counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub labels: u64,
    pub rejected: u64,
    pub linked: u64,
    pub low_confidence: u64,
    pub not_found: u64,
    pub failed: u64,
    pub cache_hits: u64,
    pub deduplicated: u64,
}

impl LinkStats {
    fn record(&mut self, result: &LinkResult) {
        self.labels += 1;
        if result.cached {
            self.cache_hits += 1;
        }
        match result.status {
            LinkStatus::Linked => self.linked += 1,
            LinkStatus::LowConfidence { .. } => self.low_confidence += 1,
            LinkStatus::NotFound => self.not_found += 1,
            LinkStatus::Failed { .. } => self.failed += 1,
        }
    }
}

impl std::fmt::Display for LinkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} labels: {} linked, {} low confidence, {} not found, {} failed \
             ({} cache hits, {} rejected, {} deduplicated)",
            self.labels,
            self.linked,
            self.low_confidence,
            self.not_found,
            self.failed,
            self.cache_hits,
            self.rejected,
            self.deduplicated,
        )
    }
}

/// Everything produced by [`EntityLinker::link_batch`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkReport {
    /// One result per accepted, alias-normalized, distinct label, in input order.
    pub results: Vec<LinkResult>,
    pub same_as: Vec<SameAsEdge>,
    /// Labels the entity validator refused to link.
    pub rejected: Vec<String>,
    /// Labels not yet in the cache (snapshots only).
    pub pending: Vec<String>,
    pub stats: LinkStats,
}

/// Turn a stored cache entry into a result, applying `threshold`.
fn result_from_cache(label: &str, entry: CacheEntry, threshold: f64) -> LinkResult {
    let (external_id, status) = match entry.external_id {
        None => (None, LinkStatus::NotFound),
        Some(id) if entry.confidence >= threshold => (Some(id), LinkStatus::Linked),
        Some(id) => (None, LinkStatus::LowConfidence { candidate: id }),
    };
    debug!(label, status = ?status, "cache hit");
    LinkResult {
        label: label.to_string(),
        external_id,
        confidence: entry.confidence,
        description: entry.description,
        aliases: Vec::new(),
        status,
        cached: true,
    }
}

/// Build a report from the cache alone, never resolving anything.
///
/// Labels are gated, alias-normalized and deduplicated exactly as in
/// [`EntityLinker::link_batch`]. Meant for a read-only [`EntityCache::open_snapshot`] taken while a
/// linking run is still writing: labels it has not reached yet are listed
/// in [`LinkReport::pending`].
pub fn snapshot_report<S: AsRef<str>>(
    cache: &EntityCache,
    aliases: &AliasTable,
    labels: &[S],
    threshold: f64,
) -> LinkReport {
    let mut report = LinkReport::default();
    let mut seen = HashSet::new();
    for raw in labels {
        let raw = raw.as_ref();
        if !is_linkable_entity(raw) {
            report.rejected.push(raw.to_string());
            continue;
        }
        let label = aliases.normalize(raw);
        if !seen.insert(label.to_lowercase()) {
            continue;
        }
        match cache.get(&label) {
            Ok(Some(entry)) => report.results.push(result_from_cache(&label, entry, threshold)),
            Ok(None) => report.pending.push(label),
            Err(e) => {
                warn!(label = %label, error = %e, "snapshot read failed");
                report.pending.push(label);
            }
        }
    }
    report.same_as = dedup_same_as(&report.results);
    for result in &report.results {
        report.stats.record(result);
    }
    report.stats.rejected = report.rejected.len() as u64;
    report.stats.deduplicated = report.same_as.len() as u64;
    info!(
        stats = %report.stats,
        pending = report.pending.len(),
        "snapshot built"
    );
    report
}

/// Resolves labels to external identifiers, memoizing every outcome.
pub struct EntityLinker {
    cache: EntityCache,
    resolver: Box<dyn Resolver>,
    aliases: AliasTable,
    config: LinkerConfig,
}

impl EntityLinker {
    pub fn new(
        cache: EntityCache,
        resolver: Box<dyn Resolver>,
        aliases: AliasTable,
        config: LinkerConfig,
    ) -> Self {
        Self {
            cache,
            resolver,
            aliases,
            config,
        }
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    /// Link one label: alias normalization, cache, then the resolver.
    pub fn link(&self, label: &str, context: &str) -> LinkResult {
        let label = self.aliases.normalize(label);
        match self.lookup_cached(&label) {
            Some(result) => result,
            None => self.resolve_and_store(&label, context),
        }
    }

    /// Link many labels at once.
    ///
    /// Invalid labels are dropped, aliases applied and duplicates removed.
    /// Cache hits are answered first, in order; misses are then resolved in
    /// parallel on a pool of at most `max_parallel` threads. Finally labels
    /// sharing an identifier are merged by same-as edges.
    pub fn link_batch<S: AsRef<str>>(&self, labels: &[S], context: &str) -> Result<LinkReport, LinkError> {
        let mut report = LinkReport::default();
        let mut seen = HashSet::new();
        let mut ordered: Vec<String> = Vec::new();

        for raw in labels {
            let raw = raw.as_ref();
            if !is_linkable_entity(raw) {
                debug!(label = raw, "not linkable, skipped");
                report.rejected.push(raw.to_string());
                continue;
            }
            let normalized = self.aliases.normalize(raw);
            if seen.insert(normalized.to_lowercase()) {
                ordered.push(normalized);
            }
        }

        let mut slots: Vec<Option<LinkResult>> = vec![None; ordered.len()];
        let mut misses = Vec::new();
        for (i, label) in ordered.iter().enumerate() {
            match self.lookup_cached(label) {
                Some(result) => slots[i] = Some(result),
                None => misses.push(i),
            }
        }

        if !misses.is_empty() {
            let threads = misses.len().min(self.config.max_parallel.max(1));
            info!(
                cached = ordered.len() - misses.len(),
                misses = misses.len(),
                threads,
                resolver = self.resolver.name(),
                "resolving cache misses"
            );
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| LinkError::Pool {
                    message: e.to_string(),
                })?;
            let resolved: Vec<(usize, LinkResult)> = pool.install(|| {
                misses
                    .par_iter()
                    .map(|&i| (i, self.resolve_and_store(&ordered[i], context)))
                    .collect()
            });
            for (i, result) in resolved {
                slots[i] = Some(result);
            }
        }

        report.results = slots.into_iter().flatten().collect();
        report.same_as = dedup_same_as(&report.results);

        for result in &report.results {
            report.stats.record(result);
        }
        report.stats.rejected = report.rejected.len() as u64;
        report.stats.deduplicated = report.same_as.len() as u64;
        info!(stats = %report.stats, "linking finished");
        Ok(report)
    }

    fn lookup_cached(&self, label: &str) -> Option<LinkResult> {
        match self.cache.get(label) {
            Ok(Some(entry)) => Some(result_from_cache(label, entry, self.config.confidence_threshold)),
            Ok(None) => None,
            Err(e) => {
                warn!(label, error = %e, "entity cache read failed, resolving afresh");
                None
            }
        }
    }

    fn resolve_and_store(&self, label: &str, context: &str) -> LinkResult {
        match self.resolver.resolve(label, context) {
            Ok(Resolution::Matched(m)) => {
                self.persist(label, Some(&m.external_id), m.description.as_deref(), m.confidence);
                if m.confidence >= self.config.confidence_threshold {
                    debug!(label, id = %m.external_id, confidence = m.confidence, rationale = %m.rationale, "linked");
                    LinkResult {
                        label: label.to_string(),
                        external_id: Some(m.external_id),
                        confidence: m.confidence,
                        description: m.description,
                        aliases: m.aliases,
                        status: LinkStatus::Linked,
                        cached: false,
                    }
                } else {
                    warn!(label, id = %m.external_id, confidence = m.confidence, "below confidence threshold, not linked");
                    LinkResult {
                        label: label.to_string(),
                        external_id: None,
                        confidence: m.confidence,
                        description: m.description,
                        aliases: Vec::new(),
                        status: LinkStatus::LowConfidence {
                            candidate: m.external_id,
                        },
                        cached: false,
                    }
                }
            }
            Ok(Resolution::NoMatch { reason }) => {
                self.persist(label, None, None, 0.0);
                debug!(label, reason = %reason, "no match");
                self.unlinked(label, LinkStatus::NotFound)
            }
            Err(e) => {
                self.persist(label, None, None, 0.0);
                warn!(label, error = %e, "resolution failed, cached as miss");
                self.unlinked(
                    label,
                    LinkStatus::Failed {
                        message: e.to_string(),
                    },
                )
            }
        }
    }

    fn unlinked(&self, label: &str, status: LinkStatus) -> LinkResult {
        LinkResult {
            label: label.to_string(),
            external_id: None,
            confidence: 0.0,
            description: None,
            aliases: Vec::new(),
            status,
            cached: false,
        }
    }

    fn persist(&self, label: &str, id: Option<&str>, description: Option<&str>, confidence: f64) {
        if let Err(e) = self.cache.put(label, id, description, confidence) {
            warn!(label, error = %e, "failed to persist link outcome");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::search::{Candidate, EntitySearch};
    use crate::link::{HeuristicResolver, SearchError};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MapSearch {
        hits: HashMap<String, Vec<Candidate>>,
        failing: HashSet<String>,
        calls: AtomicUsize,
    }

    impl MapSearch {
        fn with(mut self, query: &str, hits: Vec<Candidate>) -> Self {
            self.hits.insert(query.to_string(), hits);
            self
        }

        fn failing_on(mut self, query: &str) -> Self {
            self.failing.insert(query.to_string());
            self
        }
    }

    impl EntitySearch for MapSearch {
        fn search(&self, query: &str) -> Result<Vec<Candidate>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(query) {
                return Err(SearchError::Request {
                    message: "connection refused".into(),
                });
            }
            Ok(self.hits.get(query).cloned().unwrap_or_default())
        }
    }

    fn javascript() -> Candidate {
        Candidate::new("Q2005", "JavaScript", "high-level programming language")
            .with_aliases(&["JS", "ECMAScript"])
    }

    fn linker(dir: &TempDir, search: Arc<MapSearch>, aliases: AliasTable) -> EntityLinker {
        let cache = EntityCache::open(dir.path()).unwrap();
        EntityLinker::new(
            cache,
            Box::new(HeuristicResolver::new(search)),
            aliases,
            LinkerConfig::default(),
        )
    }

    #[test]
    fn known_miss_short_circuits_search() {
        let dir = TempDir::new().unwrap();
        let search = Arc::new(MapSearch::default());
        let linker = linker(&dir, search.clone(), AliasTable::empty());
        linker.cache().put_miss("frobnicator").unwrap();

        let result = linker.link("frobnicator", "");
        assert_eq!(result.status, LinkStatus::NotFound);
        assert!(result.cached);
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn low_confidence_cache_hit_is_not_linked() {
        let dir = TempDir::new().unwrap();
        let linker = linker(&dir, Arc::new(MapSearch::default()), AliasTable::empty());
        linker.cache().put("mercury", Some("Q308"), Some("planet"), 0.5).unwrap();

        let result = linker.link("Mercury", "");
        assert_eq!(result.external_id, None);
        assert_eq!(
            result.status,
            LinkStatus::LowConfidence {
                candidate: "Q308".into()
            }
        );
    }

    #[test]
    fn fresh_link_is_cached() {
        let dir = TempDir::new().unwrap();
        let search = Arc::new(MapSearch::default().with("javascript", vec![javascript()]));
        let linker = linker(&dir, search.clone(), AliasTable::empty());

        let first = linker.link("javascript", "");
        assert!(first.is_linked());
        assert!(!first.cached);
        assert_eq!(first.aliases, vec!["JS", "ECMAScript"]);

        let second = linker.link("JavaScript", "");
        assert!(second.cached);
        assert_eq!(second.external_id.as_deref(), Some("Q2005"));
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fallback_match_is_low_confidence() {
        let dir = TempDir::new().unwrap();
        let search = Arc::new(
            MapSearch::default().with("sidecar", vec![Candidate::new("Q7", "Motorcycle sidecar", "one-wheeled attachment")]),
        );
        let linker = linker(&dir, search, AliasTable::empty());
        let result = linker.link("sidecar", "");
        assert!(matches!(result.status, LinkStatus::LowConfidence { .. }));
        assert_eq!(result.confidence, 0.5);
        let entry = linker.cache().get("sidecar").unwrap().unwrap();
        assert_eq!(entry.external_id.as_deref(), Some("Q7"));
    }

    #[test]
    fn search_error_is_cached_miss() {
        let dir = TempDir::new().unwrap();
        let search = Arc::new(MapSearch::default().failing_on("flaky"));
        let linker = linker(&dir, search.clone(), AliasTable::empty());

        assert!(matches!(linker.link("flaky", "").status, LinkStatus::Failed { .. }));
        assert_eq!(linker.link("flaky", "").status, LinkStatus::NotFound);
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn batch_filters_normalizes_and_dedups_labels() {
        let dir = TempDir::new().unwrap();
        let search = Arc::new(MapSearch::default().with(
            "kubernetes",
            vec![Candidate::new("Q22661306", "Kubernetes", "container orchestration system")],
        ));
        let linker = linker(&dir, search, AliasTable::builtin());

        let labels = ["k8s", "Kubernetes", "__init__.py", "kubernetes", "@types/node"];
        let report = linker.link_batch(&labels, "").unwrap();

        assert_eq!(report.rejected, vec!["__init__.py", "@types/node"]);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].label, "kubernetes");
        assert!(report.results[0].is_linked());
        assert_eq!(report.stats.rejected, 2);
        assert!(report.same_as.is_empty());
    }

    #[test]
    fn batch_merges_js_and_javascript() {
        let dir = TempDir::new().unwrap();
        let search = Arc::new(
            MapSearch::default()
                .with("js", vec![javascript()])
                .with("javascript", vec![javascript()]),
        );
        let linker = linker(&dir, search, AliasTable::empty());

        let report = linker.link_batch(&["js", "javascript"], "").unwrap();
        assert_eq!(report.results.len(), 2);
        assert!(report.results.iter().all(|r| r.external_id.as_deref() == Some("Q2005")));
        assert_eq!(
            report.same_as,
            vec![SameAsEdge {
                from: "javascript".into(),
                to: "js".into(),
                external_id: "Q2005".into(),
            }]
        );
        assert_eq!(report.stats.deduplicated, 1);
    }

    #[test]
    fn batch_answers_hits_and_resolves_misses_in_order() {
        let dir = TempDir::new().unwrap();
        let mut search = MapSearch::default();
        for i in 0..20 {
            search = search.with(
                &format!("tool{i}"),
                vec![Candidate::new(format!("Q{}", 100 + i), format!("Tool{i}"), "software")],
            );
        }
        let search = Arc::new(search);
        let cache = EntityCache::open(dir.path()).unwrap();
        cache.put("tool3", Some("Q103"), None, 1.0).unwrap();
        let linker = EntityLinker::new(
            cache,
            Box::new(HeuristicResolver::new(search.clone())),
            AliasTable::empty(),
            LinkerConfig {
                max_parallel: 4,
                ..Default::default()
            },
        );

        let labels: Vec<String> = (0..20).map(|i| format!("tool{i}")).collect();
        let report = linker.link_batch(&labels, "").unwrap();

        let got: Vec<&str> = report.results.iter().map(|r| r.label.as_str()).collect();
        let want: Vec<&str> = labels.iter().map(String::as_str).collect();
        assert_eq!(got, want);
        assert_eq!(report.stats.linked, 20);
        assert_eq!(report.stats.cache_hits, 1);
        assert_eq!(search.calls.load(Ordering::SeqCst), 19);
    }

    #[test]
    fn snapshot_reads_cache_without_resolving() {
        let dir = TempDir::new().unwrap();
        {
            let cache = EntityCache::open(dir.path()).unwrap();
            cache.put("js", Some("Q2005"), Some("programming language"), 0.8).unwrap();
            cache.put("javascript", Some("Q2005"), None, 1.0).unwrap();
            cache.put_miss("frobnicator").unwrap();
        }
        let snapshot = EntityCache::open_snapshot(dir.path()).unwrap();
        let labels = ["js", "javascript", "frobnicator", "kafka", "JS", "__init__.py", "/usr/lib"];
        let report = snapshot_report(&snapshot, &AliasTable::empty(), &labels, 0.7);

        assert_eq!(report.results.len(), 3);
        assert_eq!(report.pending, vec!["kafka"]);
        assert_eq!(report.rejected, vec!["__init__.py", "/usr/lib"]);
        assert_eq!(report.stats.rejected, 2);
        assert_eq!(report.stats.linked, 2);
        assert_eq!(report.stats.not_found, 1);
        assert_eq!(report.same_as.len(), 1);
        assert!(report.results.iter().all(|r| r.cached));
    }
}
