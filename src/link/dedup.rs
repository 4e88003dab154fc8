//! Post-hoc merging of labels that resolved to the same identifier.

use std::collections::HashMap;

use serde::Serialize;

use super::linker::LinkResult;

/// `from` and `to` denote the same thing; `to` is the canonical label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SameAsEdge {
    pub from: String,
    pub to: String,
    pub external_id: String,
}

/// Group linked results by external id and point every later label at the
/// first-seen one. Results without an id are ignored.
pub fn dedup_same_as(results: &[LinkResult]) -> Vec<SameAsEdge> {
    let mut canonical: HashMap<&str, &str> = HashMap::new();
    let mut edges = Vec::new();

    for result in results {
        let Some(id) = result.external_id.as_deref() else {
            continue;
        };
        match canonical.get(id) {
            Some(first) if *first != result.label => edges.push(SameAsEdge {
                from: result.label.clone(),
                to: first.to_string(),
                external_id: id.to_string(),
            }),
            Some(_) => {}
            None => {
                canonical.insert(id, &result.label);
            }
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkStatus;

    fn linked(label: &str, id: Option<&str>) -> LinkResult {
        LinkResult {
            label: label.into(),
            external_id: id.map(str::to_string),
            confidence: if id.is_some() { 1.0 } else { 0.0 },
            description: None,
            aliases: Vec::new(),
            status: if id.is_some() {
                LinkStatus::Linked
            } else {
                LinkStatus::NotFound
            },
            cached: false,
        }
    }

    #[test]
    fn js_and_javascript_merge_once() {
        let results = vec![
            linked("js", Some("Q2005")),
            linked("javascript", Some("Q2005")),
            linked("python", Some("Q28865")),
        ];
        let edges = dedup_same_as(&results);
        assert_eq!(
            edges,
            vec![SameAsEdge {
                from: "javascript".into(),
                to: "js".into(),
                external_id: "Q2005".into(),
            }]
        );
    }

    #[test]
    fn three_way_group_points_at_first() {
        let results = vec![
            linked("k8s", Some("Q22661306")),
            linked("kubernetes", Some("Q22661306")),
            linked("kube", Some("Q22661306")),
        ];
        let edges = dedup_same_as(&results);
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.to == "k8s"));
    }

    #[test]
    fn misses_never_merge() {
        let results = vec![linked("foo", None), linked("bar", None)];
        assert!(dedup_same_as(&results).is_empty());
    }
}
