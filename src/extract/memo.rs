//! Per-message memo of extraction results.
//!
//! Keyed by message id. Each record carries a short hash of the text it was
//! extracted from, so an edited message is re-extracted instead of served
//! stale triples.

use std::path::Path;

use redb::TableDefinition;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::KnowledgeTriple;
use crate::store::{self, DurableStore, StoreResult, StrTable};

const TRIPLE_MEMO: StrTable = TableDefinition::new("triple_memo");

/// Database file name inside the memo directory.
pub const MEMO_FILE: &str = "triples.redb";

/// One memoized extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoRecord {
    pub triples: Vec<KnowledgeTriple>,
    pub text_hash: String,
}

/// First 16 hex characters of the SHA-256 of `text`.
pub fn text_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

/// Durable message id → triples memo.
#[derive(Debug)]
pub struct TripleMemo {
    store: DurableStore,
}

impl TripleMemo {
    /// Open or create the memo under `dir`.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        let store = DurableStore::open(&dir.join(MEMO_FILE), &[TRIPLE_MEMO])?;
        Ok(Self { store })
    }

    pub fn get(&self, message_id: &str) -> StoreResult<Option<MemoRecord>> {
        match self.store.get(TRIPLE_MEMO, message_id)? {
            Some(bytes) => Ok(Some(store::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Memoized triples for `message_id`, if present and extracted from `text`.
    pub fn lookup(&self, message_id: &str, text: &str) -> StoreResult<Option<Vec<KnowledgeTriple>>> {
        Ok(self
            .get(message_id)?
            .filter(|record| record.text_hash == text_hash(text))
            .map(|record| record.triples))
    }

    pub fn put(&self, message_id: &str, text: &str, triples: &[KnowledgeTriple]) -> StoreResult<()> {
        let record = MemoRecord {
            triples: triples.to_vec(),
            text_hash: text_hash(text),
        };
        self.store.put(TRIPLE_MEMO, message_id, &store::encode(&record)?)
    }

    pub fn len(&self) -> StoreResult<u64> {
        self.store.len(TRIPLE_MEMO)
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        self.len().map(|n| n == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Predicate;
    use tempfile::TempDir;

    #[test]
    fn hash_is_sixteen_hex_chars() {
        let h = text_hash("Neo4j stores data as a property graph");
        assert_eq!(h.len(), 16);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h, text_hash("Neo4j stores data as a property graph"));
        assert_ne!(h, text_hash("Neo4j stores data as a property graph."));
    }

    #[test]
    fn lookup_requires_matching_text() {
        let dir = TempDir::new().unwrap();
        let memo = TripleMemo::open(dir.path()).unwrap();
        let triples = vec![KnowledgeTriple::new("neo4j", Predicate::Uses, "cypher")];

        memo.put("msg-1", "Neo4j uses Cypher", &triples).unwrap();
        assert_eq!(memo.lookup("msg-1", "Neo4j uses Cypher").unwrap(), Some(triples));
        assert_eq!(memo.lookup("msg-1", "Neo4j uses Gremlin").unwrap(), None);
        assert_eq!(memo.lookup("msg-2", "Neo4j uses Cypher").unwrap(), None);
        assert_eq!(memo.len().unwrap(), 1);
    }

    #[test]
    fn empty_result_is_memoized() {
        let dir = TempDir::new().unwrap();
        let memo = TripleMemo::open(dir.path()).unwrap();
        memo.put("msg-1", "make the sidebar wider please", &[]).unwrap();
        assert_eq!(
            memo.lookup("msg-1", "make the sidebar wider please").unwrap(),
            Some(vec![])
        );
    }
}
