//! In-memory hot tier backed by DashMap.
//!
//! Fronts a durable table so repeated lookups of the same label during a
//! batch never touch redb. All data is lost on process exit.

use dashmap::DashMap;

/// Concurrent in-memory map from string keys to cloned values.
#[derive(Debug)]
pub struct MemStore<V> {
    data: DashMap<String, V>,
}

impl<V: Clone> MemStore<V> {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    /// Insert or replace a value.
    pub fn put(&self, key: &str, value: V) {
        self.data.insert(key.to_string(), value);
    }

    /// Get a clone of the stored value.
    pub fn get(&self, key: &str) -> Option<V> {
        self.data.get(key).map(|v| v.value().clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<V: Clone> Default for MemStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_overwrite() {
        let store = MemStore::new();
        store.put("neo4j", 1u32);
        store.put("neo4j", 2u32);
        assert_eq!(store.get("neo4j"), Some(2));
        assert_eq!(store.get("python"), None);
        assert!(store.contains("neo4j"));
    }

    #[test]
    fn concurrent_access() {
        use std::sync::Arc;
        let store = Arc::new(MemStore::new());
        let handles: Vec<_> = (0..100)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.put(&format!("label-{i}"), i))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 100);
    }
}
