//! Surface-form synonyms resolved before any cache lookup or search.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

/// Compiled-in abbreviations that search engines resolve poorly.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("k8s", "kubernetes"),
    ("js", "javascript"),
    ("ts", "typescript"),
    ("py", "python"),
    ("postgres", "postgresql"),
    ("pg", "postgresql"),
    ("mongo", "mongodb"),
    ("tf", "terraform"),
    ("gh", "github"),
    ("apis", "application programming interface"),
    ("llms", "large language model"),
    ("rdbms", "relational database management system"),
];

/// Case-insensitive surface form → canonical label map.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    /// A table with no aliases at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The compiled-in abbreviations.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (surface, canonical) in BUILTIN_ALIASES {
            table.insert(surface, canonical);
        }
        table
    }

    /// Builtins extended (and overridden) by a JSON object file.
    ///
    /// A missing file is not an error; the builtins are returned unchanged.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let mut table = Self::builtin();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no alias file, using builtins");
            return Ok(table);
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let extra: HashMap<String, String> =
            serde_json::from_str(&content).map_err(|e| ConfigError::Aliases {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        for (surface, canonical) in &extra {
            table.insert(surface, canonical);
        }
        tracing::debug!(count = extra.len(), path = %path.display(), "loaded entity aliases");
        Ok(table)
    }

    /// Register `surface` → `canonical`. Self-mappings are ignored.
    pub fn insert(&mut self, surface: &str, canonical: &str) {
        let key = surface.trim().to_lowercase();
        let canonical = canonical.trim();
        if key != canonical.to_lowercase() {
            self.aliases.insert(key, canonical.to_string());
        }
    }

    /// The canonical form of `label`, or the trimmed label itself.
    pub fn normalize(&self, label: &str) -> String {
        let trimmed = label.trim();
        self.aliases
            .get(&trimmed.to_lowercase())
            .cloned()
            .unwrap_or_else(|| trimmed.to_string())
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn builtins_resolve_case_insensitively() {
        let table = AliasTable::builtin();
        assert_eq!(table.normalize("k8s"), "kubernetes");
        assert_eq!(table.normalize("  K8S "), "kubernetes");
        assert_eq!(table.normalize("neo4j"), "neo4j");
        assert_eq!(table.normalize(" Neo4j "), "Neo4j");
    }

    #[test]
    fn self_mapping_ignored() {
        let mut table = AliasTable::empty();
        table.insert("Rust", "rust");
        assert!(table.is_empty());
    }

    #[test]
    fn file_extends_and_overrides_builtins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entity_aliases.json");
        std::fs::write(&path, r#"{"gke": "google kubernetes engine", "pg": "pgvector"}"#).unwrap();

        let table = AliasTable::load(&path).unwrap();
        assert_eq!(table.normalize("GKE"), "google kubernetes engine");
        assert_eq!(table.normalize("pg"), "pgvector");
        assert_eq!(table.normalize("k8s"), "kubernetes");
    }

    #[test]
    fn missing_file_is_builtins() {
        let dir = TempDir::new().unwrap();
        let table = AliasTable::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(table.len(), AliasTable::builtin().len());
    }

    #[test]
    fn invalid_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(
            AliasTable::load(&path),
            Err(ConfigError::Aliases { .. })
        ));
    }
}
