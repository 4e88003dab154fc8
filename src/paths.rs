//! XDG-compliant path resolution for devkg.
//!
//! The entity cache and the triple memo are long-lived, append-only stores,
//! so they live under the XDG cache directory; Turtle output goes under the
//! data directory.

use std::collections::HashMap;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(devkg::paths::no_home),
        help("Set the HOME environment variable or ensure a valid user profile exists.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(devkg::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Global XDG-compliant directories for devkg.
#[derive(Debug, Clone)]
pub struct DevkgPaths {
    /// `$XDG_CONFIG_HOME/devkg/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/devkg/`
    pub data_dir: PathBuf,
    /// `$XDG_CACHE_HOME/devkg/`
    pub cache_dir: PathBuf,
}

impl DevkgPaths {
    /// Resolve XDG directories from the process environment.
    pub fn resolve() -> PathResult<Self> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::from_env(&env)
    }

    /// Resolve XDG directories from an explicit environment map.
    pub fn from_env(env: &HashMap<String, String>) -> PathResult<Self> {
        let home = env.get("HOME").map(PathBuf::from).ok_or(PathError::NoHome)?;
        let xdg = |var: &str, fallback: &str| {
            env.get(var)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| home.join(fallback))
                .join("devkg")
        };

        Ok(Self {
            config_dir: xdg("XDG_CONFIG_HOME", ".config"),
            data_dir: xdg("XDG_DATA_HOME", ".local/share"),
            cache_dir: xdg("XDG_CACHE_HOME", ".cache"),
        })
    }

    /// Create all base directories. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.cache_dir,
            &self.entity_cache_dir(),
            &self.triple_memo_dir(),
        ] {
            std::fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Path to the global config file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("devkg.toml")
    }

    /// Default location of the user alias table.
    pub fn aliases_file(&self) -> PathBuf {
        self.config_dir.join("entity_aliases.json")
    }

    /// Directory holding the Wikidata entity cache.
    pub fn entity_cache_dir(&self) -> PathBuf {
        self.cache_dir.join("entities")
    }

    /// Directory holding the per-message triple memo.
    pub fn triple_memo_dir(&self) -> PathBuf {
        self.cache_dir.join("triples")
    }

    /// Default output directory for Turtle files.
    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join("output")
    }
}
