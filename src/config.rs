//! `devkg.toml`: provider, extraction and linking settings.
//!
//! Every key is optional. A missing file means all defaults; API keys never
//! live here and are always read from the environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::extract::ExtractionConfig;
use crate::link::{LinkerConfig, WikidataConfig};
use crate::llm::{ProviderConfig, ProviderKind};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevkgConfig {
    pub provider: ProviderSection,
    pub extraction: ExtractionConfig,
    pub linking: LinkingSection,
}

/// `[provider]`. Unset fields fall back to the chosen backend's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    /// `ollama`, `openai`, `anthropic` or `gemini`; detected from the
    /// environment when absent.
    pub kind: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ProviderSection {
    /// Resolve against `env`: pick the backend, then layer file settings
    /// over the backend defaults.
    pub fn resolve(&self, env: &HashMap<String, String>) -> ConfigResult<ProviderConfig> {
        let kind = match self.kind.as_deref() {
            Some(name) => name.parse::<ProviderKind>()?,
            None => ProviderKind::detect(env),
        };
        let mut config = ProviderConfig::from_env(kind, env);
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }
        Ok(config)
    }
}

/// Entity resolution strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// LLM-driven search loop.
    #[default]
    Agentic,
    /// Search once and rank hits by rules.
    Heuristic,
}

/// `[linking]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkingSection {
    pub mode: LinkMode,
    pub confidence_threshold: f64,
    pub max_parallel: usize,
    pub search_interval_ms: u64,
    pub rate_limit_backoff_secs: u64,
    /// JSON alias table; relative paths are taken from the config directory.
    pub aliases_file: Option<PathBuf>,
}

impl Default for LinkingSection {
    fn default() -> Self {
        let linker = LinkerConfig::default();
        Self {
            mode: LinkMode::default(),
            confidence_threshold: linker.confidence_threshold,
            max_parallel: linker.max_parallel,
            search_interval_ms: 1000,
            rate_limit_backoff_secs: 5,
            aliases_file: None,
        }
    }
}

impl LinkingSection {
    pub fn linker_config(&self) -> LinkerConfig {
        LinkerConfig {
            confidence_threshold: self.confidence_threshold,
            max_parallel: self.max_parallel.max(1),
        }
    }

    pub fn wikidata_config(&self) -> WikidataConfig {
        WikidataConfig {
            min_interval: Duration::from_millis(self.search_interval_ms),
            rate_limit_backoff: Duration::from_secs(self.rate_limit_backoff_secs),
            ..WikidataConfig::default()
        }
    }

    /// The alias file to load, resolved against `config_dir`.
    pub fn aliases_path(&self, config_dir: &Path) -> Option<PathBuf> {
        self.aliases_file.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                config_dir.join(p)
            }
        })
    }
}

impl DevkgConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    /// Load from `path`, or return defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Render as TOML, as printed by `devkg config`.
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: "<memory>".into(),
            message: e.to_string(),
        })
    }
}
