//! Ontoclaw configuration
//!
//! Loaded from TOML at startup, falls back to defaults if no config file
//! exists or it fails to parse.

use crate::types::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OntoclawConfig {
    /// Base directory for relative file paths. Unset means the working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,
    pub gateway: GatewayConfig,
    pub agent: AgentSettings,
    pub limits: LimitsConfig,
    pub ontology: OntologyConfig,
}

/// Executor behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Upper bound on any single collaborator call (resolver, extraction, query generation).
    pub collaborator_timeout_ms: u64,
    /// Intents below this confidence get their confidence spelled out in the explanation turn.
    pub low_confidence_threshold: f32,
    /// Number of recent turns handed to the intent resolver.
    pub history_window: usize,
    /// Record confirmed alignments as skos:altLabel triples.
    pub record_alignments: bool,
}

/// Bounds on what is handed to collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Classes/properties included in a concept sample.
    pub concept_sample_size: usize,
    /// Classes and individuals included in an inventory.
    pub inventory_limit: usize,
    /// Labels included in an inventory.
    pub label_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OntologyConfig {
    /// Serialization assumed when a file extension does not say otherwise.
    pub default_format: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            collaborator_timeout_ms: 30_000,
            low_confidence_threshold: 0.5,
            history_window: 5,
            record_alignments: true,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            concept_sample_size: 5,
            inventory_limit: 50,
            label_limit: 100,
        }
    }
}

impl Default for OntologyConfig {
    fn default() -> Self {
        Self {
            default_format: "turtle".into(),
        }
    }
}

impl AgentSettings {
    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }
}

impl OntoclawConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// `./ontoclaw.toml` if present, otherwise `~/.ontoclaw/config.toml`.
    pub fn discover() -> Self {
        let local = PathBuf::from("ontoclaw.toml");
        if local.exists() {
            return Self::load(&local);
        }
        Self::load(&Self::default_path())
    }

    /// Apply `ONTOCLAW_GATEWAY_TOKEN` and `ONTOCLAW_WORKSPACE`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var("ONTOCLAW_GATEWAY_TOKEN") {
            if !token.is_empty() {
                self.gateway.auth.token = Some(token);
            }
        }
        if let Ok(dir) = std::env::var("ONTOCLAW_WORKSPACE") {
            if !dir.is_empty() {
                self.workspace = Some(PathBuf::from(dir));
            }
        }
        self
    }

    /// Directory relative paths (ontology and document loads) are resolved against.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let p = PathBuf::from(path);
        match &self.workspace {
            Some(ws) if p.is_relative() => ws.join(p),
            _ => p,
        }
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".ontoclaw")
            .join("config.toml")
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}
