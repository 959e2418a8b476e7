//! Parser configuration
//!
//! Every key is optional in TOML; missing keys take their defaults.
//!
//! ```toml
//! grammar = "python"
//! ignore_magic = true
//! exclude = ["**/migrations/**", "**/__init__.py"]
//! workers = 4
//! file_timeout_ms = 2000
//! unresolved_imports = "drop"
//! sensitive_names = ["password", "secret", "token"]
//! user_input_names = ["request", "payload"]
//! ```

use std::path::Path;
use std::time::Duration;

use pycpg_core::{CpgError, Result};
use serde::{Deserialize, Serialize};

use crate::extractor::BuildOptions;
use crate::heuristics::{
    DEFAULT_SENSITIVE_NAMES, DEFAULT_USER_INPUT_NAMES, SensitivityHeuristic, UserInputHeuristic,
};

/// What happens to an IMPORTS edge whose target is not a project module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedImportPolicy {
    /// Keep the edge, pointing at a synthetic external id labelled with the
    /// import path. The id never appears in the node map.
    #[default]
    Placeholder,
    /// Remove the edge.
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub grammar: String,
    pub ignore_magic: bool,
    /// Glob patterns matched against paths relative to the project root.
    pub exclude: Vec<String>,
    /// Worker pool size; defaults to available parallelism, at least 2.
    pub workers: Option<usize>,
    pub file_timeout_ms: Option<u64>,
    pub unresolved_imports: UnresolvedImportPolicy,
    pub sensitive_names: Vec<String>,
    /// Exact (case-insensitive) names flagged as user input.
    pub user_input_names: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            grammar: "python".to_string(),
            ignore_magic: true,
            exclude: Vec::new(),
            workers: None,
            file_timeout_ms: None,
            unresolved_imports: UnresolvedImportPolicy::default(),
            sensitive_names: DEFAULT_SENSITIVE_NAMES.iter().map(|s| s.to_string()).collect(),
            user_input_names: DEFAULT_USER_INPUT_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ParserConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| CpgError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CpgError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == Some(0) {
            return Err(CpgError::config("`workers` must be at least 1"));
        }
        if self.file_timeout_ms == Some(0) {
            return Err(CpgError::config("`file_timeout_ms` must be at least 1"));
        }
        if self.grammar.trim().is_empty() {
            return Err(CpgError::config("`grammar` must not be empty"));
        }
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get().max(2))
                .unwrap_or(2)
        })
    }

    pub fn file_timeout(&self) -> Option<Duration> {
        self.file_timeout_ms.map(Duration::from_millis)
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            ignore_magic: self.ignore_magic,
            sensitivity: SensitivityHeuristic::new(&self.sensitive_names),
            user_input: UserInputHeuristic::new(&self.user_input_names),
        }
    }
}
