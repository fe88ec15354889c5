//! CLI configuration loaded from `podgen.toml`.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use podgen_contracts::error::{PodgenError, PodgenResult};

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Yaml => f.write_str("yaml"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_filter: String,
    pub output: OutputFormat,
    /// Replaces the autogen annotation of every policy read. Blank means unset.
    pub annotation_override: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_filter: "warn".to_string(),
            output: OutputFormat::default(),
            annotation_override: None,
        }
    }
}

impl CliConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `PodgenError::ConfigError` if the TOML is malformed or has
    /// unknown keys.
    pub fn from_toml_str(s: &str) -> PodgenResult<Self> {
        toml::from_str(s).map_err(|e| PodgenError::ConfigError {
            reason: format!("failed to parse config TOML: {}", e),
        })
    }

    /// Read and parse the file at `path`. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> PodgenResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| PodgenError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The override annotation, if one is set and not blank.
    pub fn annotation_override(&self) -> Option<&str> {
        self.annotation_override
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}
