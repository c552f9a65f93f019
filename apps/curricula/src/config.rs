//! # Configuration
//!
//! Optional `curricula.toml`:
//!
//! ```toml
//! [document]
//! max_size_bytes = 16777216
//! pretty = true
//!
//! [curriculum]
//! duplicate_policy = "reject"   # or "last-write-wins"
//!
//! [logging]
//! format = "json"               # or "text"
//! ```
//!
//! Every section and key is optional. `CURRICULA_LOG_FORMAT` overrides
//! `[logging] format`.

use curricula_core::{CurriculumError, DuplicatePolicy, primitives::MAX_DOCUMENT_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file read when `--config` is not given and the file exists.
pub const DEFAULT_CONFIG_FILE: &str = "curricula.toml";

/// Environment variable selecting the log formatter.
pub const LOG_FORMAT_ENV: &str = "CURRICULA_LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = CurriculumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(CurriculumError::DeserializationError(format!(
                "Unknown log format: {}. Use: text, json",
                s
            ))),
        }
    }
}

/// Document reading and writing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Largest document file accepted, in bytes.
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,
    /// Write indented JSON.
    #[serde(default = "default_true")]
    pub pretty: bool,
}

fn default_max_size_bytes() -> u64 {
    MAX_DOCUMENT_SIZE as u64
}

fn default_true() -> bool {
    true
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: default_max_size_bytes(),
            pretty: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurriculumConfig {
    /// How authoring treats two stages with the same name.
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub document: DocumentConfig,
    #[serde(default)]
    pub curriculum: CurriculumConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, CurriculumError> {
        toml::from_str(content).map_err(|e| {
            CurriculumError::DeserializationError(format!("Invalid configuration: {}", e))
        })
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, `curricula.toml` in the
    /// working directory is used when present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, CurriculumError> {
        let path = match path {
            Some(path) => path,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            CurriculumError::IoError(format!(
                "Cannot read config '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// The effective log format: `CURRICULA_LOG_FORMAT` wins over the file.
    pub fn log_format(&self) -> LogFormat {
        std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(self.logging.format)
    }
}

// =============================================================================
// TESTS
// =============================================================================
