//! Runtime configuration for guidebook core.
//!
//! # Responsibility
//! - Name the gateway collection and storage bucket the services target.
//! - Carry logging bootstrap parameters.
//!
//! # Invariants
//! - Collection and bucket names are never blank after `validate()`.
//! - Missing JSON fields fall back to `GuidebookConfig::default()`.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_GUIDES_COLLECTION: &str = "guides";
const DEFAULT_IMAGE_BUCKET: &str = "guide-images";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:54321";

/// Configuration loading/validation failure.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Guidebook core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidebookConfig {
    /// Gateway collection holding guide rows.
    pub guides_collection: String,
    /// Storage bucket for guide images.
    pub image_bucket: String,
    /// Base URL public object URLs are built from.
    pub public_base_url: String,
    /// `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute log directory; logging stays off when `None`.
    pub log_dir: Option<String>,
}

impl Default for GuidebookConfig {
    fn default() -> Self {
        Self {
            guides_collection: DEFAULT_GUIDES_COLLECTION.to_string(),
            image_bucket: DEFAULT_IMAGE_BUCKET.to_string(),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl GuidebookConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.guides_collection.trim().is_empty() {
            return Err(ConfigError::Invalid("guides_collection must not be blank"));
        }
        if self.image_bucket.trim().is_empty() {
            return Err(ConfigError::Invalid("image_bucket must not be blank"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, GuidebookConfig};
    use std::io::Write;

    #[test]
    fn missing_fields_use_defaults() {
        let config = GuidebookConfig::from_json_str(r#"{"image_bucket": "covers"}"#).unwrap();
        assert_eq!(config.image_bucket, "covers");
        assert_eq!(config.guides_collection, "guides");
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn blank_collection_is_rejected() {
        let err = GuidebookConfig::from_json_str(r#"{"guides_collection": " "}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_reads_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"public_base_url": "https://cdn.example"}}"#).unwrap();
        let config = GuidebookConfig::load(file.path()).unwrap();
        assert_eq!(config.public_base_url, "https://cdn.example");
    }
}
