//! Serialization format definitions

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Supported artifact serialization formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    /// JSON format (default, floats round-trip exactly)
    #[default]
    Json,

    /// YAML format (human-readable)
    Yaml,
}

impl ArtifactFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &str {
        match self {
            ArtifactFormat::Json => "json",
            ArtifactFormat::Yaml => "yaml",
        }
    }

    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(ArtifactFormat::Json),
            "yaml" | "yml" => Some(ArtifactFormat::Yaml),
            _ => None,
        }
    }
}

/// Configuration for saving artifacts
#[derive(Debug, Clone, PartialEq)]
pub struct SaveConfig {
    pub format: ArtifactFormat,

    /// Whether to pretty-print JSON
    pub pretty: bool,
}

impl SaveConfig {
    pub fn new(format: ArtifactFormat) -> Self {
        Self {
            format,
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn serialize<T: Serialize>(&self, value: &T) -> Result<String> {
        match self.format {
            ArtifactFormat::Json if self.pretty => serde_json::to_string_pretty(value)
                .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}"))),
            ArtifactFormat::Json => serde_json::to_string(value)
                .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}"))),
            ArtifactFormat::Yaml => serde_yaml::to_string(value)
                .map_err(|e| Error::Serialization(format!("YAML serialization failed: {e}"))),
        }
    }

    pub fn deserialize<T: DeserializeOwned>(&self, content: &str) -> Result<T> {
        match self.format {
            ArtifactFormat::Json => serde_json::from_str(content)
                .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}"))),
            ArtifactFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| Error::Serialization(format!("YAML deserialization failed: {e}"))),
        }
    }
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self::new(ArtifactFormat::Json)
    }
}
