use anyhow::{Context, Result, anyhow};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::backend::ModelVariant;
use crate::endpoint::{Endpoints, PageOrigin};
use crate::language_utils;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Source language tag (e.g. "en")
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language tag (e.g. "zh-TW")
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Model variant used for translations
    #[serde(default)]
    pub model: ModelVariant,

    /// How to reach the backend
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Backend connection settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConnectionConfig {
    /// Origin the client is served from, e.g. "https://translate.example.com"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// Explicit backend URL, takes precedence over the origin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Timeout for HTTP requests in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            origin: None,
            api_url: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching filter for the `log` facade
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "zh-TW".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load the configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        language_utils::validate_language_tag(&self.source_language)
            .context("Invalid source language")?;
        language_utils::validate_language_tag(&self.target_language)
            .context("Invalid target language")?;

        if let Some(origin) = &self.connection.origin {
            PageOrigin::parse(origin)?;
        }

        if let Some(api_url) = &self.connection.api_url {
            let url = url::Url::parse(api_url)
                .with_context(|| format!("Invalid API URL: {}", api_url))?;
            if !matches!(url.scheme(), "http" | "https" | "ws" | "wss") {
                return Err(anyhow!("Unsupported API URL scheme: {}", url.scheme()));
            }
        }

        if self.connection.request_timeout_secs == 0 {
            return Err(anyhow!("Request timeout must be at least one second"));
        }

        Ok(())
    }

    /// Resolve the backend endpoints for this configuration
    pub fn endpoints(&self) -> Result<Endpoints> {
        let origin = self
            .connection
            .origin
            .as_deref()
            .map(PageOrigin::parse)
            .transpose()?;
        Ok(Endpoints::resolve(origin.as_ref(), self.connection.api_url.as_deref()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.request_timeout_secs)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            model: ModelVariant::default(),
            connection: ConnectionConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
