//! Configuration file parser for ~/.config/cookbook/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted but logged, since they are usually typos.
//! `COOKBOOK_URL` and `COOKBOOK_API_KEY` take precedence over the file.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::backend::{Backend, BackendError};
use crate::feed::FeedOptions;
use crate::recipes::{RecipeStore, DEFAULT_IMAGE_BUCKET};
use crate::session::Language;

pub const URL_ENV: &str = "COOKBOOK_URL";
pub const API_KEY_ENV: &str = "COOKBOOK_API_KEY";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds the maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// A setting needed to reach the backend is absent from file and env.
    #[error("Missing setting `{key}` (set it in the config file or {env})")]
    Missing {
        key: &'static str,
        env: &'static str,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Custom Debug impl masks `api_key`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend project URL, e.g. `https://project.example.co`.
    pub base_url: Option<String>,

    /// Public (anon) API key sent with every request.
    pub api_key: Option<String>,

    /// Recipes per feed page.
    pub page_size: u64,

    /// Quiet period before a typed search is sent, in milliseconds.
    pub search_debounce_ms: u64,

    /// Object-store bucket holding recipe images.
    pub image_bucket: String,

    /// Display language code for reference names (`th` or `en`).
    pub language: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            page_size: 3,
            search_debounce_ms: 500,
            image_bucket: DEFAULT_IMAGE_BUCKET.to_string(),
            language: "th".to_string(),
            request_timeout_secs: 20,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("page_size", &self.page_size)
            .field("search_debounce_ms", &self.search_debounce_ms)
            .field("image_bucket", &self.image_bucket)
            .field("language", &self.language)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

const KNOWN_KEYS: [&str; 7] = [
    "base_url",
    "api_key",
    "page_size",
    "search_debounce_ms",
    "image_bucket",
    "language",
    "request_timeout_secs",
];

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing or empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let mut config: Config = toml::from_str(content)?;
        if config.page_size == 0 {
            tracing::warn!("page_size = 0 is not usable, falling back to 3");
            config.page_size = 3;
        }
        tracing::info!(
            page_size = config.page_size,
            language = %config.language,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Let non-empty `url`/`api_key` values (normally from the environment)
    /// replace the file's.
    pub fn with_overrides(mut self, url: Option<String>, api_key: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.base_url = Some(url);
        }
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        self
    }

    /// Apply `COOKBOOK_URL` / `COOKBOOK_API_KEY` from the process environment.
    pub fn with_env(self) -> Self {
        self.with_overrides(std::env::var(URL_ENV).ok(), std::env::var(API_KEY_ENV).ok())
    }

    pub fn language(&self) -> Language {
        Language::from_code(&self.language)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn feed_options(&self) -> FeedOptions {
        FeedOptions {
            page_size: self.page_size.max(1),
            search_debounce: Duration::from_millis(self.search_debounce_ms),
        }
    }

    /// Backend handle for the configured project.
    pub fn backend(&self) -> Result<Backend, ConfigError> {
        let base_url = self.base_url.as_deref().ok_or(ConfigError::Missing {
            key: "base_url",
            env: URL_ENV,
        })?;
        let api_key = self.api_key.clone().ok_or(ConfigError::Missing {
            key: "api_key",
            env: API_KEY_ENV,
        })?;
        Ok(Backend::new(base_url, SecretString::from(api_key))?.with_timeout(self.request_timeout()))
    }

    /// Recipe store over [`Config::backend`] using the configured bucket.
    pub fn store(&self) -> Result<RecipeStore, ConfigError> {
        Ok(RecipeStore::new(self.backend()?).with_image_bucket(self.image_bucket.clone()))
    }
}

// ============================================================================
// Tests
// ============================================================================
