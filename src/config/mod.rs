//! Configuration management for tercume
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. Command-line overrides are applied by the binary.
//!
//! ```toml
//! [i18n]
//! locale = "tr-TR"
//! fallback_locale = "en"
//! messages_dir = "locales"
//!
//! [remote]
//! base_url = "https://cdn.example.com/i18n"
//! locales = ["en", "tr"]
//!
//! [cache]
//! backend = "file"
//! dir = ".cache/tercume"
//! ttl_ms = 3600000
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::source::remote::{RemoteConfig, DEFAULT_EXTENSION};
use crate::source::storage::{
    CacheStorage, FileStorage, MemoryStorage, RedisStorage, RedisStorageConfig,
};
use crate::utils::retry::RetryConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Locale selection and static messages
    pub i18n: I18nConfig,

    /// Remote message source (absent when messages are local only)
    pub remote: Option<RemoteSettings>,

    /// Offline cache in front of the remote source
    pub cache: CacheConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Locale configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct I18nConfig {
    /// Initial current locale
    pub locale: String,

    /// Last entry of every fallback chain
    pub fallback_locale: String,

    /// Maximum number of compiled templates kept
    pub template_cache_capacity: usize,

    /// Directory of `{locale}.json` files (and `{locale}/{namespace}.json`)
    pub messages_dir: Option<PathBuf>,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            locale: String::from("en"),
            fallback_locale: String::from("en"),
            template_cache_capacity: crate::format::cache::DEFAULT_CAPACITY,
            messages_dir: None,
        }
    }
}

/// Remote source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Endpoint prefix; dictionaries live at `{base_url}/{locale}{extension}`
    pub base_url: String,

    /// File-extension suffix
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry attempts for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Extra request headers
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Locales the endpoint serves
    #[serde(default)]
    pub locales: Vec<String>,
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

impl RemoteSettings {
    /// Settings with defaults for everything but the base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            extension: default_extension(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            headers: HashMap::new(),
            locales: Vec::new(),
        }
    }

    /// Source configuration derived from these settings
    pub fn to_source_config(&self) -> RemoteConfig {
        let mut config = RemoteConfig::new(&self.base_url)
            .with_extension(&self.extension)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_locales(self.locales.iter().cloned())
            .with_retry(RetryConfig::new(self.max_retries));
        config.headers = self.headers.clone();
        config
    }
}

/// Persistent cache backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local, lost on exit
    Memory,
    /// One JSON file per locale under `dir`
    #[default]
    File,
    /// Shared Redis instance at `redis_url`
    Redis,
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Redis => "redis",
        };
        f.write_str(name)
    }
}

impl FromStr for CacheBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "redis" => Ok(Self::Redis),
            other => Err(Error::config(format!("unknown cache backend '{other}'"))),
        }
    }
}

/// Offline cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Wrap the remote source with the caching decorator
    pub enabled: bool,

    /// Freshness window in milliseconds
    pub ttl_ms: u64,

    /// Storage key prefix
    pub key_prefix: String,

    /// Storage backend
    pub backend: CacheBackend,

    /// Directory for the file backend
    pub dir: Option<PathBuf>,

    /// Connection URL for the redis backend
    pub redis_url: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_ms: 3_600_000,
            key_prefix: String::from(crate::source::caching::DEFAULT_KEY_PREFIX),
            backend: CacheBackend::File,
            dir: Some(PathBuf::from(".cache/tercume")),
            redis_url: None,
        }
    }
}

impl CacheConfig {
    /// Freshness window as Duration
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Open the configured storage backend
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` when the backend's location is missing
    /// and `Error::Storage` when Redis cannot be reached.
    pub async fn open_storage(&self) -> Result<Arc<dyn CacheStorage>> {
        match self.backend {
            CacheBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
            CacheBackend::File => {
                let dir = self
                    .dir
                    .as_ref()
                    .ok_or_else(|| Error::config("file cache backend requires cache.dir"))?;
                Ok(Arc::new(FileStorage::new(dir)))
            }
            CacheBackend::Redis => {
                let url = self
                    .redis_url
                    .as_ref()
                    .ok_or_else(|| Error::config("redis cache backend requires cache.redis_url"))?;
                let storage = RedisStorage::new(&RedisStorageConfig {
                    url: url.clone(),
                    ..Default::default()
                })
                .await?;
                Ok(Arc::new(storage))
            }
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// Accepted values for `logging.level`
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl LoggingConfig {
    /// `EnvFilter` directive for this configuration
    ///
    /// `verbose` raises this crate to debug and other crates to info,
    /// whatever the configured level.
    pub fn filter_directive(&self, verbose: bool) -> String {
        if verbose {
            String::from("tercume=debug,info")
        } else {
            format!("tercume={},warn", self.level.to_ascii_lowercase())
        }
    }

    /// Output format, with `flag` taking precedence over the configured one
    pub fn format_or<'a>(&'a self, flag: Option<&'a str>) -> &'a str {
        flag.unwrap_or(&self.format)
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let locale = std::env::var("TERCUME_LOCALE").unwrap_or(defaults.i18n.locale);

        let fallback_locale = std::env::var("TERCUME_FALLBACK_LOCALE")
            .unwrap_or(defaults.i18n.fallback_locale);

        let messages_dir = std::env::var("TERCUME_MESSAGES_DIR").ok().map(PathBuf::from);

        let remote = std::env::var("TERCUME_REMOTE_URL")
            .ok()
            .map(RemoteSettings::new);

        let ttl_ms = std::env::var("TERCUME_CACHE_TTL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.cache.ttl_ms);

        let backend = match std::env::var("TERCUME_CACHE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.cache.backend,
        };

        let dir = std::env::var("TERCUME_CACHE_DIR")
            .ok()
            .map(PathBuf::from)
            .or(defaults.cache.dir);

        let redis_url = std::env::var("REDIS_URL").ok();

        let level =
            std::env::var("TERCUME_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));

        let format =
            std::env::var("TERCUME_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            i18n: I18nConfig {
                locale,
                fallback_locale,
                template_cache_capacity: defaults.i18n.template_cache_capacity,
                messages_dir,
            },
            remote,
            cache: CacheConfig {
                ttl_ms,
                backend,
                dir,
                redis_url,
                ..defaults.cache
            },
            logging: LoggingConfig { level, format },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        Self::from_toml(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse TOML config file {}: {e}",
                path.display()
            ))
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(e.to_string()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.i18n.locale.trim().is_empty() {
            return Err(Error::config("i18n.locale must not be empty"));
        }

        if self.i18n.fallback_locale.trim().is_empty() {
            return Err(Error::config("i18n.fallback_locale must not be empty"));
        }

        if self.i18n.template_cache_capacity == 0 {
            return Err(Error::config(
                "template_cache_capacity must be greater than 0",
            ));
        }

        if let Some(remote) = &self.remote {
            url::Url::parse(&remote.base_url).map_err(|e| {
                Error::config(format!("invalid remote.base_url '{}': {e}", remote.base_url))
            })?;
        }

        match self.cache.backend {
            CacheBackend::File if self.cache.dir.is_none() => {
                return Err(Error::config("file cache backend requires cache.dir"));
            }
            CacheBackend::Redis if self.cache.redis_url.is_none() => {
                return Err(Error::config("redis cache backend requires cache.redis_url"));
            }
            _ => {}
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid logging.level '{}', expected one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(Error::config(format!(
                "invalid logging.format '{}', expected text or json",
                self.logging.format
            )));
        }

        Ok(())
    }
}
