//! Offline-first caching decorator
//!
//! Wraps any [`MessageSource`] with a persistent [`CacheStorage`]:
//!
//! 1. A fresh cached entry is served without consulting the inner source.
//! 2. Otherwise the inner source is asked; success is persisted.
//! 3. If the inner source fails, any cached entry (however old) is served.
//!
//! Storage failures never fail a load; they are logged and the
//! decorator behaves as if the entry were missing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::storage::{CacheStorage, CachedMessages};
use super::MessageSource;
use crate::error::Result;
use crate::messages::Messages;

/// Default freshness window (1 hour)
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Default storage key prefix
pub const DEFAULT_KEY_PREFIX: &str = "tercume_messages_";

/// Caching decorator configuration
#[derive(Debug, Clone)]
pub struct CachingSourceConfig {
    /// Entries younger than this are served without a fetch
    pub ttl: Duration,

    /// Prefix prepended to the locale to form the storage key
    pub key_prefix: String,
}

impl Default for CachingSourceConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl CachingSourceConfig {
    /// Configuration with a custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Default::default()
        }
    }
}

/// Message source decorator with TTL and stale fallback
pub struct CachingSource<S> {
    inner: S,
    storage: Arc<dyn CacheStorage>,
    config: CachingSourceConfig,
    served: Mutex<HashSet<String>>,
}

impl<S> std::fmt::Debug for CachingSource<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingSource")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: MessageSource> CachingSource<S> {
    /// Wrap `inner` with the default configuration
    pub fn new(inner: S, storage: impl CacheStorage + 'static) -> Self {
        Self::with_config(inner, Arc::new(storage), CachingSourceConfig::default())
    }

    /// Wrap `inner` with a shared storage and explicit configuration
    pub fn with_config(
        inner: S,
        storage: Arc<dyn CacheStorage>,
        config: CachingSourceConfig,
    ) -> Self {
        Self {
            inner,
            storage,
            config,
            served: Mutex::new(HashSet::new()),
        }
    }

    /// Wrapped source
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Storage key for `locale`
    pub fn cache_key(&self, locale: &str) -> String {
        format!("{}{locale}", self.config.key_prefix)
    }

    /// Drop every persisted entry
    pub async fn clear_cache(&self) -> Result<()> {
        self.storage.clear().await?;
        self.served
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        tracing::info!("Message cache cleared");
        Ok(())
    }

    async fn read_cached(&self, key: &str) -> Option<CachedMessages> {
        match self.storage.get(key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    fn mark_served(&self, locale: &str) {
        self.served
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(locale.to_string());
    }
}

#[async_trait]
impl<S: MessageSource> MessageSource for CachingSource<S> {
    async fn load(&self, locale: &str) -> Result<Messages> {
        let key = self.cache_key(locale);
        let cached = self.read_cached(&key).await;

        if let Some(entry) = &cached {
            if entry.is_fresh(self.config.ttl) {
                tracing::debug!(locale = %locale, age_ms = entry.age().as_millis(), "Cache hit");
                self.mark_served(locale);
                return Ok(entry.messages.clone());
            }
        }
        tracing::debug!(locale = %locale, stale = cached.is_some(), "Cache miss");

        match self.inner.load(locale).await {
            Ok(messages) => {
                let entry = CachedMessages::new(messages.clone());
                if let Err(e) = self.storage.set(&key, &entry).await {
                    tracing::warn!(key = %key, error = %e, "Failed to persist messages");
                }
                self.mark_served(locale);
                Ok(messages)
            }
            Err(e) => match cached {
                Some(stale) => {
                    tracing::warn!(
                        locale = %locale,
                        age_ms = stale.age().as_millis(),
                        error = %e,
                        "Source failed, serving stale cached messages"
                    );
                    self.mark_served(locale);
                    Ok(stale.messages)
                }
                None => Err(e),
            },
        }
    }

    fn has_locale(&self, locale: &str) -> bool {
        let served = self
            .served
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(locale);
        served || self.inner.has_locale(locale)
    }

    fn available_locales(&self) -> Vec<String> {
        self.inner.available_locales()
    }
}
