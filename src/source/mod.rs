//! Message sources
//!
//! A source supplies the dictionary for a locale on demand. Variants:
//!
//! - [`StaticSource`] - fixed in-memory dictionaries
//! - [`RemoteSource`] - one HTTP request per locale to `base/{locale}.ext`
//! - [`CachingSource`] - offline-first decorator over any other source
//!
//! Namespace-scoped fragments come from a [`NamespaceSource`].
//!
//! # Example
//!
//! ```rust,ignore
//! use tercume::source::{CachingSource, FileStorage, RemoteConfig, RemoteSource};
//!
//! let remote = RemoteSource::new(RemoteConfig::new("https://cdn.example.com/i18n"))?;
//! let cached = CachingSource::new(remote, FileStorage::new("./cache/messages"));
//!
//! let messages = cached.load("tr-TR").await?;
//! ```

pub mod caching;
pub mod remote;
pub mod storage;

pub use caching::{CachingSource, CachingSourceConfig};
pub use remote::{RemoteConfig, RemoteSource};
pub use storage::{
    CacheStorage, CachedMessages, FileStorage, MemoryStorage, RedisStorage, RedisStorageConfig,
};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::messages::Messages;

/// Supplier of a dictionary per locale
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Load the dictionary for `locale`
    ///
    /// Fails with [`Error::LocaleUnavailable`] when the source has no data
    /// for the locale.
    async fn load(&self, locale: &str) -> Result<Messages>;

    /// Best-effort check whether `locale` is offered; never loads
    fn has_locale(&self, locale: &str) -> bool;

    /// Locales this source is known to offer
    fn available_locales(&self) -> Vec<String>;
}

/// Supplier of namespace-scoped fragments
#[async_trait]
pub trait NamespaceSource: Send + Sync {
    /// Load the `namespace` fragment for `locale`
    async fn load_namespace(&self, locale: &str, namespace: &str) -> Result<Messages>;
}

#[async_trait]
impl<T: MessageSource + ?Sized> MessageSource for Arc<T> {
    async fn load(&self, locale: &str) -> Result<Messages> {
        (**self).load(locale).await
    }

    fn has_locale(&self, locale: &str) -> bool {
        (**self).has_locale(locale)
    }

    fn available_locales(&self) -> Vec<String> {
        (**self).available_locales()
    }
}

#[async_trait]
impl<T: NamespaceSource + ?Sized> NamespaceSource for Arc<T> {
    async fn load_namespace(&self, locale: &str, namespace: &str) -> Result<Messages> {
        (**self).load_namespace(locale, namespace).await
    }
}

// ============================================================================
// Static sources
// ============================================================================

/// Fixed in-memory dictionaries
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    locales: HashMap<String, Messages>,
}

impl StaticSource {
    /// Wrap a locale-to-dictionary map
    pub fn new(locales: HashMap<String, Messages>) -> Self {
        Self { locales }
    }

    /// Builder-style insert
    pub fn with_locale(mut self, locale: impl Into<String>, messages: Messages) -> Self {
        self.locales.insert(locale.into(), messages);
        self
    }
}

#[async_trait]
impl MessageSource for StaticSource {
    async fn load(&self, locale: &str) -> Result<Messages> {
        self.locales
            .get(locale)
            .cloned()
            .ok_or_else(|| Error::unavailable(locale))
    }

    fn has_locale(&self, locale: &str) -> bool {
        self.locales.contains_key(locale)
    }

    fn available_locales(&self) -> Vec<String> {
        let mut locales: Vec<String> = self.locales.keys().cloned().collect();
        locales.sort();
        locales
    }
}

/// Fixed in-memory namespace fragments keyed by `(locale, namespace)`
#[derive(Debug, Clone, Default)]
pub struct StaticNamespaceSource {
    fragments: HashMap<(String, String), Messages>,
}

impl StaticNamespaceSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with_namespace(
        mut self,
        locale: impl Into<String>,
        namespace: impl Into<String>,
        messages: Messages,
    ) -> Self {
        self.fragments
            .insert((locale.into(), namespace.into()), messages);
        self
    }
}

#[async_trait]
impl NamespaceSource for StaticNamespaceSource {
    async fn load_namespace(&self, locale: &str, namespace: &str) -> Result<Messages> {
        self.fragments
            .get(&(locale.to_string(), namespace.to_string()))
            .cloned()
            .ok_or_else(|| Error::unavailable(format!("{locale}/{namespace}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dict(value: serde_json::Value) -> Messages {
        Messages::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticSource::default()
            .with_locale("tr", dict(json!({"hello": "Merhaba"})))
            .with_locale("en", dict(json!({"hello": "Hello"})));

        assert_eq!(source.load("tr").await.unwrap().find("hello"), Some("Merhaba"));
        assert_eq!(source.load("de").await, Err(Error::unavailable("de")));
        assert!(source.has_locale("en"));
        assert!(!source.has_locale("de"));
        assert_eq!(source.available_locales(), vec!["en", "tr"]);
    }

    #[tokio::test]
    async fn test_static_namespace_source() {
        let source = StaticNamespaceSource::new().with_namespace(
            "en",
            "admin",
            dict(json!({"title": "Admin"})),
        );

        let fragment = source.load_namespace("en", "admin").await.unwrap();
        assert_eq!(fragment.find("title"), Some("Admin"));
        assert!(matches!(
            source.load_namespace("tr", "admin").await,
            Err(Error::LocaleUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_arc_source_delegates() {
        let source: Arc<dyn MessageSource> =
            Arc::new(StaticSource::default().with_locale("en", Messages::new()));
        assert!(source.has_locale("en"));
        assert!(source.load("en").await.is_ok());
    }
}
