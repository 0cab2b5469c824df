//! Runtime instance
//!
//! [`I18n`] ties the pieces together: it holds the current and fallback
//! locale, owns the message store and compiled-template cache, resolves
//! `translate` calls against the fallback chain and drives locale and
//! namespace loading from the configured sources.
//!
//! Resolution never fails. An unresolved key renders as the key itself and
//! a malformed template renders as its raw text; both are reported through
//! hooks rather than errors. Only loading returns `Result`.
//!
//! # Example
//!
//! ```
//! use tercume::format::Params;
//! use tercume::messages::Messages;
//! use tercume::runtime::I18n;
//!
//! let i18n = I18n::builder("en", "en")
//!     .messages("en", Messages::new().with("greeting", "Hello {name}!"))
//!     .build();
//!
//! let params = Params::new().with("name", "Ann");
//! assert_eq!(i18n.translate_with("greeting", &params), "Hello Ann!");
//! assert_eq!(i18n.translate("missing.key"), "missing.key");
//! ```

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::hash::Hash;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::format::{interpolate, is_template, Params, TemplateFormatter};
use crate::locale::{fallback_chain, normalize_locale};
use crate::messages::Messages;
use crate::source::{
    CachingSource, CachingSourceConfig, MessageSource, NamespaceSource, RemoteSource,
    StaticNamespaceSource,
};
use crate::store::MessageStore;
use crate::utils::truncate_text;

/// Called with `(key, locale)` when no locale in the chain resolves a key
pub type MissingKeyHook = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Called with `(locale or locale/namespace, duration)` after a load completes
pub type LoadHook = Arc<dyn Fn(&str, Duration) + Send + Sync>;

/// Called with `(error, context)` for template and load failures
pub type ErrorHook = Arc<dyn Fn(&Error, &str) + Send + Sync>;

/// Optional observers of runtime events
#[derive(Clone, Default)]
pub struct Hooks {
    pub on_missing_key: Option<MissingKeyHook>,
    pub on_load: Option<LoadHook>,
    pub on_error: Option<ErrorHook>,
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("on_missing_key", &self.on_missing_key.is_some())
            .field("on_load", &self.on_load.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl Hooks {
    fn missing_key(&self, key: &str, locale: &str) {
        if let Some(hook) = &self.on_missing_key {
            hook(key, locale);
        }
    }

    fn loaded(&self, tag: &str, elapsed: Duration) {
        if let Some(hook) = &self.on_load {
            hook(tag, elapsed);
        }
    }

    fn error(&self, error: &Error, context: &str) {
        if let Some(hook) = &self.on_error {
            hook(error, context);
        }
    }
}

/// A load shared by every concurrent caller asking for the same key
type PendingLoad = Shared<BoxFuture<'static, Result<Messages>>>;

type PendingMap<K> = Mutex<HashMap<K, PendingLoad>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`I18n`]
pub struct I18nBuilder {
    locale: String,
    fallback: String,
    messages: HashMap<String, Messages>,
    source: Option<Arc<dyn MessageSource>>,
    namespace_source: Option<Arc<dyn NamespaceSource>>,
    template_cache_capacity: usize,
    hooks: Hooks,
}

impl I18nBuilder {
    /// Seed `locale` with a static dictionary
    pub fn messages(mut self, locale: &str, messages: Messages) -> Self {
        self.messages.insert(normalize_locale(locale), messages);
        self
    }

    /// Source used by `load_locale`
    pub fn source(mut self, source: impl MessageSource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Source used by `load_namespace`
    pub fn namespace_source(mut self, source: impl NamespaceSource + 'static) -> Self {
        self.namespace_source = Some(Arc::new(source));
        self
    }

    /// Maximum number of compiled templates kept by this instance
    pub fn template_cache_capacity(mut self, capacity: usize) -> Self {
        self.template_cache_capacity = capacity;
        self
    }

    /// Observe unresolved keys
    pub fn on_missing_key<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.hooks.on_missing_key = Some(Arc::new(hook));
        self
    }

    /// Observe completed loads
    pub fn on_load<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, Duration) + Send + Sync + 'static,
    {
        self.hooks.on_load = Some(Arc::new(hook));
        self
    }

    /// Observe template and load failures
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Error, &str) + Send + Sync + 'static,
    {
        self.hooks.on_error = Some(Arc::new(hook));
        self
    }

    /// Create the instance
    pub fn build(self) -> I18n {
        I18n {
            locale: RwLock::new(self.locale),
            fallback: self.fallback,
            store: RwLock::new(MessageStore::with_messages(self.messages)),
            formatter: TemplateFormatter::new(self.template_cache_capacity),
            source: self.source,
            namespace_source: self.namespace_source,
            hooks: self.hooks,
            pending_locales: Mutex::new(HashMap::new()),
            pending_namespaces: Mutex::new(HashMap::new()),
        }
    }
}

// ============================================================================
// Runtime instance
// ============================================================================

/// Translation runtime owning its store, formatter cache and sources
pub struct I18n {
    locale: RwLock<String>,
    fallback: String,
    store: RwLock<MessageStore>,
    formatter: TemplateFormatter,
    source: Option<Arc<dyn MessageSource>>,
    namespace_source: Option<Arc<dyn NamespaceSource>>,
    hooks: Hooks,
    pending_locales: PendingMap<String>,
    pending_namespaces: PendingMap<(String, String)>,
}

impl std::fmt::Debug for I18n {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("I18n")
            .field("locale", &self.locale())
            .field("fallback", &self.fallback)
            .field("source", &self.source.is_some())
            .field("namespace_source", &self.namespace_source.is_some())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl I18n {
    /// Start building an instance for `locale` falling back to `fallback`
    pub fn builder(locale: &str, fallback: &str) -> I18nBuilder {
        I18nBuilder {
            locale: normalize_locale(locale),
            fallback: normalize_locale(fallback),
            messages: HashMap::new(),
            source: None,
            namespace_source: None,
            template_cache_capacity: crate::format::cache::DEFAULT_CAPACITY,
            hooks: Hooks::default(),
        }
    }

    /// Wire an instance from configuration
    ///
    /// Static dictionaries come from `i18n.messages_dir`. A `[remote]`
    /// section installs the remote source, wrapped in the caching decorator
    /// when `cache.enabled` is set; the remote endpoint also serves
    /// namespaces. Without a remote, namespaces are read from
    /// `{messages_dir}/{locale}/{namespace}.json`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for invalid settings and propagates
    /// read failures for the messages directory and cache backend.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let mut builder = Self::builder(&config.i18n.locale, &config.i18n.fallback_locale)
            .template_cache_capacity(config.i18n.template_cache_capacity);

        if let Some(dir) = &config.i18n.messages_dir {
            let (locales, namespaces) = read_messages_dir(dir)?;
            for (locale, messages) in locales {
                builder = builder.messages(&locale, messages);
            }
            if config.remote.is_none() {
                builder = builder.namespace_source(namespaces);
            }
        }

        if let Some(remote) = &config.remote {
            let source = Arc::new(RemoteSource::new(remote.to_source_config())?);
            builder = builder.namespace_source(Arc::clone(&source));

            if config.cache.enabled {
                let storage = config.cache.open_storage().await?;
                let caching = CachingSource::with_config(
                    source,
                    storage,
                    CachingSourceConfig {
                        ttl: config.cache.ttl(),
                        key_prefix: config.cache.key_prefix.clone(),
                    },
                );
                builder = builder.source(caching);
            } else {
                builder = builder.source(source);
            }
        }

        tracing::info!(
            locale = %config.i18n.locale,
            fallback = %config.i18n.fallback_locale,
            remote = config.remote.is_some(),
            "I18n runtime configured"
        );

        Ok(builder.build())
    }

    // ------------------------------------------------------------------------
    // Locale state
    // ------------------------------------------------------------------------

    /// Current locale
    pub fn locale(&self) -> String {
        self.locale
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fallback locale
    pub fn fallback_locale(&self) -> &str {
        &self.fallback
    }

    /// Switch the current locale without loading anything
    pub fn set_locale(&self, locale: &str) {
        let locale = normalize_locale(locale);
        tracing::debug!(locale = %locale, "Current locale changed");
        *self.locale.write().unwrap_or_else(PoisonError::into_inner) = locale;
    }

    /// Load `locale` if a source is configured and it is not loaded, then switch to it
    ///
    /// The current locale is left unchanged when the load fails.
    pub async fn change_locale(&self, locale: &str) -> Result<()> {
        let locale = normalize_locale(locale);
        if self.source.is_some() && !self.is_locale_loaded(&locale) {
            self.load_locale(&locale).await?;
        }
        self.set_locale(&locale);
        Ok(())
    }

    /// Check if the main dictionary for `locale` has been seeded or loaded
    ///
    /// Namespaces merged into a locale do not make it loaded.
    pub fn is_locale_loaded(&self, locale: &str) -> bool {
        self.read_store().has_locale(&normalize_locale(locale))
    }

    /// Check if `namespace` has been merged into the current locale
    pub fn is_namespace_loaded(&self, namespace: &str) -> bool {
        self.read_store().has_namespace(&self.locale(), namespace)
    }

    /// Copy of every loaded dictionary
    pub fn messages(&self) -> HashMap<String, Messages> {
        self.read_store().snapshot()
    }

    /// Template formatter owned by this instance
    pub fn formatter(&self) -> &TemplateFormatter {
        &self.formatter
    }

    fn read_store(&self) -> RwLockReadGuard<'_, MessageStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------------
    // Translation
    // ------------------------------------------------------------------------

    /// Resolve `key` without parameters
    pub fn translate(&self, key: &str) -> String {
        self.resolve(key, None)
    }

    /// Resolve `key` and substitute `params`
    pub fn translate_with(&self, key: &str, params: &Params) -> String {
        self.resolve(key, Some(params))
    }

    fn resolve(&self, key: &str, params: Option<&Params>) -> String {
        let current = self.locale();
        let chain = fallback_chain(&current, &self.fallback);

        let found = self
            .read_store()
            .resolve(&chain, key)
            .map(|(locale, message)| (locale.to_string(), message.to_string()));

        let Some((locale, message)) = found else {
            tracing::debug!(key = %key, locale = %current, "Missing translation");
            self.hooks.missing_key(key, &current);
            return key.to_string();
        };

        match params {
            None => message,
            Some(params) if is_template(&message) => {
                match self.formatter.try_format(&message, &locale, params) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(
                            key = %key,
                            locale = %locale,
                            template = %truncate_text(&message, 80),
                            error = %e,
                            "Template formatting failed, using raw text"
                        );
                        self.hooks.error(&e, key);
                        message
                    }
                }
            }
            Some(params) => interpolate(&message, params),
        }
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Load `locale` from the configured source, replacing its dictionary
    ///
    /// Concurrent calls for the same locale share a single source request.
    ///
    /// # Errors
    ///
    /// `Error::Configuration` when no source is configured; otherwise the
    /// source's error.
    pub async fn load_locale(&self, locale: &str) -> Result<()> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| Error::config("load_locale requires a message source"))?;
        let locale = normalize_locale(locale);
        let started = Instant::now();

        let key = locale.clone();
        let Some((result, settled)) = deduplicated(
            &self.pending_locales,
            locale.clone(),
            || false,
            move || async move { source.load(&key).await }.boxed(),
            |messages| {
                self.store
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .set_locale(&locale, messages);
            },
        )
        .await
        else {
            return Ok(());
        };

        self.finish_load(&locale, started, settled, result)
    }

    /// Load every locale of the current fallback chain from the source
    ///
    /// A failing locale does not stop the rest of the chain; its error is
    /// reported through the error hook and its code is returned.
    ///
    /// # Errors
    ///
    /// `Error::Configuration` when no source is configured.
    pub async fn load_fallback_chain(&self) -> Result<Vec<String>> {
        if self.source.is_none() {
            return Err(Error::config("load_fallback_chain requires a message source"));
        }

        let mut failed = Vec::new();
        for locale in fallback_chain(&self.locale(), &self.fallback) {
            if self.load_locale(&locale).await.is_err() {
                failed.push(locale);
            }
        }
        Ok(failed)
    }

    /// Merge `namespace` into the current locale, once per (locale, namespace)
    ///
    /// A namespace already merged into the current locale is a no-op that
    /// does not touch the namespace source.
    ///
    /// # Errors
    ///
    /// `Error::Configuration` when no namespace source is configured;
    /// otherwise the source's error.
    pub async fn load_namespace(&self, namespace: &str) -> Result<()> {
        let source = self
            .namespace_source
            .clone()
            .ok_or_else(|| Error::config("load_namespace requires a namespace source"))?;
        let locale = self.locale();

        if self.read_store().has_namespace(&locale, namespace) {
            tracing::debug!(locale = %locale, namespace = %namespace, "Namespace already loaded");
            return Ok(());
        }

        let started = Instant::now();
        let tag = format!("{locale}/{namespace}");
        let (fetch_locale, fetch_ns) = (locale.clone(), namespace.to_string());

        let Some((result, settled)) = deduplicated(
            &self.pending_namespaces,
            (locale.clone(), namespace.to_string()),
            || self.read_store().has_namespace(&locale, namespace),
            move || async move { source.load_namespace(&fetch_locale, &fetch_ns).await }.boxed(),
            |fragment| {
                self.store
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .merge_namespace(&locale, namespace, fragment);
            },
        )
        .await
        else {
            tracing::debug!(locale = %locale, namespace = %namespace, "Namespace loaded meanwhile");
            return Ok(());
        };

        self.finish_load(&tag, started, settled, result)
    }

    fn finish_load(
        &self,
        tag: &str,
        started: Instant,
        settled: bool,
        result: Result<Messages>,
    ) -> Result<()> {
        match result {
            Ok(_) => {
                if settled {
                    let elapsed = started.elapsed();
                    tracing::info!(
                        tag = %tag,
                        duration_ms = elapsed.as_millis() as u64,
                        "Messages loaded"
                    );
                    self.hooks.loaded(tag, elapsed);
                }
                Ok(())
            }
            Err(e) => {
                if settled {
                    tracing::warn!(tag = %tag, error = %e, "Failed to load messages");
                    self.hooks.error(&e, tag);
                }
                Err(e)
            }
        }
    }
}

/// Run a load at most once per key among concurrent callers
///
/// The first caller to observe the finished load removes the pending entry
/// and applies `commit` while still holding the map, so every caller returns
/// only after the store reflects the result. `done` is checked under the
/// same lock; when it reports the work already committed no load starts and
/// `None` is returned. Otherwise returns the load result and whether this
/// caller was the one that settled it.
async fn deduplicated<K, D, S, C>(
    pending: &PendingMap<K>,
    key: K,
    done: D,
    start: S,
    commit: C,
) -> Option<(Result<Messages>, bool)>
where
    K: Hash + Eq + Clone,
    D: FnOnce() -> bool,
    S: FnOnce() -> BoxFuture<'static, Result<Messages>>,
    C: FnOnce(Messages),
{
    let load = {
        let mut map = lock(pending);
        if !map.contains_key(&key) && done() {
            return None;
        }
        map.entry(key.clone())
            .or_insert_with(|| start().shared())
            .clone()
    };

    let result = load.clone().await;

    let mut map = lock(pending);
    let settled = map.get(&key).is_some_and(|entry| entry.ptr_eq(&load));
    if settled {
        map.remove(&key);
        if let Ok(messages) = &result {
            commit(messages.clone());
        }
    }
    drop(map);

    Some((result, settled))
}

/// Read `{locale}.json` dictionaries and `{locale}/{namespace}.json` fragments
fn read_messages_dir(dir: &Path) -> Result<(Vec<(String, Messages)>, StaticNamespaceSource)> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        Error::config(format!("Failed to read messages dir {}: {e}", dir.display()))
    })?;

    let mut locales = Vec::new();
    let mut namespaces = StaticNamespaceSource::new();

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };

        if path.is_dir() {
            let Ok(fragments) = std::fs::read_dir(&path) else {
                continue;
            };
            for fragment in fragments.flatten() {
                let fragment_path = fragment.path();
                if !is_json(&fragment_path) {
                    continue;
                }
                if let Some(ns) = fragment_path.file_stem().and_then(|s| s.to_str()) {
                    let messages = Messages::from_file(&fragment_path)?;
                    namespaces = namespaces.with_namespace(normalize_locale(&stem), ns, messages);
                }
            }
        } else if is_json(&path) {
            tracing::debug!(path = %path.display(), "Reading static messages");
            locales.push((stem, Messages::from_file(&path)?));
        }
    }

    Ok((locales, namespaces))
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}
