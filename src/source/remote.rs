//! HTTP message source
//!
//! Fetches `{base_url}/{locale}{extension}` per locale and
//! `{base_url}/{locale}/{namespace}{extension}` per namespace.
//! Status handling:
//! - 404 -> `LocaleUnavailable`
//! - other non-success -> `Source` with the status code
//! - transport and JSON failures -> `Source` without a status
//!
//! Transport errors and 5xx/429 responses are retried with exponential
//! backoff; other failures return immediately.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{MessageSource, NamespaceSource};
use crate::error::{Error, Result};
use crate::messages::Messages;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Default file-extension suffix for remote dictionaries
pub const DEFAULT_EXTENSION: &str = ".json";

/// Reshapes a raw payload into a dictionary; receives the payload and locale
pub type Transform = Arc<dyn Fn(Value, &str) -> Result<Messages> + Send + Sync>;

/// Remote source configuration
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// URL or path prefix, without trailing slash
    pub base_url: String,

    /// Suffix appended to the locale (default: `.json`)
    pub extension: String,

    /// Request timeout
    pub timeout: Duration,

    /// Extra request headers
    pub headers: HashMap<String, String>,

    /// Locales the endpoint is known to serve
    pub locales: Vec<String>,

    /// Retry policy for transient failures
    pub retry: RetryConfig,
}

impl RemoteConfig {
    /// Configuration with defaults for everything but the base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            timeout: Duration::from_secs(10),
            headers: HashMap::new(),
            locales: Vec::new(),
            retry: RetryConfig::default(),
        }
    }

    /// Set the file-extension suffix
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Add a request header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Declare the locales the endpoint serves
    pub fn with_locales<I, S>(mut self, locales: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locales = locales.into_iter().map(Into::into).collect();
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Message source backed by an HTTP endpoint
pub struct RemoteSource {
    client: Client,
    config: RemoteConfig,
    transform: Option<Transform>,
}

impl std::fmt::Debug for RemoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSource")
            .field("config", &self.config)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

impl RemoteSource {
    /// Create a source from configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for invalid headers or if the HTTP
    /// client cannot be created
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::config(format!("invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::config(format!("invalid header value for '{name}': {e}")))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            transform: None,
        })
    }

    /// Reshape every payload with `transform` before use
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value, &str) -> Result<Messages> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// URL requested for `locale`
    pub fn locale_url(&self, locale: &str) -> String {
        format!("{}/{locale}{}", self.config.base_url, self.config.extension)
    }

    /// URL requested for `namespace` under `locale`
    pub fn namespace_url(&self, locale: &str, namespace: &str) -> String {
        format!(
            "{}/{locale}/{namespace}{}",
            self.config.base_url, self.config.extension
        )
    }

    async fn fetch(&self, url: &str, label: &str, locale: &str) -> Result<Messages> {
        with_retry_if(
            &self.config.retry,
            || self.fetch_once(url, label, locale),
            Error::is_recoverable,
        )
        .await
    }

    async fn fetch_once(&self, url: &str, label: &str, locale: &str) -> Result<Messages> {
        tracing::debug!(url = %url, "Fetching messages");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::source_failure(label, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::unavailable(label));
        }
        if !status.is_success() {
            return Err(Error::Source {
                locale: label.to_string(),
                status: Some(status.as_u16()),
                reason: format!("HTTP {status} from {url}"),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::source_failure(label, e))?;
        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| Error::source_failure(label, format!("invalid JSON: {e}")))?;

        match &self.transform {
            Some(transform) => transform(payload, locale),
            None => Messages::from_value(payload).map_err(|e| Error::source_failure(label, e)),
        }
    }
}

#[async_trait]
impl MessageSource for RemoteSource {
    async fn load(&self, locale: &str) -> Result<Messages> {
        let url = self.locale_url(locale);
        self.fetch(&url, locale, locale).await
    }

    /// Membership in the configured locale list; unconfigured lists know nothing
    fn has_locale(&self, locale: &str) -> bool {
        self.config.locales.iter().any(|l| l == locale)
    }

    fn available_locales(&self) -> Vec<String> {
        self.config.locales.clone()
    }
}

#[async_trait]
impl NamespaceSource for RemoteSource {
    async fn load_namespace(&self, locale: &str, namespace: &str) -> Result<Messages> {
        let url = self.namespace_url(locale, namespace);
        let label = format!("{locale}/{namespace}");
        self.fetch(&url, &label, locale).await
    }
}
