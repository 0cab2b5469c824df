//! Unified error handling for the tercume crate
//!
//! Loading operations are the only ones allowed to fail outward. Resolution
//! (`translate`) never returns an error; template failures surface through the
//! error hook only, and an unresolved key is not an error at all.
//!
//! # Architecture
//!
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum covering sources, storage and templates
//!
//! # Usage
//!
//! ```rust,ignore
//! use tercume::error::{Error, ErrorCategory};
//!
//! match i18n.load_locale("tr-TR").await {
//!     Err(Error::LocaleUnavailable { locale }) => tracing::info!(%locale, "no messages"),
//!     Err(e) if e.is_recoverable() => tracing::warn!(error = %e, "retry later"),
//!     Err(e) => return Err(e),
//!     Ok(()) => {}
//! }
//! ```

use thiserror::Error;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Transport errors and unreachable sources
    Network,
    /// Template grammar and payload shape errors
    Parsing,
    /// Persistent cache backend errors
    Storage,
    /// Configuration and wiring errors
    Config,
    /// Expected data conditions (locale not offered by a source)
    Other,
}

impl ErrorCategory {
    /// Short human-readable label for the category
    pub fn label(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the tercume crate
///
/// `Clone` so one failed in-flight load can be handed to every caller
/// awaiting it. Foreign errors are flattened to their message at the boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A source has no data for the requested locale
    #[error("Locale unavailable: {locale}")]
    LocaleUnavailable { locale: String },

    /// Transport or payload failure from a message source
    #[error("Source error for '{locale}': {reason}")]
    Source {
        locale: String,
        status: Option<u16>,
        reason: String,
    },

    /// Template grammar could not be compiled or evaluated
    #[error("Template format error: {reason}")]
    TemplateFormat { template: String, reason: String },

    /// Operation requires a source or option that was not configured
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Persistent cache backend failure
    #[error("Storage error during '{operation}': {reason}")]
    Storage { operation: String, reason: String },

    /// Payload is not shaped like a message dictionary
    #[error("Invalid messages: {reason}")]
    InvalidMessages { reason: String },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a locale-unavailable error
    pub fn unavailable(locale: impl Into<String>) -> Self {
        Self::LocaleUnavailable {
            locale: locale.into(),
        }
    }

    /// Create a source error without an HTTP status
    pub fn source_failure(locale: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Source {
            locale: locale.into(),
            status: None,
            reason: reason.to_string(),
        }
    }

    /// Create a storage error
    pub fn storage(operation: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Storage {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a template error for `template`
    pub fn template(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TemplateFormat {
            template: template.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error is recoverable (can be retried or served stale)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Source { status, .. } => match status {
                Some(code) => *code >= 500 || *code == 429,
                None => true,
            },
            Self::Storage { .. } => true,
            Self::LocaleUnavailable { .. }
            | Self::TemplateFormat { .. }
            | Self::Configuration(_)
            | Self::InvalidMessages { .. } => false,
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Source { .. } => ErrorCategory::Network,
            Self::TemplateFormat { .. } | Self::InvalidMessages { .. } => ErrorCategory::Parsing,
            Self::Storage { .. } => ErrorCategory::Storage,
            Self::Configuration(_) => ErrorCategory::Config,
            Self::LocaleUnavailable { .. } => ErrorCategory::Other,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidMessages {
            reason: err.to_string(),
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
