//! tercume - message resolution and formatting engine
//!
//! Resolves a translation key, a locale and a set of parameters into display
//! text. Supports runtime locale switching, lazily loaded locales and
//! namespaces, and plural/select message grammar.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`locale`] - Fallback chains and locale normalization
//! - [`messages`] - Message dictionaries and key-path lookup
//! - [`store`] - Per-instance dictionaries and loaded namespaces
//! - [`format`] - Placeholder interpolation and plural/select templates
//! - [`source`] - Static, remote and offline-caching message sources
//! - [`runtime`] - The [`I18n`] instance tying everything together
//! - [`config`] - Configuration management and settings
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use tercume::config::Config;
//! use tercume::runtime::I18n;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let i18n = I18n::from_config(&config).await?;
//!     i18n.load_locale(&i18n.locale()).await?;
//!     println!("{}", i18n.translate("nav.home"));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod locale;
pub mod messages;
pub mod runtime;
pub mod source;
pub mod store;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::format::{Params, TemplateFormatter};
    pub use crate::messages::Messages;
    pub use crate::runtime::{I18n, I18nBuilder};
    pub use crate::source::{
        CachingSource, MessageSource, NamespaceSource, RemoteConfig, RemoteSource, StaticSource,
    };
}

// Direct re-exports for convenience
pub use format::Params;
pub use messages::Messages;
pub use runtime::I18n;
