use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tercume::config::{Config, LoggingConfig, RemoteSettings};
use tercume::format::Params;
use tercume::locale::fallback_chain;
use tercume::messages::Messages;
use tercume::runtime::I18n;
use tercume::source::CacheStorage;

#[derive(Parser)]
#[command(
    name = "tercume",
    version,
    about = "Message resolution and formatting engine for translated UI strings",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables are used otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the current locale
    #[arg(short, long, global = true)]
    locale: Option<String>,

    /// Override the static messages directory
    #[arg(long, global = true)]
    messages_dir: Option<PathBuf>,

    /// Override the remote base URL
    #[arg(long, global = true)]
    remote: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides logging.format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a key in the current locale
    Translate {
        /// Translation key (dotted path)
        key: String,

        /// Parameter as name=value; values parse as JSON when possible
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },

    /// Print the fallback chain for a locale
    Chain {
        /// Requested locale
        #[arg(value_name = "LOCALE")]
        requested: String,

        /// Fallback locale
        fallback: String,
    },

    /// List every key in a message file
    Keys {
        /// JSON dictionary file
        file: PathBuf,
    },

    /// Empty the offline message cache
    ClearCache,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging comes from the configuration even for commands that need nothing else
    let config = load_config(&cli);
    let logging = match &config {
        Ok(config) => config.logging.clone(),
        Err(_) => LoggingConfig::default(),
    };
    setup_tracing(&logging, cli.log_format.as_deref(), cli.verbose)?;

    tracing::debug!("tercume starting");

    match cli.command {
        Commands::Translate { ref key, ref params } => {
            let config = config?;
            tracing::info!(key = %key, params = params.len(), "Starting translate command");
            translate(&config, key, params).await?;
        }

        Commands::Chain {
            ref requested,
            ref fallback,
        } => {
            println!("{}", fallback_chain(requested, fallback).join(" -> "));
        }

        Commands::Keys { ref file } => {
            keys(file)?;
        }

        Commands::ClearCache => {
            let config = config?;
            tracing::info!(backend = %config.cache.backend, "Starting clear-cache command");
            let storage = config.cache.open_storage().await?;
            storage.clear().await?;
            println!("Cache cleared ({})", config.cache.backend);
        }
    }

    Ok(())
}

fn setup_tracing(logging: &LoggingConfig, format: Option<&str>, verbose: bool) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_new(logging.filter_directive(verbose))
        .context("Invalid logging.level")?;

    match logging.format_or(format) {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    if let Some(locale) = &cli.locale {
        config.i18n.locale = locale.clone();
    }
    if let Some(dir) = &cli.messages_dir {
        config.i18n.messages_dir = Some(dir.clone());
    }
    if let Some(url) = &cli.remote {
        config.remote = Some(RemoteSettings::new(url));
    }

    config.validate()?;
    Ok(config)
}

fn parse_param(raw: &str) -> std::result::Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

async fn translate(config: &Config, key: &str, params: &[(String, Value)]) -> Result<()> {
    let i18n = I18n::from_config(config).await?;

    if config.remote.is_some() {
        let failed = i18n.load_fallback_chain().await?;
        if !failed.is_empty() {
            tracing::debug!(locales = ?failed, "Some locales of the chain are unavailable");
        }
    }

    let text = if params.is_empty() {
        i18n.translate(key)
    } else {
        let params: Params = params.iter().cloned().collect();
        i18n.translate_with(key, &params)
    };

    println!("{text}");
    Ok(())
}

fn keys(file: &Path) -> Result<()> {
    let messages = Messages::from_file(file)
        .with_context(|| format!("Failed to read messages from {}", file.display()))?;

    for (key, value) in messages.flatten() {
        println!("{key}\t{value}");
    }
    Ok(())
}
