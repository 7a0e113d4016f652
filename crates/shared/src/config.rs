//! Application configuration management.

use std::collections::HashMap;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger business configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ledger configuration: conversion rate, free-post window and delta overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Percentage applied to deposit/withdraw magnitudes to derive the Funds delta.
    #[serde(default = "default_funds_rate_percent")]
    pub funds_rate_percent: u32,
    /// Free-post allowance window.
    #[serde(default)]
    pub free_posts: FreePostConfig,
    /// Per-operation delta overrides keyed by operation name (e.g. `POST = -10`).
    #[serde(default)]
    pub delta_overrides: HashMap<String, i64>,
}

fn default_funds_rate_percent() -> u32 {
    40
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            funds_rate_percent: default_funds_rate_percent(),
            free_posts: FreePostConfig::default(),
            delta_overrides: HashMap::new(),
        }
    }
}

/// Free-post sliding window settings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FreePostConfig {
    /// Maximum free posts inside one window.
    #[serde(default = "default_free_post_capacity")]
    pub capacity: u32,
    /// Window length in seconds.
    #[serde(default = "default_free_post_window_secs")]
    pub window_secs: i64,
}

fn default_free_post_capacity() -> u32 {
    3
}

fn default_free_post_window_secs() -> i64 {
    86_400 // 24 hours
}

impl Default for FreePostConfig {
    fn default() -> Self {
        Self {
            capacity: default_free_post_capacity(),
            window_secs: default_free_post_window_secs(),
        }
    }
}

/// Logging configuration consumed by the binaries.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "tally=info,tally_db=info,sea_orm=warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("TALLY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
