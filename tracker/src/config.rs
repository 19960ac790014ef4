//! Configuration module for the Simple Analytics tracker.
//!
//! This module handles parsing configuration from environment variables. The
//! library itself can be configured in code through [`crate::Tracker::builder`];
//! this is what the command-line binary uses.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `SIMPLEANALYTICS_HOSTNAME` | Yes | - | Site or app identifier registered with Simple Analytics |
//! | `SIMPLEANALYTICS_SHARED_SCOPE` | No | - | Shared storage scope for the last-visit date |
//! | `SIMPLEANALYTICS_ENDPOINT` | No | `https://queue.simpleanalyticscdn.com/events` | Collection endpoint |
//! | `SIMPLEANALYTICS_STORAGE_DIR` | No | platform data dir | Directory for persisted settings |
//! | `SIMPLEANALYTICS_TIMEOUT_SECS` | No | 30 | HTTP request timeout |
//!
//! # Example
//!
//! ```no_run
//! use simpleanalytics::config::TrackerConfig;
//!
//! let config = TrackerConfig::from_env().expect("Failed to load configuration");
//! println!("Tracking: {}", config.hostname);
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::sender::{TransportConfig, DEFAULT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT_SECS};

const HOSTNAME_VAR: &str = "SIMPLEANALYTICS_HOSTNAME";
const SHARED_SCOPE_VAR: &str = "SIMPLEANALYTICS_SHARED_SCOPE";
const ENDPOINT_VAR: &str = "SIMPLEANALYTICS_ENDPOINT";
const STORAGE_DIR_VAR: &str = "SIMPLEANALYTICS_STORAGE_DIR";
const TIMEOUT_VAR: &str = "SIMPLEANALYTICS_TIMEOUT_SECS";

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Configuration for a tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Site or app identifier events are recorded under.
    pub hostname: String,

    /// Shared storage scope for the last-visit date, if any.
    pub shared_scope: Option<String>,

    /// Collection endpoint URL.
    pub endpoint: String,

    /// Directory for persisted settings. `None` uses the platform data directory.
    pub storage_dir: Option<PathBuf>,

    /// HTTP request timeout.
    pub timeout: Duration,
}

impl TrackerConfig {
    /// Creates a configuration with defaults for everything but the hostname.
    #[must_use]
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            shared_scope: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            storage_dir: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Creates a new `TrackerConfig` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - `SIMPLEANALYTICS_HOSTNAME` is not set or blank
    /// - `SIMPLEANALYTICS_SHARED_SCOPE` is set but blank
    /// - `SIMPLEANALYTICS_TIMEOUT_SECS` is not a positive integer
    pub fn from_env() -> Result<Self, ConfigError> {
        // Required: SIMPLEANALYTICS_HOSTNAME
        let hostname = env::var(HOSTNAME_VAR)
            .map_err(|_| ConfigError::MissingEnvVar(HOSTNAME_VAR.to_string()))?;
        let hostname = hostname.trim().to_string();
        if hostname.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: HOSTNAME_VAR.to_string(),
                message: "hostname cannot be empty".to_string(),
            });
        }

        // Optional: SIMPLEANALYTICS_SHARED_SCOPE (default: process scope)
        let shared_scope = match env::var(SHARED_SCOPE_VAR) {
            Ok(val) if val.trim().is_empty() => {
                return Err(ConfigError::InvalidValue {
                    key: SHARED_SCOPE_VAR.to_string(),
                    message: "shared scope name cannot be empty".to_string(),
                });
            }
            Ok(val) => Some(val.trim().to_string()),
            Err(_) => None,
        };

        // Optional: SIMPLEANALYTICS_ENDPOINT (validated when the transport is built)
        let endpoint = env::var(ENDPOINT_VAR).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        // Optional: SIMPLEANALYTICS_STORAGE_DIR (default: platform data dir)
        let storage_dir = env::var(STORAGE_DIR_VAR).ok().map(PathBuf::from);

        // Optional: SIMPLEANALYTICS_TIMEOUT_SECS (default: 30, must be > 0)
        let timeout_secs = match env::var(TIMEOUT_VAR) {
            Ok(val) => {
                let secs = val.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                    key: TIMEOUT_VAR.to_string(),
                    message: format!("expected positive integer, got '{val}'"),
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: TIMEOUT_VAR.to_string(),
                        message: "timeout must be at least 1 second".to_string(),
                    });
                }
                secs
            }
            Err(_) => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            hostname,
            shared_scope,
            endpoint,
            storage_dir,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Returns the HTTP transport settings.
    #[must_use]
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            endpoint: self.endpoint.clone(),
            timeout: self.timeout,
        }
    }
}
