/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Verwatch Config Module
//! This module provides the configuration framework shared by the verwatch crates.
//!
//! # Variable Naming Convention
//!
//! - Struct fields use snake_case (e.g., `checker`, `log_level`)
//! - Environment variables use SCREAMING_SNAKE_CASE and are prefixed with "VERWATCH__"
//!   (e.g., `VERWATCH__CHECKER__WORKERS`)
//! - Configuration file keys use snake_case (e.g., `checker.workers`, `log.level`)
//!
//! # Configuration Overriding
//!
//! The configuration values are loaded and overridden in the following order (later sources take precedence):
//!
//! 1. Default values from the embedded `default.toml` file
//! 2. Values from an optional external configuration file (if provided)
//! 3. Environment variables
//!
//! # Available Environment Variables
//!
//! - `VERWATCH__LOG__LEVEL`: Sets the log level ("trace", "debug", "info", "warn", "error")
//!   Default: "info"
//!
//! - `VERWATCH__LOG__FORMAT`: "text" or "json"
//!   Default: "text"
//!
//! - `VERWATCH__STORE__PATH`: Path of the record store file
//!   Default: "services.json"
//!
//! - `VERWATCH__CHECKER__WORKERS`: Number of concurrent check jobs
//!   Default: 10
//!
//! - `VERWATCH__GITHUB__TOKEN`: Optional GitHub API token
//!
//! - `VERWATCH__MQTT__HOST`, `VERWATCH__MQTT__USERNAME`, `VERWATCH__MQTT__PASSWORD`:
//!   Message bus used for bridge info topics
//!
//! - `VERWATCH__CREDENTIALS__<SERVICE>__<INSTANCE>`: Per-service secrets, e.g.
//!   `VERWATCH__CREDENTIALS__HOME_ASSISTANT__PROD=<token>`. An entry named `default`
//!   applies to every instance of that service.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

// Include the default settings file as a string constant
const DEFAULT_SETTINGS: &str = include_str!("../default.toml");

/// Lookup key that applies to every instance of a service.
pub const DEFAULT_CREDENTIAL_KEY: &str = "default";

/// Represents the main settings structure for the application
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Logging configuration
    pub log: Log,
    /// Record store location
    pub store: Store,
    /// Check engine tuning
    pub checker: Checker,
    /// Message bus connection
    #[serde(default)]
    pub mqtt: Mqtt,
    /// GitHub API access
    #[serde(default)]
    pub github: Github,
    /// Hypervisor release metadata
    #[serde(default)]
    pub proxmox: Proxmox,
    /// Per-service secrets keyed by service key, then by instance (or `default`)
    #[serde(default)]
    pub credentials: HashMap<String, HashMap<String, String>>,
}

/// Represents the logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Log {
    /// Log level (e.g., "info", "debug", "warn", "error")
    pub level: String,
    /// Log format: "text" for human-readable, "json" for structured JSON
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Represents the record store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Store {
    /// Path to the JSON table holding the service records
    pub path: String,
}

/// Represents the check engine configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Checker {
    /// Size of the worker pool for bulk checks
    pub workers: usize,
    /// Emit a progress marker every N completions
    pub progress_every: usize,
    /// Timeout applied to every HTTP request
    pub http_timeout_secs: u64,
    /// Overall timeout for a remote command
    pub ssh_timeout_secs: u64,
    /// SSH connection establishment timeout
    pub ssh_connect_timeout_secs: u64,
    /// Timeout applied to cluster queries
    pub kube_timeout_secs: u64,
    /// How long to wait for a pub/sub message
    pub mqtt_wait_secs: u64,
    /// User agent sent with upstream HTTP requests
    pub user_agent: String,
}

impl Checker {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn ssh_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh_timeout_secs)
    }

    pub fn kube_timeout(&self) -> Duration {
        Duration::from_secs(self.kube_timeout_secs)
    }

    pub fn mqtt_wait(&self) -> Duration {
        Duration::from_secs(self.mqtt_wait_secs)
    }
}

/// Represents the MQTT broker configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Mqtt {
    /// Broker hostname
    pub host: String,
    /// Broker port
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    /// Optional username
    pub username: Option<String>,
    /// Optional password
    pub password: Option<String>,
}

impl Default for Mqtt {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: default_mqtt_port(),
            username: None,
            password: None,
        }
    }
}

fn default_mqtt_port() -> u16 {
    1883
}

/// Represents the GitHub API configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Github {
    /// API token, sent as `Authorization: token <value>` when set
    pub token: Option<String>,
}

/// Represents hypervisor release metadata
#[derive(Debug, Deserialize, Clone)]
pub struct Proxmox {
    /// Supported Ceph release keyed by hypervisor "major.minor"
    #[serde(default)]
    pub ceph_matrix: HashMap<String, String>,
    /// Refreshed matrix file; configured entries take precedence over it
    #[serde(default = "default_matrix_path")]
    pub matrix_path: String,
}

impl Default for Proxmox {
    fn default() -> Self {
        Self {
            ceph_matrix: HashMap::new(),
            matrix_path: default_matrix_path(),
        }
    }
}

fn default_matrix_path() -> String {
    "proxmox_ceph_compatibility.json".to_string()
}

impl Settings {
    /// Creates a new `Settings` instance
    ///
    /// # Arguments
    ///
    /// * `file` - An optional path to a configuration file
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing the `Settings` instance or a `ConfigError`
    pub fn new(file: Option<String>) -> Result<Self, ConfigError> {
        let mut s = Config::builder()
            .add_source(File::from_str(DEFAULT_SETTINGS, config::FileFormat::Toml));

        s = match file {
            Some(x) => s.add_source(File::with_name(x.as_str())),
            None => s,
        };

        // Environment variables, prefixed with "VERWATCH" and using "__" as a separator
        s = s.add_source(Environment::with_prefix("VERWATCH").separator("__"));

        s.build()?.try_deserialize()
    }

    /// Looks up a secret for `service_key`, trying `lookup_key` first and then the
    /// service-wide `default` entry.
    ///
    /// Keys are compared in lowercase since environment overrides arrive lowercased.
    pub fn credential(&self, service_key: &str, lookup_key: &str) -> Option<&str> {
        let entries = self.credentials.get(&service_key.to_lowercase())?;
        entries
            .get(&lookup_key.to_lowercase())
            .or_else(|| entries.get(DEFAULT_CREDENTIAL_KEY))
            .map(String::as_str)
            .filter(|secret| !secret.trim().is_empty())
    }
}
