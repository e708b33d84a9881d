//! Layered server configuration: TOML file, then environment overrides.

use courier_workflow::WorkflowConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the configured auth token.
pub const AUTH_TOKEN_ENV: &str = "COURIER_AUTH_TOKEN";

/// Configuration load errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("config file {path} unreadable: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML
    #[error("config file {path} invalid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Workflow timing knobs exposed in the config file; everything not listed
/// here keeps its built-in default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSection {
    pub attempt_budget: u32,
    #[serde(with = "humantime_serde")]
    pub readiness_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub verify_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Queue-level deadline before a run is considered stalled
    #[serde(with = "humantime_serde")]
    pub lease: Duration,
}

impl Default for WorkerSection {
    fn default() -> Self {
        let defaults = WorkflowConfig::default();
        Self {
            attempt_budget: defaults.attempt_budget,
            readiness_timeout: defaults.readiness_timeout,
            verify_timeout: defaults.verify_timeout,
            poll_interval: defaults.poll_interval,
            lease: Duration::from_secs(30 * 60),
        }
    }
}

/// The concrete browser transport to launch sessions against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    /// Only "webdriver" is supported
    pub kind: String,
    /// WebDriver endpoint
    pub endpoint: String,
    /// Browser name requested in capabilities
    pub browser: String,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            kind: "webdriver".to_string(),
            endpoint: "http://127.0.0.1:4444".to_string(),
            browser: "chrome".to_string(),
        }
    }
}

/// Full server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Bearer token for the run routes; must be non-empty at startup
    pub auth_token: String,
    /// Credential artifact produced by the interactive login helper
    pub storage_state_path: PathBuf,
    /// Root directory for failure evidence
    pub evidence_dir: PathBuf,
    /// Retention for terminal runs
    #[serde(with = "humantime_serde")]
    pub run_ttl: Duration,
    pub worker: WorkerSection,
    pub backend: BackendSection,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8750".parse().unwrap_or_else(|_| {
                unreachable!("static default listen address parses")
            }),
            auth_token: String::new(),
            storage_state_path: PathBuf::from("storage-state.json"),
            evidence_dir: PathBuf::from("evidence"),
            run_ttl: Duration::from_secs(24 * 60 * 60),
            worker: WorkerSection::default(),
            backend: BackendSection::default(),
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file; `None` yields the built-in defaults.
    ///
    /// # Errors
    /// `ConfigError` when the file is unreadable or invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(AUTH_TOKEN_ENV) {
            if !token.is_empty() {
                self.auth_token = token;
            }
        }
    }

    /// Workflow configuration with the file's overrides applied.
    #[must_use]
    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            attempt_budget: self.worker.attempt_budget,
            readiness_timeout: self.worker.readiness_timeout,
            verify_timeout: self.worker.verify_timeout,
            poll_interval: self.worker.poll_interval,
            ..WorkflowConfig::default()
        }
    }
}
