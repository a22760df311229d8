//! Shared configuration for the cpi tools.
//!
//! TOML file + `CPI_*` environment, platform config/state paths, the
//! persisted device identifier, and translation to
//! `cpi_core::TransactionConfig`. The CLI layers its flag overrides on top.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use cpi_core::{Capabilities, Capability, DEFAULT_ENDPOINT_HOST, TransactionConfig};

const DEVICE_ID_FILE: &str = "device-id";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no app key configured")]
    NoAppKey,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error(transparent)]
    Core(#[from] cpi_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// App key issued by the attribution service.
    pub app_key: Option<String>,

    /// Attribution host; the request goes to `https://<host>/transactions`.
    #[serde(default = "default_endpoint_host")]
    pub endpoint_host: String,

    /// Full base URL, overriding `endpoint_host` (staging, local testing).
    pub base_url: Option<String>,

    /// Stable device identifier. Generated and persisted when absent.
    pub device_id: Option<String>,

    /// Telephony identifier, sent only with the `read-phone-state` grant.
    pub telephony_id: Option<String>,

    /// Interface MAC address, sent only with the `access-wifi-state` grant.
    pub mac_address: Option<String>,

    /// Capabilities granted to this host.
    #[serde(default)]
    pub grants: Vec<Capability>,

    /// Connect/read timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Where the install flag and device id live.
    pub state_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_key: None,
            endpoint_host: default_endpoint_host(),
            base_url: None,
            device_id: None,
            telephony_id: None,
            mac_address: None,
            grants: Vec::new(),
            timeout: default_timeout(),
            state_dir: None,
        }
    }
}

fn default_endpoint_host() -> String {
    DEFAULT_ENDPOINT_HOST.into()
}
fn default_timeout() -> u64 {
    60
}

impl Config {
    pub fn capabilities(&self) -> Capabilities {
        self.grants.iter().copied().collect()
    }

    /// Resolved state directory: configured value, else the platform default.
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(default_state_dir)
    }

    /// Build the transaction config from the configured app key and endpoint.
    pub fn transaction_config(&self) -> Result<TransactionConfig, ConfigError> {
        let app_key = self
            .app_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::NoAppKey)?;
        if self.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }

        let config = match self.base_url.as_deref() {
            Some(raw) => {
                let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
                    field: "base_url".into(),
                    reason: format!("invalid URL: {raw}"),
                })?;
                TransactionConfig::with_base_url(app_key, &url)?
            }
            None => TransactionConfig::with_host(app_key, &self.endpoint_host)?,
        };

        Ok(config.with_timeout(Duration::from_secs(self.timeout)))
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "cpi", "cpi")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("cpi");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Platform data directory for durable state.
pub fn default_state_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("state"),
        |dirs| dirs.data_local_dir().to_path_buf(),
    )
}

// ── Loading / saving ────────────────────────────────────────────────

/// Load config from `path` merged with `CPI_*` environment variables.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CPI_").only(&[
            "app_key",
            "endpoint_host",
            "base_url",
            "device_id",
            "timeout",
            "state_dir",
        ]));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Load config from the canonical path.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    fs::write(path, toml_str)?;
    Ok(())
}

// ── Device id ───────────────────────────────────────────────────────

/// The stable device identifier for this install.
///
/// Uses the configured value if present. Otherwise reads
/// `<state_dir>/device-id`, generating and persisting a UUID v4 the first
/// time.
pub fn resolve_device_id(cfg: &Config) -> Result<String, ConfigError> {
    if let Some(id) = cfg.device_id.as_deref().filter(|id| !id.trim().is_empty()) {
        return Ok(id.to_owned());
    }
    device_id_in(&cfg.state_dir())
}

fn device_id_in(state_dir: &Path) -> Result<String, ConfigError> {
    let path = state_dir.join(DEVICE_ID_FILE);
    match fs::read_to_string(&path) {
        Ok(raw) if !raw.trim().is_empty() => return Ok(raw.trim().to_owned()),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(ConfigError::Io(e)),
    }

    let id = uuid::Uuid::new_v4().to_string();
    fs::create_dir_all(state_dir)?;
    fs::write(&path, &id)?;
    info!(path = %path.display(), "generated device id");
    Ok(id)
}
