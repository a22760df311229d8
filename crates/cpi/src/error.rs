//! CLI error types with miette diagnostics.
//!
//! Maps core and config failures into user-facing errors with help text
//! and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use cpi_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const REJECTED: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Transaction ──────────────────────────────────────────────────
    #[error("Could not reach the attribution endpoint at {url}")]
    #[diagnostic(
        code(cpi::connection_failed),
        help(
            "Check network connectivity and the configured host.\n\
             The install stays unrecorded; run `cpi send` again later."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: cpi_core::Error,
    },

    #[error("Request to {url} timed out after {seconds}s")]
    #[diagnostic(
        code(cpi::timeout),
        help("Increase the timeout with --timeout or retry later.")
    )]
    Timeout { url: String, seconds: u64 },

    #[error("Install was not accepted (status {status_code})")]
    #[diagnostic(
        code(cpi::rejected),
        help(
            "The endpoint must answer 201 with body `ok`.\n\
             Verify the app key; the install stays unrecorded."
        )
    )]
    Rejected {
        status_code: i32,
        #[source]
        source: cpi_core::Error,
    },

    #[error("Install transaction failed")]
    #[diagnostic(code(cpi::transaction))]
    Transaction(#[source] cpi_core::Error),

    // ── Configuration ────────────────────────────────────────────────
    #[error("No app key configured")]
    #[diagnostic(
        code(cpi::no_app_key),
        help(
            "Pass --app-key, set CPI_APP_KEY, or run:\n\
             cpi config init --app-key <KEY>"
        )
    )]
    NoAppKey,

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(cpi::validation))]
    Validation { field: String, reason: String },

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(code(cpi::config_exists), help("Use --force to overwrite it."))]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(cpi::config))]
    Config(Box<figment::Error>),

    #[error("Failed to serialize config: {0}")]
    #[diagnostic(code(cpi::config))]
    Serialization(#[from] toml::ser::Error),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::NoAppKey | Self::Validation { .. } | Self::ConfigExists { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }

    /// Classify a failed transaction.
    pub fn from_failure(url: &str, status_code: i32, error: cpi_core::Error) -> Self {
        match error {
            cpi_core::Error::Timeout { timeout_secs } => Self::Timeout {
                url: url.into(),
                seconds: timeout_secs,
            },
            err @ cpi_core::Error::Network { .. } => Self::ConnectionFailed {
                url: url.into(),
                source: err,
            },
            err @ cpi_core::Error::Protocol { .. } => Self::Rejected {
                status_code,
                source: err,
            },
            other => Self::Transaction(other),
        }
    }
}

// ── Lower-layer mappings ─────────────────────────────────────────────

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl From<cpi_core::Error> for CliError {
    fn from(err: cpi_core::Error) -> Self {
        match err {
            cpi_core::Error::InvalidConfig { field, reason } => Self::Validation {
                field: field.into(),
                reason,
            },
            cpi_core::Error::InvalidUrl(e) => Self::Validation {
                field: "url".into(),
                reason: e.to_string(),
            },
            other => Self::Transaction(other),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoAppKey => Self::NoAppKey,
            ConfigError::Serialization(e) => Self::Serialization(e),
            ConfigError::Figment(e) => Self::Config(e),
            ConfigError::Core(e) => e.into(),
            ConfigError::Io(e) => Self::Io(e),
        }
    }
}
