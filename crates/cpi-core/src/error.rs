use thiserror::Error;

/// Top-level error type for the `cpi-core` crate.
///
/// Construction problems surface synchronously from
/// [`InstallTransaction::new`](crate::InstallTransaction::new). Everything
/// else happens on the background task and reaches the caller only through
/// the listener and the [`TransactionHandle`](crate::TransactionHandle).
#[derive(Debug, Error)]
pub enum Error {
    // ── Construction ────────────────────────────────────────────────
    /// A required configuration value is missing or malformed.
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// URL parsing error (bad host or base URL).
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Transport ───────────────────────────────────────────────────
    /// Connection, write, or read failure. `status` is kept when the
    /// status line arrived before the failure.
    #[error("Network error: {source}")]
    Network {
        status: Option<u16>,
        #[source]
        source: reqwest::Error,
    },

    /// Connect or read exceeded the configured timeout.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Protocol ────────────────────────────────────────────────────
    /// The endpoint answered, but not with `201` + `ok`.
    #[error("Install rejected (HTTP {status}): {body:?}")]
    Protocol { status: u16, body: String },

    // ── Durable store ───────────────────────────────────────────────
    /// The durable flag could not be read or written.
    #[error("Durable store error: {message}")]
    Store { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid store contents: {0}")]
    Json(#[from] serde_json::Error),

    // ── Scheduling ──────────────────────────────────────────────────
    /// The background worker could not be started or vanished.
    #[error("Background worker failed: {0}")]
    Runtime(String),
}

impl Error {
    /// The HTTP status attached to this error, if one was obtained.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network { status, .. } => *status,
            Self::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` for connection-level failures (no usable response).
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }

    /// Returns `true` if the endpoint answered but rejected the install.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    pub(crate) fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
