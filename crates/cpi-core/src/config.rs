// ── Transaction configuration ──
//
// Immutable after construction. Describes *where* the install is reported
// and under which app key; the identifiers themselves are collected at
// send time from the host context.

use std::time::Duration;

use url::Url;

use crate::error::Error;

/// Attribution host used when the caller does not name one.
pub const DEFAULT_ENDPOINT_HOST: &str = "ads.sessionm.com";

/// Path appended to every endpoint base.
pub const TRANSACTIONS_PATH: &str = "transactions";

/// Connect and read timeout for the single round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Validated configuration for one [`InstallTransaction`](crate::InstallTransaction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionConfig {
    app_key: String,
    endpoint: Url,
    timeout: Duration,
}

impl TransactionConfig {
    /// Configure against the default attribution host.
    pub fn new(app_key: impl Into<String>) -> Result<Self, Error> {
        Self::with_host(app_key, DEFAULT_ENDPOINT_HOST)
    }

    /// Configure against `https://<host>/transactions`.
    ///
    /// `host` is a bare hostname (optionally with a port), never a URL.
    pub fn with_host(app_key: impl Into<String>, host: &str) -> Result<Self, Error> {
        let host = host.trim();
        if host.is_empty() {
            return Err(Error::invalid_config("endpoint_host", "must not be empty"));
        }
        if host.contains("://") || host.contains('/') {
            return Err(Error::invalid_config(
                "endpoint_host",
                format!("expected a bare hostname, got '{host}'"),
            ));
        }
        let base = Url::parse(&format!("https://{host}"))?;
        Self::with_base_url(app_key, &base)
    }

    /// Configure against an explicit base URL (staging, local mock server).
    /// The transactions path is appended to whatever path `base` carries.
    pub fn with_base_url(app_key: impl Into<String>, base: &Url) -> Result<Self, Error> {
        let app_key = app_key.into();
        if app_key.trim().is_empty() {
            return Err(Error::invalid_config("app_key", "must not be empty"));
        }
        if !matches!(base.scheme(), "https" | "http") {
            return Err(Error::invalid_config(
                "base_url",
                format!("unsupported scheme '{}'", base.scheme()),
            ));
        }
        if base.host_str().is_none_or(str::is_empty) {
            return Err(Error::invalid_config("base_url", "missing host"));
        }

        let trimmed = base.as_str().trim_end_matches('/');
        let endpoint = Url::parse(&format!("{trimmed}/{TRANSACTIONS_PATH}"))?;

        Ok(Self {
            app_key,
            endpoint,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Override the connect/read timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    /// Host portion of the endpoint.
    pub fn endpoint_host(&self) -> &str {
        self.endpoint.host_str().unwrap_or_default()
    }

    /// Full URL the install is POSTed to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
