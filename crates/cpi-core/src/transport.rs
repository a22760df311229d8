// HTTP transport for the install exchange.
//
// One POST, one response, nothing kept afterwards. The client keeps no idle
// connections, so consuming or dropping the `reqwest::Response` inside
// `post_form` closes the socket on every path.

use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, trace};
use url::Url;

use crate::config::DEFAULT_TIMEOUT;
use crate::error::Error;
use crate::payload;

/// Status and full body of one completed round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub status: u16,
    pub body: String,
}

/// Performs the single form POST of an install transaction.
///
/// Failures carry whatever status was obtained before the failure (see
/// [`Error::status`]). Implementations must not retry.
pub trait Transport: Send + Sync {
    fn post_form<'a>(&'a self, url: &'a Url, body: String) -> BoxFuture<'a, Result<Exchange, Error>>;
}

// ── HttpTransport ───────────────────────────────────────────────────

/// Settings for building the `reqwest::Client` behind [`HttpTransport`].
///
/// Certificate and hostname validation always use the TLS stack defaults.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Applied separately to connect and to each read.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("cpi/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .connect_timeout(self.timeout)
            .read_timeout(self.timeout)
            .pool_max_idle_per_host(0)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

/// [`Transport`] over HTTPS via `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: config.build_client()?,
            timeout: config.timeout,
        })
    }

    /// Wrap a pre-built client. `timeout` is only used for error reporting.
    pub fn with_client(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    fn classify(&self, err: reqwest::Error, status: Option<u16>) -> Error {
        if err.is_timeout() && status.is_none() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Network {
                status,
                source: err,
            }
        }
    }

    async fn exchange(&self, url: &Url, body: String) -> Result<Exchange, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, payload::CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| self.classify(e, None))?;

        // The status line is in hand before the body is read, so a failed
        // read (e.g. a 404 whose body never arrives) still reports it.
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| self.classify(e, Some(status)))?;

        trace!(status, body_len = body.len(), "response received");
        Ok(Exchange { status, body })
    }
}

impl Transport for HttpTransport {
    fn post_form<'a>(&'a self, url: &'a Url, body: String) -> BoxFuture<'a, Result<Exchange, Error>> {
        self.exchange(url, body).boxed()
    }
}
