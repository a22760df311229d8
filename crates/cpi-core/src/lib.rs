//! One-shot install attribution for applications.
//!
//! Reports a single "install" event to an attribution endpoint, at most once
//! per installation, without blocking the caller:
//!
//! - **[`IdentifierCollector`]** reads the device identifiers the host allows,
//!   each optional one gated on a [`Capability`] grant.
//! - **[`InstallTransaction`]** checks the durable flag, builds the form body,
//!   POSTs it on a background task, judges the response (`201` + `ok` only),
//!   records success in a [`DurableStore`], and notifies a
//!   [`TransactionListener`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cpi_core::{FileStore, InstallTransaction, StaticHost, TransactionConfig};
//!
//! # async fn run() -> Result<(), cpi_core::Error> {
//! let txn = InstallTransaction::new(
//!     TransactionConfig::new("my-app-key")?,
//!     Arc::new(StaticHost::new("device-1234")),
//!     Arc::new(FileStore::for_install("/var/lib/myapp")),
//! )?;
//! let outcome = txn.start().wait().await;
//! println!("recorded: {}", outcome.is_recorded());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod identifiers;
pub mod payload;
pub mod store;
pub mod transaction;
pub mod transport;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_ENDPOINT_HOST, DEFAULT_TIMEOUT, TransactionConfig};
pub use error::Error;
pub use identifiers::{
    Capabilities, Capability, DeviceIdentifiers, HostContext, IdentifierCollector, MacAddress,
    StaticHost,
};
pub use store::{DurableStore, FileStore, INSTALL_SENT_KEY, MemoryStore, STORE_NAMESPACE};
pub use transaction::{
    InstallTransaction, NO_STATUS, Outcome, TransactionHandle, TransactionListener,
    TransactionResult, TransactionState,
};
pub use transport::{Exchange, HttpTransport, Transport, TransportConfig};
