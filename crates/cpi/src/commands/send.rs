//! `cpi send`: run the install transaction once and wait for its outcome.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use cpi_core::{
    Error as CoreError, FileStore, InstallTransaction, Outcome, TransactionListener,
};

use crate::cli::{GlobalOpts, SendArgs};
use crate::config;
use crate::error::CliError;
use crate::output::{self, Tone};

/// Mirrors transaction callbacks into the log.
struct LogListener;

impl TransactionListener for LogListener {
    fn on_success(&self, txn: &InstallTransaction) {
        info!(endpoint = %txn.config().endpoint(), "install acknowledged");
    }

    fn on_error(&self, txn: &InstallTransaction, status_code: i32, cause: &CoreError) {
        warn!(
            endpoint = %txn.config().endpoint(),
            status_code,
            error = %cause,
            "install not acknowledged"
        );
    }
}

#[derive(Serialize)]
struct SendReport<'a> {
    outcome: &'a str,
    endpoint: &'a str,
    device_id: &'a str,
}

pub async fn handle(args: &SendArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::load(global)?;
    config::apply_send_overrides(&mut cfg, args);

    let txn_config = cfg.transaction_config()?;
    let device_id = cpi_config::resolve_device_id(&cfg)?;
    let state_dir = cfg.state_dir();
    let endpoint = txn_config.endpoint().to_string();
    debug!(state_dir = %state_dir.display(), %endpoint, "preparing install transaction");

    let host = config::host_context(&cfg, device_id.clone());
    let txn = InstallTransaction::new(
        txn_config,
        Arc::new(host),
        Arc::new(FileStore::for_install(&state_dir)),
    )?;
    txn.set_listener(Arc::new(LogListener));

    let (label, tone, headline) = match txn.start().wait().await {
        Outcome::Sent => ("sent", Tone::Good, "Install recorded"),
        Outcome::AlreadySent => (
            "already-sent",
            Tone::Neutral,
            "Install already recorded, nothing sent",
        ),
        Outcome::AlreadyStarted => (
            "already-started",
            Tone::Neutral,
            "Install transaction already in progress",
        ),
        Outcome::Failed { status_code, error } => {
            return Err(CliError::from_failure(&endpoint, status_code, error));
        }
    };

    let report = SendReport {
        outcome: label,
        endpoint: &endpoint,
        device_id: &device_id,
    };
    let text = output::render(
        global,
        &report,
        tone,
        headline,
        &[("endpoint", endpoint.clone()), ("device", device_id.clone())],
    )?;
    output::print(global, &text);
    Ok(())
}
