//! `cpi status`: read the durable install flag.

use serde::Serialize;

use cpi_core::{DurableStore, FileStore, INSTALL_SENT_KEY};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output::{self, Tone};

#[derive(Serialize)]
struct StatusReport {
    install_sent: bool,
    store: String,
}

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let store = FileStore::for_install(cfg.state_dir());
    let install_sent = store.get_bool(INSTALL_SENT_KEY, false)?;

    let report = StatusReport {
        install_sent,
        store: store.path().display().to_string(),
    };
    let (tone, headline) = if install_sent {
        (Tone::Good, "Install recorded")
    } else {
        (Tone::Neutral, "Install not recorded yet")
    };

    let text = output::render(
        global,
        &report,
        tone,
        headline,
        &[("store", report.store.clone())],
    )?;
    output::print(global, &text);
    Ok(())
}
