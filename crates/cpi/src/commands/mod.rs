//! Command dispatch.

pub mod config_cmd;
pub mod send;
pub mod status;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a parsed command to its handler. Completions are handled in `main`.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Send(args) => send::handle(&args, global).await,
        Command::Status => status::handle(global),
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(_) => Ok(()),
    }
}
