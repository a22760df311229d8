//! Clap derive structures for the `cpi` CLI.
//!
//! Kept free of workspace-crate imports: `build.rs` includes this file
//! directly to render man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// cpi -- report this install to the attribution service, exactly once
#[derive(Debug, Parser)]
#[command(
    name = "cpi",
    version,
    about = "Report this install to the attribution service, once",
    long_about = "Sends a single install transaction for this host.\n\n\
        The first confirmed send is recorded in the state directory; later\n\
        runs see the record and make no request. Run `cpi send` on every\n\
        start until it reports success.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "CPI_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the install record and device id
    #[arg(long, env = "CPI_STATE_DIR", global = true)]
    pub state_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "text", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send the install transaction unless it is already recorded
    Send(SendArgs),

    /// Show whether the install is recorded
    Status,

    /// Manage the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// A capability this host grants for optional identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Grant {
    /// Allow sending the telephony id (--imei)
    ReadPhoneState,
    /// Allow sending the wifi MAC address (--mac)
    AccessWifiState,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    /// App key issued by the attribution service
    #[arg(long, env = "CPI_APP_KEY", hide_env_values = true)]
    pub app_key: Option<String>,

    /// Attribution host
    #[arg(long, conflicts_with = "base_url")]
    pub host: Option<String>,

    /// Full endpoint base URL (staging, local testing)
    #[arg(long, env = "CPI_BASE_URL", hide = true)]
    pub base_url: Option<String>,

    /// Stable device identifier (generated and kept when omitted)
    #[arg(long)]
    pub device_id: Option<String>,

    /// Telephony identifier (needs --grant read-phone-state)
    #[arg(long)]
    pub imei: Option<String>,

    /// Wifi MAC address (needs --grant access-wifi-state)
    #[arg(long)]
    pub mac: Option<String>,

    /// Grant a capability (repeatable)
    #[arg(long = "grant", value_name = "CAPABILITY")]
    pub grants: Vec<Grant>,

    /// Connect/read timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a new config file
    Init(ConfigInitArgs),

    /// Print the effective configuration
    Show,

    /// Print the config file path
    Path,
}

#[derive(Debug, Args)]
pub struct ConfigInitArgs {
    /// App key issued by the attribution service
    #[arg(long)]
    pub app_key: String,

    /// Attribution host
    #[arg(long)]
    pub host: Option<String>,

    /// Replace an existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
