//! Output formatting: colored text or JSON.

use std::io::{self, IsTerminal};

use owo_colors::OwoColorize;
use serde::Serialize;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Tone of a one-line status message.
#[derive(Debug, Clone, Copy)]
pub enum Tone {
    Good,
    Neutral,
}

/// Render `report` in the selected format, using `headline` for text mode.
pub fn render<T: Serialize>(
    global: &GlobalOpts,
    report: &T,
    tone: Tone,
    headline: &str,
    details: &[(&str, String)],
) -> Result<String, CliError> {
    match global.output {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            let color = should_color(global.color);
            let mut out = match (tone, color) {
                (Tone::Good, true) => headline.green().bold().to_string(),
                (Tone::Neutral, true) => headline.cyan().to_string(),
                (_, false) => headline.to_owned(),
            };
            for (label, value) in details {
                out.push('\n');
                let label = format!("{label}:");
                if color {
                    out.push_str(&format!("  {:<10} {value}", label.dimmed()));
                } else {
                    out.push_str(&format!("  {label:<10} {value}"));
                }
            }
            Ok(out)
        }
    }
}

/// Print to stdout unless `--quiet`.
pub fn print(global: &GlobalOpts, text: &str) {
    if !global.quiet && !text.is_empty() {
        println!("{text}");
    }
}
