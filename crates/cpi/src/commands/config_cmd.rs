//! `cpi config`: create, show, and locate the config file.

use cpi_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, ConfigInitArgs, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init(init) => handle_init(init, global),
        ConfigCommand::Show => handle_show(global),
        ConfigCommand::Path => {
            output::print(global, &config::config_file(global).display().to_string());
            Ok(())
        }
    }
}

fn handle_init(args: ConfigInitArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::config_file(global);
    if path.exists() && !args.force {
        return Err(CliError::ConfigExists {
            path: path.display().to_string(),
        });
    }

    let mut cfg = Config {
        app_key: Some(args.app_key),
        ..Config::default()
    };
    if let Some(host) = args.host {
        cfg.endpoint_host = host;
    }
    // Fail now rather than on the first send.
    cfg.transaction_config()?;

    cpi_config::save_config_to(&path, &cfg)?;
    output::print(global, &format!("Wrote {}", path.display()));
    Ok(())
}

fn handle_show(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let text = match global.output {
        OutputFormat::Json => serde_json::to_string_pretty(&cfg)?,
        OutputFormat::Text => toml::to_string_pretty(&cfg)?,
    };
    output::print(global, text.trim_end());
    Ok(())
}
