//! CLI configuration: thin layer over `cpi_config`.
//!
//! Loads the shared config, then applies flag overrides (flag > env > file).

use std::path::PathBuf;

use cpi_config::Config;
use cpi_core::{Capability, StaticHost};

use crate::cli::{Grant, GlobalOpts, SendArgs};
use crate::error::CliError;

/// Config file in effect: `--config` / `CPI_CONFIG`, else the platform path.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(cpi_config::config_path)
}

/// Load the config file and apply global overrides.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = cpi_config::load_config_from(&config_file(global))?;
    if let Some(ref dir) = global.state_dir {
        cfg.state_dir = Some(dir.clone());
    }
    Ok(cfg)
}

pub fn capability(grant: Grant) -> Capability {
    match grant {
        Grant::ReadPhoneState => Capability::ReadPhoneState,
        Grant::AccessWifiState => Capability::AccessWifiState,
    }
}

/// Apply `cpi send` flags on top of the loaded config.
pub fn apply_send_overrides(cfg: &mut Config, args: &SendArgs) {
    if let Some(ref key) = args.app_key {
        cfg.app_key = Some(key.clone());
    }
    if let Some(ref host) = args.host {
        cfg.endpoint_host.clone_from(host);
        cfg.base_url = None;
    }
    if let Some(ref url) = args.base_url {
        cfg.base_url = Some(url.clone());
    }
    if let Some(ref id) = args.device_id {
        cfg.device_id = Some(id.clone());
    }
    if let Some(ref imei) = args.imei {
        cfg.telephony_id = Some(imei.clone());
    }
    if let Some(ref mac) = args.mac {
        cfg.mac_address = Some(mac.clone());
    }
    if !args.grants.is_empty() {
        cfg.grants = args.grants.iter().copied().map(capability).collect();
    }
    if let Some(secs) = args.timeout {
        cfg.timeout = secs;
    }
}

/// Host context for this machine, as described by the config.
pub fn host_context(cfg: &Config, device_id: String) -> StaticHost {
    let mut host = StaticHost::new(device_id).with_capabilities(cfg.capabilities());
    if let Some(ref imei) = cfg.telephony_id {
        host = host.with_telephony_id(imei.clone());
    }
    if let Some(ref mac) = cfg.mac_address {
        host = host.with_wifi_mac_address(mac.clone());
    }
    host
}

#[cfg(test)]
mod tests {
    use cpi_core::HostContext;

    use super::*;

    fn send_args() -> SendArgs {
        SendArgs {
            app_key: None,
            host: None,
            base_url: None,
            device_id: None,
            imei: None,
            mac: None,
            grants: Vec::new(),
            timeout: None,
        }
    }

    #[test]
    fn flags_override_file_values() {
        let mut cfg = Config {
            app_key: Some("from-file".into()),
            base_url: Some("http://localhost:1".into()),
            grants: vec![Capability::AccessWifiState],
            ..Config::default()
        };
        let args = SendArgs {
            app_key: Some("from-flag".into()),
            host: Some("attr.example.com".into()),
            grants: vec![Grant::ReadPhoneState],
            timeout: Some(5),
            ..send_args()
        };

        apply_send_overrides(&mut cfg, &args);

        assert_eq!(cfg.app_key.as_deref(), Some("from-flag"));
        assert_eq!(cfg.endpoint_host, "attr.example.com");
        assert_eq!(cfg.base_url, None);
        assert_eq!(cfg.grants, vec![Capability::ReadPhoneState]);
        assert_eq!(cfg.timeout, 5);
    }

    #[test]
    fn absent_flags_keep_file_values() {
        let mut cfg = Config {
            app_key: Some("from-file".into()),
            grants: vec![Capability::AccessWifiState],
            ..Config::default()
        };
        apply_send_overrides(&mut cfg, &send_args());

        assert_eq!(cfg.app_key.as_deref(), Some("from-file"));
        assert_eq!(cfg.grants, vec![Capability::AccessWifiState]);
    }

    #[test]
    fn host_context_honours_grants() {
        let cfg = Config {
            telephony_id: Some("356938035643809".into()),
            mac_address: Some("02:00:00:00:00:00".into()),
            grants: vec![Capability::ReadPhoneState],
            ..Config::default()
        };
        let host = host_context(&cfg, "dev-1".into());

        assert_eq!(host.device_id(), "dev-1");
        assert!(host.has_capability(Capability::ReadPhoneState));
        assert!(!host.has_capability(Capability::AccessWifiState));
    }
}
