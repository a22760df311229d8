// ── Device identifier collection ──
//
// The host platform decides which identifiers the process may read. Each
// optional identifier is gated on a capability grant and produced as an
// explicit `Option`; a missing grant is an ordinary branch, never an error.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::trace;

// ── Capability ──────────────────────────────────────────────────────

/// A runtime-granted permission gating an optional identifier source.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Read device telephony state (IMEI / MEID).
    ReadPhoneState,
    /// Read wifi state (interface MAC address).
    AccessWifiState,
}

/// The set of capabilities granted to this process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities(BTreeSet<Capability>);

impl Capabilities {
    /// No optional identifiers may be read.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every known capability granted.
    pub fn all() -> Self {
        Capability::iter().collect()
    }

    #[must_use]
    pub fn grant(mut self, capability: Capability) -> Self {
        self.0.insert(capability);
        self
    }

    pub fn is_granted(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ── MacAddress ──────────────────────────────────────────────────────

/// Interface MAC address exactly as the host reports it.
///
/// Case and separators are kept; the endpoint matches on the raw value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddress(String);

impl MacAddress {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Host context ────────────────────────────────────────────────────

/// The host application's view of the device.
///
/// Implementations wrap whatever the platform offers. Capability checks
/// must be cheap and infallible; sources are only consulted after the
/// matching capability check passed.
pub trait HostContext: Send + Sync {
    /// Stable per-install identifier. Always available.
    fn device_id(&self) -> String;

    /// Whether `capability` is currently granted.
    fn has_capability(&self, capability: Capability) -> bool;

    /// Telephony device identifier, if the radio reports one.
    fn telephony_id(&self) -> Option<String>;

    /// MAC address of the wifi interface. `None` when the device has no
    /// wifi subsystem.
    fn wifi_mac_address(&self) -> Option<String>;
}

/// A [`HostContext`] built from literal values.
#[derive(Debug, Clone, Default)]
pub struct StaticHost {
    device_id: String,
    capabilities: Capabilities,
    telephony_id: Option<String>,
    wifi_mac_address: Option<String>,
}

impl StaticHost {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    #[must_use]
    pub fn with_telephony_id(mut self, id: impl Into<String>) -> Self {
        self.telephony_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_wifi_mac_address(mut self, mac: impl Into<String>) -> Self {
        self.wifi_mac_address = Some(mac.into());
        self
    }
}

impl HostContext for StaticHost {
    fn device_id(&self) -> String {
        self.device_id.clone()
    }

    fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.is_granted(capability)
    }

    fn telephony_id(&self) -> Option<String> {
        self.telephony_id.clone()
    }

    fn wifi_mac_address(&self) -> Option<String> {
        self.wifi_mac_address.clone()
    }
}

// ── Collection ──────────────────────────────────────────────────────

/// Identifiers gathered at send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceIdentifiers {
    pub primary_id: String,
    pub secondary_id: Option<String>,
    pub mac_address: Option<MacAddress>,
}

/// Reads every identifier the host currently allows.
pub struct IdentifierCollector;

impl IdentifierCollector {
    pub fn collect(host: &dyn HostContext) -> DeviceIdentifiers {
        let secondary_id = if host.has_capability(Capability::ReadPhoneState) {
            host.telephony_id().filter(|id| !id.is_empty())
        } else {
            trace!("telephony capability not granted, omitting secondary id");
            None
        };

        let mac_address = if host.has_capability(Capability::AccessWifiState) {
            host.wifi_mac_address()
                .filter(|mac| !mac.is_empty())
                .map(MacAddress::new)
        } else {
            trace!("wifi capability not granted, omitting mac address");
            None
        };

        DeviceIdentifiers {
            primary_id: host.device_id(),
            secondary_id,
            mac_address,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn full_host() -> StaticHost {
        StaticHost::new("android-1")
            .with_telephony_id("356938035643809")
            .with_wifi_mac_address("AA-BB-CC-DD-EE-FF")
    }

    #[test]
    fn no_capabilities_yields_primary_only() {
        let ids = IdentifierCollector::collect(&full_host());
        assert_eq!(ids.primary_id, "android-1");
        assert_eq!(ids.secondary_id, None);
        assert_eq!(ids.mac_address, None);
    }

    #[test]
    fn phone_state_grant_reads_telephony_id() {
        let host = full_host()
            .with_capabilities(Capabilities::none().grant(Capability::ReadPhoneState));
        let ids = IdentifierCollector::collect(&host);
        assert_eq!(ids.secondary_id.as_deref(), Some("356938035643809"));
        assert_eq!(ids.mac_address, None);
    }

    #[test]
    fn wifi_grant_reads_mac_verbatim() {
        let host = full_host()
            .with_capabilities(Capabilities::none().grant(Capability::AccessWifiState));
        let ids = IdentifierCollector::collect(&host);
        assert_eq!(ids.secondary_id, None);
        assert_eq!(
            ids.mac_address.as_ref().map(MacAddress::as_str),
            Some("AA-BB-CC-DD-EE-FF")
        );
    }

    #[test]
    fn wifi_grant_without_subsystem_is_silent() {
        let host = StaticHost::new("android-1").with_capabilities(Capabilities::all());
        let ids = IdentifierCollector::collect(&host);
        assert_eq!(ids.mac_address, None);
        assert_eq!(ids.secondary_id, None);
    }

    #[test]
    fn capability_parses_from_kebab_case() {
        let cap: Capability = "read-phone-state".parse().unwrap();
        assert_eq!(cap, Capability::ReadPhoneState);
        assert_eq!(Capability::AccessWifiState.to_string(), "access-wifi-state");
    }

    #[test]
    fn all_grants_every_capability() {
        let caps = Capabilities::all();
        assert!(caps.is_granted(Capability::ReadPhoneState));
        assert!(caps.is_granted(Capability::AccessWifiState));
    }
}
