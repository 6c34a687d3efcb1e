use std::fmt;

use airprobe_core::records::{AssociationInfo, ObservedNetwork, PreferredNetwork};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;

const RULE: &str = "--------------------------------------------------";

/// Everything one run found, printed as text or serialized as one JSON
/// document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub current: Option<AssociationInfo>,
    pub networks: Vec<ObservedNetwork>,
    pub preferred: Vec<PreferredNetwork>,
}

fn or_none(value: Option<&str>) -> &str {
    value.unwrap_or("None")
}

fn write_current(f: &mut fmt::Formatter<'_>, current: &AssociationInfo) -> fmt::Result {
    writeln!(f, "interface: {}", current.interface_name)?;
    writeln!(f, "ssid: {}", or_none(current.ssid.as_deref()))?;
    writeln!(f, "bssid: {}", or_none(current.bssid.as_deref()))?;
    writeln!(f, "channel: {}", current.channel)?;
    writeln!(f, "rssi: {}", current.rssi)?;
    writeln!(f, "noise: {}", current.noise)?;
    writeln!(f, "tx_rate: {}", current.tx_rate)?;
    let security_mode = current
        .security_mode
        .map_or_else(|| "None".to_string(), |mode| mode.label());

    writeln!(f, "security_mode: {security_mode}")
}

fn write_observed(f: &mut fmt::Formatter<'_>, network: &ObservedNetwork) -> fmt::Result {
    writeln!(f, "{RULE}")?;
    writeln!(f, "ssid: {}", or_none(network.ssid.as_deref()))?;
    writeln!(f, "bssid: {}", or_none(network.bssid.as_deref()))?;
    writeln!(f, "rssi: {}", network.rssi)?;
    writeln!(f, "channel: {}", network.channel)?;
    writeln!(f, "is_ibss: {}", network.is_ibss)?;
    writeln!(f, "noise: {}", network.noise)?;
    writeln!(f, "country_code: {}", network.country_code)
}

fn write_preferred(f: &mut fmt::Formatter<'_>, network: &PreferredNetwork) -> fmt::Result {
    let last_connected = network
        .last_connected
        .and_then(|at| at.format(&Rfc3339).ok())
        .unwrap_or_else(|| "never".to_string());

    writeln!(f, "{RULE}")?;
    writeln!(f, "ssid: {}", network.ssid)?;
    writeln!(f, "security_mode: {}", network.security_mode)?;
    writeln!(f, "is_auto_join: {}", network.auto_join)?;
    writeln!(f, "last_connected: {last_connected}")
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Current Network:")?;
        if let Some(current) = &self.current {
            write_current(f, current)?;
        }

        writeln!(f)?;
        writeln!(f, "Available Networks:")?;
        for network in &self.networks {
            write_observed(f, network)?;
        }

        writeln!(f)?;
        writeln!(f, "Preferred Networks:")?;
        for network in &self.preferred {
            write_preferred(f, network)?;
        }

        Ok(())
    }
}
