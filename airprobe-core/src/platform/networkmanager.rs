//! NetworkManager collaborators, driven through `nmcli` in terse mode.
//!
//! Terse output separates fields with `:` and escapes literal colons and
//! backslashes inside values (`\:` and `\\`), so BSSIDs arrive as
//! `AA\:BB\:CC\:DD\:EE\:FF`.

use std::process::Command;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crate::authorization::AuthorizationState;
use crate::error::{ErrorDomain, RadioError, ScanError};
use crate::permission::{AuthorizationObserver, PermissionProvider};
use crate::radio::{Radio, RawAssociation, RawProfile, RawScanEntry};
use crate::security::SecurityMode;

const NMCLI: &str = "nmcli";
const SCAN_PERMISSION: &str = "org.freedesktop.NetworkManager.wifi.scan";

fn nmcli(args: &[&str]) -> Result<String, RadioError> {
    let output = Command::new(NMCLI).args(args).output().map_err(|e| {
        RadioError::new(
            ErrorDomain::Unavailable,
            e.raw_os_error().map(i64::from).unwrap_or(-1),
            format!("failed to run `{NMCLI} {}`: {e}", args.join(" ")),
        )
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let lowered = stderr.to_lowercase();
        if lowered.contains("busy") || lowered.contains("already scanning") {
            return Err(RadioError::busy(stderr));
        }
        return Err(RadioError::new(
            ErrorDomain::Tool,
            output.status.code().map(i64::from).unwrap_or(-1),
            stderr,
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Splits one terse line into unescaped fields.
pub fn split_terse(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ':' => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);

    fields
}

fn non_empty(value: &str) -> Option<String> {
    match value.trim() {
        "" | "--" => None,
        value => Some(value.to_string()),
    }
}

/// NetworkManager reports signal quality as a percentage.
pub fn signal_to_dbm(percent: i64) -> i64 {
    percent.clamp(0, 100) / 2 - 100
}

/// Maps the SECURITY column (`"WPA1 WPA2 802.1X"`, `"WEP"`, ...) to a
/// security-mode code.
pub fn security_from_flags(flags: &str) -> SecurityMode {
    let tokens: Vec<&str> = flags.split_whitespace().collect();
    let has = |name: &str| tokens.iter().any(|t| t.eq_ignore_ascii_case(name));

    let enterprise = has("802.1X");
    let wpa1 = has("WPA1") || has("WPA");
    let wpa2 = has("WPA2");
    let wpa3 = has("WPA3");

    let personal = match (wpa1, wpa2, wpa3) {
        (false, false, false) => {
            return if has("WEP") {
                SecurityMode::WEP
            } else if enterprise {
                SecurityMode::DYNAMIC_WEP
            } else {
                SecurityMode::NONE
            };
        }
        (true, false, false) => SecurityMode::WPA_PERSONAL,
        (true, true, false) => SecurityMode::WPA_WPA2_PERSONAL,
        (false, true, false) => SecurityMode::WPA2_PERSONAL,
        (_, true, true) | (true, false, true) => SecurityMode::WPA2_WPA3_PERSONAL,
        (false, false, true) => SecurityMode::WPA3_PERSONAL,
    };

    if enterprise {
        // Enterprise codes sit six above their personal counterparts
        SecurityMode(personal.code() + 6)
    } else {
        personal
    }
}

/// Maps `802-11-wireless-security.key-mgmt` to a security-mode code.
///
/// An empty value means the profile has no security setting at all.
pub fn security_from_key_mgmt(key_mgmt: &str) -> Option<SecurityMode> {
    match key_mgmt.trim() {
        "" | "owe" => Some(SecurityMode::NONE),
        "none" => Some(SecurityMode::WEP),
        "ieee8021x" => Some(SecurityMode::DYNAMIC_WEP),
        "wpa-psk" => Some(SecurityMode::WPA2_PERSONAL),
        "sae" => Some(SecurityMode::WPA3_PERSONAL),
        "wpa-eap" => Some(SecurityMode::WPA2_ENTERPRISE),
        "wpa-eap-suite-b-192" => Some(SecurityMode::WPA3_ENTERPRISE),
        _ => None,
    }
}

/// Undoes terse-mode escaping of a single value.
pub fn unescape(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => unescaped.extend(chars.next()),
            _ => unescaped.push(c),
        }
    }

    unescaped
}

/// Parses `-g 802-11-wireless.ssid,802-11-wireless-security.key-mgmt
/// connection show <name>`, which prints one value per line.
pub fn parse_profile_details(output: &str) -> (Option<String>, Option<SecurityMode>) {
    let mut lines = output.lines().map(unescape);

    let ssid = lines.next().and_then(|ssid| non_empty(&ssid));
    let security = security_from_key_mgmt(&lines.next().unwrap_or_default());

    (ssid, security)
}

/// Parses `nmcli -t -f DEVICE,TYPE device` and returns the Wi-Fi devices.
pub fn parse_devices(output: &str) -> Vec<String> {
    output
        .lines()
        .map(split_terse)
        .filter(|fields| fields.len() >= 2 && fields[1] == "wifi")
        .map(|fields| fields[0].clone())
        .collect()
}

/// Parses `-f SSID,BSSID,CHAN,SIGNAL,MODE device wifi list`.
pub fn parse_scan(output: &str) -> Vec<RawScanEntry> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(split_terse)
        .map(|fields| {
            let field = |index: usize| fields.get(index).map(String::as_str).unwrap_or("");

            RawScanEntry {
                ssid: non_empty(field(0)),
                bssid: non_empty(field(1)),
                channel: field(2).trim().parse().ok(),
                rssi: field(3).trim().parse().ok().map(signal_to_dbm),
                ibss: non_empty(field(4)).map(|mode| mode.eq_ignore_ascii_case("Ad-Hoc")),
                // nmcli has no noise measurement, 0 means unmeasured
                noise: Some(0),
                country_code: None,
            }
        })
        .collect()
}

/// Parses `-f ACTIVE,SSID,BSSID,CHAN,SIGNAL,RATE,SECURITY device wifi list`
/// and returns the active row, if any.
pub fn parse_association(output: &str, interface: &str) -> Option<RawAssociation> {
    output
        .lines()
        .map(split_terse)
        .find(|fields| fields.first().is_some_and(|active| active == "yes"))
        .map(|fields| {
            let field = |index: usize| fields.get(index).map(String::as_str).unwrap_or("");

            RawAssociation {
                interface_name: Some(interface.to_string()),
                ssid: non_empty(field(1)),
                bssid: non_empty(field(2)),
                channel: field(3).trim().parse().ok(),
                rssi: field(4).trim().parse().ok().map(signal_to_dbm),
                noise: Some(0),
                tx_rate: field(5)
                    .split_whitespace()
                    .next()
                    .and_then(|rate| rate.parse().ok()),
                security: Some(security_from_flags(field(6)).code()),
            }
        })
}

/// One Wi-Fi row of `-f NAME,TYPE,AUTOCONNECT,TIMESTAMP connection show`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRow {
    pub name: String,
    pub auto_connect: Option<bool>,
    pub timestamp: Option<i64>,
}

pub fn parse_profiles(output: &str) -> Vec<ProfileRow> {
    output
        .lines()
        .map(split_terse)
        .filter(|fields| fields.len() >= 4 && fields[1] == "802-11-wireless")
        .map(|fields| ProfileRow {
            name: fields[0].clone(),
            auto_connect: match fields[2].as_str() {
                "yes" => Some(true),
                "no" => Some(false),
                _ => None,
            },
            timestamp: fields[3].trim().parse().ok(),
        })
        .collect()
}

/// Parses `nmcli -t general permissions` into the state of the scan
/// permission.
pub fn parse_permission(output: &str) -> AuthorizationState {
    output
        .lines()
        .map(split_terse)
        .find(|fields| fields.first().is_some_and(|name| name == SCAN_PERMISSION))
        .map(|fields| match fields.get(1).map(String::as_str) {
            Some("yes") => AuthorizationState::Granted,
            Some("no") => AuthorizationState::Denied,
            _ => AuthorizationState::Unknown,
        })
        .unwrap_or(AuthorizationState::Restricted)
}

/// Radio of one NetworkManager-managed Wi-Fi device.
#[derive(Debug, Clone)]
pub struct NmRadio {
    interface: String,
}

impl NmRadio {
    /// Picks `preferred` if NetworkManager knows it as a Wi-Fi device,
    /// otherwise the first Wi-Fi device.
    pub fn discover(preferred: Option<&str>) -> Result<Self, ScanError> {
        let output = nmcli(&["-t", "-f", "DEVICE,TYPE", "device"]).map_err(|e| {
            tracing::error!("Unable to list network devices: {}", e);
            ScanError::NoInterfaceAvailable
        })?;

        let devices = parse_devices(&output);
        let interface = match preferred {
            Some(name) => devices.into_iter().find(|device| device == name),
            None => devices.into_iter().next(),
        }
        .ok_or(ScanError::NoInterfaceAvailable)?;

        Ok(Self { interface })
    }

    fn profile_details(&self, name: &str) -> (Option<String>, Option<SecurityMode>) {
        let fields = "802-11-wireless.ssid,802-11-wireless-security.key-mgmt";
        match nmcli(&["-e", "yes", "-g", fields, "connection", "show", name]) {
            Ok(output) => parse_profile_details(&output),
            Err(e) => {
                tracing::debug!(profile = name, "Profile lookup failed: {}", e);
                (None, None)
            }
        }
    }
}

impl Radio for NmRadio {
    fn interface_name(&self) -> &str {
        &self.interface
    }

    fn current_association(&self) -> Result<Option<RawAssociation>, RadioError> {
        let output = nmcli(&[
            "-t",
            "-e",
            "yes",
            "-f",
            "ACTIVE,SSID,BSSID,CHAN,SIGNAL,RATE,SECURITY",
            "device",
            "wifi",
            "list",
            "--rescan",
            "no",
            "ifname",
            &self.interface,
        ])?;

        Ok(parse_association(&output, &self.interface))
    }

    fn scan_once(&self, ssid_filter: Option<&str>) -> Result<Vec<RawScanEntry>, RadioError> {
        let output = nmcli(&[
            "-t",
            "-e",
            "yes",
            "-f",
            "SSID,BSSID,CHAN,SIGNAL,MODE",
            "device",
            "wifi",
            "list",
            "--rescan",
            "yes",
            "ifname",
            &self.interface,
        ])?;

        let mut entries = parse_scan(&output);
        if let Some(ssid) = ssid_filter {
            entries.retain(|entry| entry.ssid.as_deref() == Some(ssid));
        }

        Ok(entries)
    }

    fn saved_profiles(&self) -> Result<Option<Vec<RawProfile>>, RadioError> {
        let output = nmcli(&[
            "-t",
            "-e",
            "yes",
            "-f",
            "NAME,TYPE,AUTOCONNECT,TIMESTAMP",
            "connection",
            "show",
        ])?;

        let rows = parse_profiles(&output);
        if rows.is_empty() {
            return Ok(None);
        }

        let profiles = rows
            .into_iter()
            .map(|row| {
                let (ssid, security) = self.profile_details(&row.name);
                RawProfile {
                    ssid: ssid.or(Some(row.name)),
                    security: security.map(|mode| mode.code()),
                    auto_join: row.auto_connect,
                    last_connected: row.timestamp,
                }
            })
            .collect();

        Ok(Some(profiles))
    }
}

/// The polkit-backed scan permission of NetworkManager.
#[derive(Clone, Default)]
pub struct NmPermission {
    observers: Arc<Mutex<Vec<Arc<dyn AuthorizationObserver>>>>,
}

impl NmPermission {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_state() -> AuthorizationState {
        match nmcli(&["-t", "general", "permissions"]) {
            Ok(output) => parse_permission(&output),
            Err(e) => {
                tracing::warn!("Unable to read NetworkManager permissions: {}", e);
                AuthorizationState::Unknown
            }
        }
    }
}

impl PermissionProvider for NmPermission {
    fn current_state(&self) -> AuthorizationState {
        Self::read_state()
    }

    /// Triggers a rescan in the background so the polkit agent can prompt,
    /// then reports the outcome to the observers from that thread. A request
    /// that ends without authorization is reported as denied.
    fn request_permission(&self) {
        let observers = self.observers.clone();

        thread::spawn(move || {
            let state = match nmcli(&["device", "wifi", "rescan"]) {
                Ok(_) => AuthorizationState::Granted,
                Err(e) => {
                    tracing::debug!("Rescan for authorization failed: {}", e);
                    match Self::read_state() {
                        AuthorizationState::Unknown => AuthorizationState::Denied,
                        state => state,
                    }
                }
            };

            let observers = observers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            for observer in observers {
                observer.on_state_changed(state);
            }
        });
    }

    fn register_observer(&self, observer: Arc<dyn AuthorizationObserver>) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }
}
