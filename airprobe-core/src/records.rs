use serde::Serialize;
use time::OffsetDateTime;

use crate::error::ExtractionError;
use crate::radio::{RawAssociation, RawProfile, RawScanEntry};
use crate::security::SecurityMode;

/// Snapshot of the current association, built fresh on every query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationInfo {
    pub interface_name: String,
    pub ssid: Option<String>,
    pub bssid: Option<String>,
    pub channel: u32,
    pub rssi: i32,
    pub noise: i32,
    pub tx_rate: f64,
    /// `None` when the radio does not report a mode
    pub security_mode: Option<SecurityMode>,
}

/// One hit from a scan. Duplicates across channels are kept as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservedNetwork {
    pub ssid: Option<String>,
    pub bssid: Option<String>,
    pub rssi: i32,
    pub channel: u32,
    pub is_ibss: bool,
    pub noise: i32,
    /// Two-letter code, or empty when the AP does not advertise one.
    pub country_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferredNetwork {
    pub ssid: String,
    pub security_mode: SecurityMode,
    pub auto_join: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_connected: Option<OffsetDateTime>,
}

/// Turns raw radio entries into records, one entry at a time.
///
/// A malformed entry is dropped whole and logged; the rest of the batch is
/// kept in input order.
pub struct NetworkRecordBuilder;

impl NetworkRecordBuilder {
    pub fn build_observed<I>(entries: I) -> Vec<ObservedNetwork>
    where
        I: IntoIterator<Item = RawScanEntry>,
    {
        entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match Self::observed(&entry) {
                Ok(network) => Some(network),
                Err(e) => {
                    tracing::warn!(
                        index,
                        ssid = entry.ssid.as_deref().unwrap_or(""),
                        "Error processing network: {}",
                        e
                    );
                    None
                }
            })
            .collect()
    }

    pub fn build_preferred(entries: Option<Vec<RawProfile>>) -> Vec<PreferredNetwork> {
        let Some(entries) = entries else {
            return Vec::new();
        };

        entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match Self::preferred(&entry) {
                Ok(network) => Some(network),
                Err(e) => {
                    tracing::warn!(index, "Error processing preferred network: {}", e);
                    None
                }
            })
            .collect()
    }

    pub fn observed(entry: &RawScanEntry) -> Result<ObservedNetwork, ExtractionError> {
        Ok(ObservedNetwork {
            ssid: entry.ssid.clone(),
            bssid: entry.bssid.clone(),
            rssi: to_i32("rssi", required("rssi", entry.rssi)?)?,
            channel: to_channel(required("channel", entry.channel)?)?,
            is_ibss: entry.ibss.unwrap_or(false),
            noise: to_i32("noise", required("noise", entry.noise)?)?,
            country_code: country_code(entry.country_code.as_deref())?,
        })
    }

    pub fn preferred(entry: &RawProfile) -> Result<PreferredNetwork, ExtractionError> {
        let ssid = entry
            .ssid
            .clone()
            .ok_or(ExtractionError::MissingField("ssid"))?;
        let security_mode = SecurityMode(required("security", entry.security)?);

        let last_connected = match entry.last_connected {
            None | Some(0) => None,
            Some(seconds) => Some(OffsetDateTime::from_unix_timestamp(seconds).map_err(
                |_| ExtractionError::OutOfRange {
                    field: "last_connected",
                    value: seconds.to_string(),
                },
            )?),
        };

        Ok(PreferredNetwork {
            ssid,
            security_mode,
            auto_join: entry.auto_join.unwrap_or(false),
            last_connected,
        })
    }

    pub fn association(
        raw: &RawAssociation,
        fallback_interface: &str,
    ) -> Result<AssociationInfo, ExtractionError> {
        let tx_rate = raw.tx_rate.unwrap_or(0.0);
        if !tx_rate.is_finite() || tx_rate < 0.0 {
            return Err(ExtractionError::OutOfRange {
                field: "tx_rate",
                value: tx_rate.to_string(),
            });
        }

        Ok(AssociationInfo {
            interface_name: raw
                .interface_name
                .clone()
                .unwrap_or_else(|| fallback_interface.to_string()),
            ssid: raw.ssid.clone(),
            bssid: raw.bssid.clone(),
            channel: to_channel(required("channel", raw.channel)?)?,
            rssi: to_i32("rssi", required("rssi", raw.rssi)?)?,
            noise: to_i32("noise", raw.noise.unwrap_or(0))?,
            tx_rate,
            security_mode: raw.security.map(SecurityMode),
        })
    }
}

fn required<T>(field: &'static str, value: Option<T>) -> Result<T, ExtractionError> {
    value.ok_or(ExtractionError::MissingField(field))
}

fn to_i32(field: &'static str, value: i64) -> Result<i32, ExtractionError> {
    i32::try_from(value).map_err(|_| ExtractionError::OutOfRange {
        field,
        value: value.to_string(),
    })
}

fn to_channel(value: i64) -> Result<u32, ExtractionError> {
    match u32::try_from(value) {
        Ok(channel) if channel > 0 => Ok(channel),
        _ => Err(ExtractionError::OutOfRange {
            field: "channel",
            value: value.to_string(),
        }),
    }
}

fn country_code(value: Option<&str>) -> Result<String, ExtractionError> {
    match value.map(str::trim) {
        None | Some("") => Ok(String::new()),
        Some(code) if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) => {
            Ok(code.to_ascii_uppercase())
        }
        Some(code) => Err(ExtractionError::InvalidCountryCode(code.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ssid: &str, bssid: &str, rssi: i64, channel: i64) -> RawScanEntry {
        RawScanEntry {
            ssid: Some(ssid.to_string()),
            bssid: Some(bssid.to_string()),
            rssi: Some(rssi),
            channel: Some(channel),
            ibss: Some(false),
            noise: Some(-90),
            country_code: Some("US".to_string()),
        }
    }

    #[test]
    fn test_malformed_entry_is_skipped_and_order_kept() {
        let mut broken = entry("Broken", "00:00:00:00:00:03", -60, 11);
        broken.rssi = None;

        let networks = NetworkRecordBuilder::build_observed(vec![
            entry("One", "00:00:00:00:00:01", -40, 1),
            entry("Two", "00:00:00:00:00:02", -50, 6),
            broken,
            entry("Four", "00:00:00:00:00:04", -70, 36),
            entry("Five", "00:00:00:00:00:05", -80, 149),
        ]);

        let names: Vec<_> = networks.iter().filter_map(|n| n.ssid.as_deref()).collect();
        assert_eq!(names, ["One", "Two", "Four", "Five"]);
    }

    #[test]
    fn test_duplicate_bssids_are_not_collapsed() {
        let networks = NetworkRecordBuilder::build_observed(vec![
            entry("Mesh", "aa:bb:cc:dd:ee:ff", -40, 1),
            entry("Mesh", "aa:bb:cc:dd:ee:ff", -55, 36),
        ]);

        assert_eq!(networks.len(), 2);
        assert_eq!(networks[0].channel, 1);
        assert_eq!(networks[1].channel, 36);
    }

    #[test]
    fn test_observed_field_validation() {
        let mut bad_channel = entry("X", "x", -40, 0);
        assert!(matches!(
            NetworkRecordBuilder::observed(&bad_channel),
            Err(ExtractionError::OutOfRange { field: "channel", .. })
        ));

        bad_channel.channel = Some(6);
        bad_channel.country_code = Some("USA".to_string());
        assert!(matches!(
            NetworkRecordBuilder::observed(&bad_channel),
            Err(ExtractionError::InvalidCountryCode(_))
        ));

        let mut hidden = entry("", "x", -40, 6);
        hidden.ssid = None;
        hidden.country_code = None;
        hidden.ibss = None;
        let network = NetworkRecordBuilder::observed(&hidden).unwrap();
        assert_eq!(network.ssid, None);
        assert_eq!(network.country_code, "");
        assert!(!network.is_ibss);

        let mut huge = entry("X", "x", i64::from(i32::MAX) + 1, 6);
        assert!(NetworkRecordBuilder::observed(&huge).is_err());
        huge.rssi = Some(-40);
        huge.noise = None;
        assert_eq!(
            NetworkRecordBuilder::observed(&huge),
            Err(ExtractionError::MissingField("noise"))
        );
    }

    #[test]
    fn test_preferred_absent_collection_is_empty() {
        assert!(NetworkRecordBuilder::build_preferred(None).is_empty());
        assert!(NetworkRecordBuilder::build_preferred(Some(Vec::new())).is_empty());
    }

    #[test]
    fn test_preferred_last_connected() {
        let profiles = vec![
            RawProfile {
                ssid: Some("Home".to_string()),
                security: Some(4),
                auto_join: Some(true),
                last_connected: Some(1_700_000_000),
            },
            RawProfile {
                ssid: Some("Never".to_string()),
                security: Some(0),
                auto_join: None,
                last_connected: Some(0),
            },
            RawProfile {
                ssid: None,
                security: Some(0),
                auto_join: Some(true),
                last_connected: None,
            },
        ];

        let networks = NetworkRecordBuilder::build_preferred(Some(profiles));
        assert_eq!(networks.len(), 2);

        assert_eq!(networks[0].ssid, "Home");
        assert_eq!(networks[0].security_mode, SecurityMode::WPA2_PERSONAL);
        assert!(networks[0].auto_join);
        assert_eq!(
            networks[0].last_connected.map(|t| t.unix_timestamp()),
            Some(1_700_000_000)
        );

        assert_eq!(networks[1].ssid, "Never");
        assert!(!networks[1].auto_join);
        assert_eq!(networks[1].last_connected, None);
    }

    #[test]
    fn test_association() {
        let raw = RawAssociation {
            interface_name: None,
            ssid: Some("CafeWiFi".to_string()),
            bssid: None,
            channel: Some(6),
            rssi: Some(-45),
            noise: Some(-90),
            tx_rate: Some(144.5),
            security: Some(4),
        };

        let info = NetworkRecordBuilder::association(&raw, "wlan0").unwrap();
        assert_eq!(info.interface_name, "wlan0");
        assert_eq!(info.channel, 6);
        assert_eq!(info.tx_rate, 144.5);
        assert_eq!(info.security_mode, Some(SecurityMode::WPA2_PERSONAL));

        let negative_rate = RawAssociation {
            tx_rate: Some(-1.0),
            ..raw.clone()
        };
        assert!(NetworkRecordBuilder::association(&negative_rate, "wlan0").is_err());

        let no_security = RawAssociation {
            security: None,
            ..raw
        };
        let info = NetworkRecordBuilder::association(&no_security, "wlan0").unwrap();
        assert_eq!(info.security_mode, None);

        let unlisted_code = RawAssociation {
            security: Some(42),
            ..no_security
        };
        let info = NetworkRecordBuilder::association(&unlisted_code, "wlan0").unwrap();
        assert_eq!(
            info.security_mode.map(|mode| mode.label()).as_deref(),
            Some("Unknown (42)")
        );
    }
}
