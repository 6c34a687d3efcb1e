use crate::error::RadioError;

/// One entry from a radio scan, exactly as the driver handed it over.
///
/// Every field is optional: drivers routinely omit values they could not
/// read, and the record builder decides which gaps make an entry unusable.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawScanEntry {
    pub ssid: Option<String>,
    pub bssid: Option<String>,
    pub rssi: Option<i64>,
    pub channel: Option<i64>,
    pub ibss: Option<bool>,
    pub noise: Option<i64>,
    pub country_code: Option<String>,
}

/// Fields of the association the interface currently holds.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawAssociation {
    pub interface_name: Option<String>,
    pub ssid: Option<String>,
    pub bssid: Option<String>,
    pub channel: Option<i64>,
    pub rssi: Option<i64>,
    pub noise: Option<i64>,
    pub tx_rate: Option<f64>,
    pub security: Option<i64>,
}

/// A saved network profile from the interface configuration.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawProfile {
    pub ssid: Option<String>,
    pub security: Option<i64>,
    pub auto_join: Option<bool>,
    /// Seconds since the Unix epoch; zero means never connected.
    pub last_connected: Option<i64>,
}

/// The wireless radio of a single interface.
///
/// Calls block the caller for the duration of the radio operation. Only one
/// scan may be in flight per interface.
pub trait Radio: Send + Sync {
    fn interface_name(&self) -> &str;

    /// `Ok(None)` when the interface is not associated.
    fn current_association(&self) -> Result<Option<RawAssociation>, RadioError>;

    /// Issue exactly one scan, optionally restricted to one SSID.
    fn scan_once(&self, ssid_filter: Option<&str>) -> Result<Vec<RawScanEntry>, RadioError>;

    /// `Ok(None)` when no saved-network configuration exists.
    fn saved_profiles(&self) -> Result<Option<Vec<RawProfile>>, RadioError>;
}
