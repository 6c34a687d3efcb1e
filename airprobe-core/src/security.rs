use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

const LABELS: [&str; 13] = [
    "None",
    "WEP",
    "WPA Personal",
    "WPA/WPA2 Personal",
    "WPA2 Personal",
    "WPA2/WPA3 Personal",
    "WPA3 Personal",
    "Dynamic WEP",
    "WPA Enterprise",
    "WPA/WPA2 Enterprise",
    "WPA2 Enterprise",
    "WPA2/WPA3 Enterprise",
    "WPA3 Enterprise",
];

/// Human-readable label for a radio security-mode code.
///
/// Total over `i64`: codes outside the known table come back as
/// `"Unknown (<code>)"`.
pub fn label(code: i64) -> String {
    usize::try_from(code)
        .ok()
        .and_then(|index| LABELS.get(index))
        .map(|label| label.to_string())
        .unwrap_or_else(|| format!("Unknown ({code})"))
}

/// Security mode reported by the radio, kept as the raw integer code.
#[derive(Debug, Default, Clone, Copy, Hash, Eq, PartialEq, Deserialize)]
pub struct SecurityMode(pub i64);

impl SecurityMode {
    pub const NONE: SecurityMode = SecurityMode(0);
    pub const WEP: SecurityMode = SecurityMode(1);
    pub const WPA_PERSONAL: SecurityMode = SecurityMode(2);
    pub const WPA_WPA2_PERSONAL: SecurityMode = SecurityMode(3);
    pub const WPA2_PERSONAL: SecurityMode = SecurityMode(4);
    pub const WPA2_WPA3_PERSONAL: SecurityMode = SecurityMode(5);
    pub const WPA3_PERSONAL: SecurityMode = SecurityMode(6);
    pub const DYNAMIC_WEP: SecurityMode = SecurityMode(7);
    pub const WPA_ENTERPRISE: SecurityMode = SecurityMode(8);
    pub const WPA_WPA2_ENTERPRISE: SecurityMode = SecurityMode(9);
    pub const WPA2_ENTERPRISE: SecurityMode = SecurityMode(10);
    pub const WPA2_WPA3_ENTERPRISE: SecurityMode = SecurityMode(11);
    pub const WPA3_ENTERPRISE: SecurityMode = SecurityMode(12);

    pub fn code(&self) -> i64 {
        self.0
    }

    pub fn label(&self) -> String {
        label(self.0)
    }

    pub fn is_known(&self) -> bool {
        (0..LABELS.len() as i64).contains(&self.0)
    }
}

impl From<i64> for SecurityMode {
    fn from(code: i64) -> Self {
        SecurityMode(code)
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for SecurityMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SecurityMode", 2)?;
        state.serialize_field("code", &self.0)?;
        state.serialize_field("label", &self.label())?;
        state.end()
    }
}
