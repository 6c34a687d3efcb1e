use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which scan errors are worth another attempt.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Retry every reported error. The driver does not reliably tell a busy
    /// radio apart from a misconfigured request.
    #[default]
    RetryAll,
    /// Retry only POSIX `EBUSY`, fail on anything else.
    BusyOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Constant pause between scan attempts (milliseconds)
    pub retry_delay_ms: u64,
    /// Give up after this many attempts, `None` retries until cancelled
    pub max_attempts: Option<u32>,
    pub error_policy: ErrorPolicy,
    /// Latch authorization after one error-free probe scan
    pub opportunistic_probe: bool,
    /// How long to wait for a pending permission request (milliseconds)
    pub auth_timeout_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: 2000, // 2 seconds
            max_attempts: None,
            error_policy: ErrorPolicy::RetryAll,
            opportunistic_probe: true,
            auth_timeout_ms: 30000, // 30 seconds
        }
    }
}

impl ScannerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ScannerConfig = serde_json::from_str(
            r#"{ "retry_delay_ms": 500, "max_attempts": 4, "error_policy": "busy_only" }"#,
        )
        .unwrap();

        assert_eq!(config.retry_delay(), Duration::from_millis(500));
        assert_eq!(config.max_attempts, Some(4));
        assert_eq!(config.error_policy, ErrorPolicy::BusyOnly);
        assert!(config.opportunistic_probe);
        assert_eq!(config.auth_timeout(), Duration::from_secs(30));
    }
}
