use std::sync::Arc;

use crate::config::ErrorPolicy;
use crate::error::ErrorDomain;
use crate::radio::Radio;
use crate::records::{NetworkRecordBuilder, ObservedNetwork};

/// Classified result of one scan attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Success(Vec<ObservedNetwork>),
    /// No error, but nothing usable came back
    EmptyRetryable,
    TransientError { domain: ErrorDomain, code: i64 },
    PermanentError { domain: ErrorDomain, code: i64 },
}

impl ScanOutcome {
    /// The radio answered without reporting an error.
    pub fn is_error_free(&self) -> bool {
        matches!(self, ScanOutcome::Success(_) | ScanOutcome::EmptyRetryable)
    }
}

/// Runs exactly one scan against the radio and classifies what happened.
#[derive(Clone)]
pub struct ScanExecutor {
    radio: Arc<dyn Radio>,
    policy: ErrorPolicy,
}

impl ScanExecutor {
    pub fn new(radio: Arc<dyn Radio>, policy: ErrorPolicy) -> Self {
        Self { radio, policy }
    }

    pub fn attempt(&self, ssid_filter: Option<&str>) -> ScanOutcome {
        match self.radio.scan_once(ssid_filter) {
            Ok(entries) => {
                let networks = NetworkRecordBuilder::build_observed(entries);
                if networks.is_empty() {
                    ScanOutcome::EmptyRetryable
                } else {
                    ScanOutcome::Success(networks)
                }
            }
            Err(e) if e.is_busy() => {
                tracing::debug!(message = %e.message, "Radio busy");
                ScanOutcome::TransientError {
                    domain: e.domain,
                    code: e.code,
                }
            }
            Err(e) => {
                tracing::debug!(
                    domain = %e.domain,
                    code = e.code,
                    message = %e.message,
                    "Scan reported an error"
                );
                match self.policy {
                    ErrorPolicy::RetryAll => ScanOutcome::TransientError {
                        domain: e.domain,
                        code: e.code,
                    },
                    ErrorPolicy::BusyOnly => ScanOutcome::PermanentError {
                        domain: e.domain,
                        code: e.code,
                    },
                }
            }
        }
    }
}
