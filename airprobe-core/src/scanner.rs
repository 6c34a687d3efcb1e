use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::authorization::AuthorizationGate;
use crate::error::{EBUSY, ErrorDomain, Result, ScanError};
use crate::executor::{ScanExecutor, ScanOutcome};
use crate::records::ObservedNetwork;

/// Shared stop flag for a running scan.
///
/// Cancelling wakes any retry pause waiting on the token.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (cancelled, wake) = &*self.inner;
        *cancelled.lock().unwrap_or_else(PoisonError::into_inner) = true;
        wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits up to `timeout`, returning early if cancelled.
    ///
    /// Returns `true` when the token was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (cancelled, wake) = &*self.inner;
        let guard = cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = wake
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// The pause between scan attempts.
pub trait Sleeper: Send + Sync {
    /// Returns `false` when the pause was cut short by cancellation.
    fn sleep(&self, delay: Duration, cancel: &CancelToken) -> bool;
}

/// Blocks the calling thread, waking early on cancellation.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration, cancel: &CancelToken) -> bool {
        !cancel.wait_timeout(delay)
    }
}

/// Retries scans at a constant delay until one returns networks.
///
/// Authorization is checked once per call, before the first attempt. Without
/// an attempt ceiling the loop only ends on results, cancellation or, under
/// the busy-only policy, a non-busy error.
pub struct RetryingScanner {
    executor: ScanExecutor,
    gate: Arc<AuthorizationGate>,
    sleeper: Arc<dyn Sleeper>,
    max_attempts: Option<u32>,
    opportunistic_probe: bool,
}

impl RetryingScanner {
    pub fn new(executor: ScanExecutor, gate: Arc<AuthorizationGate>) -> Self {
        Self {
            executor,
            gate,
            sleeper: Arc::new(ThreadSleeper),
            max_attempts: None,
            opportunistic_probe: true,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts.filter(|max| *max > 0);
        self
    }

    pub fn with_opportunistic_probe(mut self, enabled: bool) -> Self {
        self.opportunistic_probe = enabled;
        self
    }

    /// Whether a scan may run now, probing the radio once if the permission
    /// state is still undecided and probing is enabled.
    pub fn check_authorization(&self) -> bool {
        if self.opportunistic_probe {
            self.gate
                .may_scan_or_probe(|| self.executor.attempt(None).is_error_free())
        } else {
            self.gate.may_scan()
        }
    }

    /// Unauthorized calls return an empty list without touching the radio's
    /// scan loop.
    pub fn scan(
        &self,
        ssid_filter: Option<&str>,
        retry_delay: Duration,
        cancel: &CancelToken,
    ) -> Result<Vec<ObservedNetwork>> {
        if !self.check_authorization() {
            tracing::error!("Location authorization required for network scanning");
            tracing::error!("Please enable location services and try again");
            return Ok(Vec::new());
        }

        let mut attempt: u32 = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(ScanError::Cancelled {
                    attempts: attempt - 1,
                });
            }

            match self.executor.attempt(ssid_filter) {
                ScanOutcome::Success(networks) => {
                    tracing::debug!(attempt, count = networks.len(), "Scan succeeded");
                    return Ok(networks);
                }
                ScanOutcome::EmptyRetryable => {
                    tracing::debug!(attempt, "No networks found, retrying...");
                }
                ScanOutcome::TransientError {
                    domain: ErrorDomain::Posix,
                    code: EBUSY,
                } => {
                    tracing::debug!(
                        "Scan attempt {} failed with resource busy, retrying...",
                        attempt
                    );
                }
                ScanOutcome::TransientError { domain, code } => {
                    tracing::debug!(
                        "Scan attempt {} failed: domain={}, code={}",
                        attempt,
                        domain,
                        code
                    );
                }
                ScanOutcome::PermanentError { domain, code } => {
                    tracing::warn!(attempt, %domain, code, "Scan failed permanently");
                    return Err(ScanError::ScanFailed { domain, code });
                }
            }

            if self.max_attempts.is_some_and(|max| attempt >= max) {
                return Err(ScanError::AttemptsExhausted { attempts: attempt });
            }

            if cancel.is_cancelled() || !self.sleeper.sleep(retry_delay, cancel) {
                return Err(ScanError::Cancelled { attempts: attempt });
            }

            attempt += 1;
        }
    }
}
