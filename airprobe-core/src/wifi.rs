use std::sync::Arc;
use std::time::Duration;

use crate::authorization::{AuthorizationGate, AuthorizationState};
use crate::config::ScannerConfig;
use crate::error::Result;
use crate::executor::ScanExecutor;
use crate::permission::PermissionProvider;
use crate::radio::Radio;
use crate::records::{AssociationInfo, NetworkRecordBuilder, ObservedNetwork, PreferredNetwork};
use crate::scanner::{CancelToken, RetryingScanner, Sleeper};

/// Queries one wireless interface for its association, nearby networks and
/// saved profiles, behind the scan permission gate.
pub struct WifiScanner {
    radio: Arc<dyn Radio>,
    gate: Arc<AuthorizationGate>,
    scanner: RetryingScanner,
    config: ScannerConfig,
}

impl WifiScanner {
    pub fn new(
        radio: Arc<dyn Radio>,
        permission: Arc<dyn PermissionProvider>,
        config: ScannerConfig,
    ) -> Self {
        Self::build(radio, permission, config, None)
    }

    pub fn with_sleeper(
        radio: Arc<dyn Radio>,
        permission: Arc<dyn PermissionProvider>,
        config: ScannerConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self::build(radio, permission, config, Some(sleeper))
    }

    fn build(
        radio: Arc<dyn Radio>,
        permission: Arc<dyn PermissionProvider>,
        config: ScannerConfig,
        sleeper: Option<Arc<dyn Sleeper>>,
    ) -> Self {
        tracing::info!("Using WiFi interface: {}", radio.interface_name());

        let gate = Arc::new(AuthorizationGate::new(permission));
        let executor = ScanExecutor::new(radio.clone(), config.error_policy);
        let mut scanner = RetryingScanner::new(executor, gate.clone())
            .with_max_attempts(config.max_attempts)
            .with_opportunistic_probe(config.opportunistic_probe);
        if let Some(sleeper) = sleeper {
            scanner = scanner.with_sleeper(sleeper);
        }

        let wifi = Self {
            radio,
            gate,
            scanner,
            config,
        };
        wifi.initialize_authorization();
        wifi
    }

    fn initialize_authorization(&self) {
        if self.scanner.check_authorization() {
            if !self.gate.is_latched() {
                tracing::info!("Location services authorized in system settings");
            }
            return;
        }

        match self.gate.current_state() {
            AuthorizationState::Unknown => {
                self.gate.request_if_undetermined();
            }
            AuthorizationState::Pending | AuthorizationState::Granted => {}
            AuthorizationState::Denied | AuthorizationState::Restricted => {
                tracing::error!("Location services not authorized. WiFi scanning may be limited.");
                tracing::error!(
                    "Please enable location services for this application in System Settings."
                );
            }
        }
    }

    pub fn interface_name(&self) -> &str {
        self.radio.interface_name()
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn gate(&self) -> &Arc<AuthorizationGate> {
        &self.gate
    }

    pub fn authorization_state(&self) -> AuthorizationState {
        self.gate.current_state()
    }

    /// Waits for a pending permission request to settle.
    ///
    /// `None` uses the configured timeout.
    pub fn await_authorization(&self, timeout: Option<Duration>) -> AuthorizationState {
        self.gate
            .await_terminal(timeout.unwrap_or_else(|| self.config.auth_timeout()))
    }

    pub fn check_authorization(&self) -> bool {
        self.scanner.check_authorization()
    }

    pub fn current_network(&self) -> Option<AssociationInfo> {
        if !self.check_authorization() {
            tracing::warn!("Limited network information available without location authorization");
        }

        let raw = match self.radio.current_association() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!(interface = self.interface_name(), "Interface not associated");
                return None;
            }
            Err(e) => {
                tracing::error!("Error getting current network: {}", e);
                return None;
            }
        };

        NetworkRecordBuilder::association(&raw, self.interface_name())
            .map_err(|e| tracing::error!("Error getting current network: {}", e))
            .ok()
    }

    /// Scans until networks are found, using the configured retry delay.
    pub fn scan_networks(
        &self,
        ssid_filter: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Vec<ObservedNetwork>> {
        self.scanner.scan(ssid_filter, self.config.retry_delay(), cancel)
    }

    pub fn preferred_networks(&self) -> Vec<PreferredNetwork> {
        if !self.check_authorization() {
            tracing::warn!("Limited network information available without location authorization");
        }

        match self.radio.saved_profiles() {
            Ok(profiles) => NetworkRecordBuilder::build_preferred(profiles),
            Err(e) => {
                tracing::error!("Error getting preferred networks: {}", e);
                Vec::new()
            }
        }
    }
}
