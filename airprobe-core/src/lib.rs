pub mod authorization;
pub mod config;
pub mod error;
pub mod executor;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod permission;
pub mod platform;
pub mod radio;
pub mod records;
pub mod scanner;
pub mod security;
pub mod wifi;

pub use authorization::{AuthorizationGate, AuthorizationState};
pub use config::{ErrorPolicy, ScannerConfig};
pub use error::{ExtractionError, RadioError, Result, ScanError};
pub use executor::{ScanExecutor, ScanOutcome};
pub use permission::{AuthorizationObserver, PermissionProvider};
pub use radio::{Radio, RawAssociation, RawProfile, RawScanEntry};
pub use records::{AssociationInfo, NetworkRecordBuilder, ObservedNetwork, PreferredNetwork};
pub use scanner::{CancelToken, RetryingScanner, Sleeper, ThreadSleeper};
pub use security::SecurityMode;
pub use wifi::WifiScanner;
