use std::sync::Arc;

use airprobe_core::authorization::{AuthorizationGate, AuthorizationState};
use airprobe_core::config::ErrorPolicy;
use airprobe_core::executor::ScanExecutor;
use airprobe_core::mock::{MockPermission, MockRadio, RecordingSleeper};
use airprobe_core::scanner::RetryingScanner;

pub struct MockScanner {
    pub radio: Arc<MockRadio>,
    pub permission: Arc<MockPermission>,
    pub sleeper: Arc<RecordingSleeper>,
    pub gate: Arc<AuthorizationGate>,
    pub scanner: RetryingScanner,
}

impl MockScanner {
    pub fn new(radio: MockRadio, state: AuthorizationState) -> Self {
        Self::with(
            radio,
            MockPermission::new(state),
            RecordingSleeper::new(),
            ErrorPolicy::RetryAll,
        )
    }

    pub fn with(
        radio: MockRadio,
        permission: MockPermission,
        sleeper: RecordingSleeper,
        policy: ErrorPolicy,
    ) -> Self {
        let radio = Arc::new(radio);
        let permission = Arc::new(permission);
        let sleeper = Arc::new(sleeper);

        let gate = Arc::new(AuthorizationGate::new(permission.clone()));
        let executor = ScanExecutor::new(radio.clone(), policy);
        let scanner = RetryingScanner::new(executor, gate.clone()).with_sleeper(sleeper.clone());

        Self {
            radio,
            permission,
            sleeper,
            gate,
            scanner,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.scanner = self.scanner.with_max_attempts(Some(max_attempts));
        self
    }

    pub fn without_probe(mut self) -> Self {
        self.scanner = self.scanner.with_opportunistic_probe(false);
        self
    }
}
