use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::permission::{AuthorizationObserver, PermissionProvider};

#[derive(Debug, Default, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum AuthorizationState {
    /// The user has not been asked yet
    #[default]
    Unknown,
    /// A request is out, waiting for the subsystem to answer
    Pending,
    Granted,
    Denied,
    /// Blocked by policy, the user cannot change it
    Restricted,
}

impl AuthorizationState {
    pub fn label(&self) -> &'static str {
        match self {
            AuthorizationState::Unknown => "not determined",
            AuthorizationState::Pending => "pending",
            AuthorizationState::Granted => "authorized",
            AuthorizationState::Denied => "denied",
            AuthorizationState::Restricted => "restricted",
        }
    }

    /// Denied or Restricted: only an OS-level change can lift these.
    pub fn is_refused(&self) -> bool {
        matches!(
            self,
            AuthorizationState::Denied | AuthorizationState::Restricted
        )
    }
}

struct GateCell {
    state: Mutex<AuthorizationState>,
    changed: Condvar,
    latched: AtomicBool,
}

impl GateCell {
    fn lock(&self) -> MutexGuard<'_, AuthorizationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_latched(&self) -> bool {
        self.latched.load(Ordering::Acquire)
    }
}

impl AuthorizationObserver for GateCell {
    fn on_state_changed(&self, state: AuthorizationState) {
        let mut current = self.lock();

        // A pending request only settles on an answer.
        if *current == AuthorizationState::Pending
            && matches!(
                state,
                AuthorizationState::Unknown | AuthorizationState::Pending
            )
        {
            tracing::trace!(reported = state.label(), "Ignoring non-terminal update");
            return;
        }

        if *current != state {
            tracing::info!(
                "Location authorization status changed to: {}",
                state.label()
            );
        }

        *current = state;
        self.changed.notify_all();
    }
}

/// Tracks whether the radio may be scanned.
///
/// The state cell is written by the permission subsystem's callback thread
/// and read by the scanning thread. Once a probe scan has succeeded the gate
/// is latched to Granted for the rest of the process.
pub struct AuthorizationGate {
    cell: Arc<GateCell>,
    provider: Arc<dyn PermissionProvider>,
}

impl AuthorizationGate {
    pub fn new(provider: Arc<dyn PermissionProvider>) -> Self {
        let cell = Arc::new(GateCell {
            state: Mutex::new(AuthorizationState::Unknown),
            changed: Condvar::new(),
            latched: AtomicBool::new(false),
        });

        provider.register_observer(cell.clone());

        // Seed after registering so no change slips between read and register.
        // Callbacks wait on the lock and apply on top of the seeded value.
        {
            let mut state = cell.lock();
            *state = provider.current_state();
        }

        Self { cell, provider }
    }

    pub fn current_state(&self) -> AuthorizationState {
        if self.cell.is_latched() {
            return AuthorizationState::Granted;
        }
        *self.cell.lock()
    }

    /// Issues the permission request once, when nobody has asked yet.
    ///
    /// Returns whether a request went out.
    pub fn request_if_undetermined(&self) -> bool {
        let issue = {
            let mut state = self.cell.lock();
            if *state == AuthorizationState::Unknown && !self.cell.is_latched() {
                *state = AuthorizationState::Pending;
                true
            } else {
                false
            }
        };

        if issue {
            tracing::info!("Requesting location authorization...");
            self.provider.request_permission();
        }

        issue
    }

    /// Blocks while a request is pending, for at most `timeout`.
    ///
    /// Running out of time is not an error: the caller gets `Pending` back and
    /// must treat it as not authorized yet.
    pub fn await_terminal(&self, timeout: Duration) -> AuthorizationState {
        let state = self.cell.lock();
        let (state, result) = self
            .cell
            .changed
            .wait_timeout_while(state, timeout, |state| {
                *state == AuthorizationState::Pending && !self.cell.is_latched()
            })
            .unwrap_or_else(PoisonError::into_inner);
        drop(state);

        if result.timed_out() {
            tracing::debug!(?timeout, "Timed out waiting for authorization");
        }

        self.current_state()
    }

    pub fn may_scan(&self) -> bool {
        self.current_state() == AuthorizationState::Granted
    }

    /// Like [`may_scan`](Self::may_scan), but when the state machine has not
    /// reached a verdict yet runs `probe` (one real scan) and latches the gate
    /// if it reports success. Refused states never probe.
    pub fn may_scan_or_probe<F>(&self, probe: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        if self.may_scan() {
            return true;
        }
        if self.current_state().is_refused() {
            return false;
        }
        if probe() {
            self.latch();
            return true;
        }
        false
    }

    pub fn latch(&self) {
        if !self.cell.latched.swap(true, Ordering::AcqRel) {
            tracing::info!("Location services already authorized - WiFi scanning working");
        }
        let _state = self.cell.lock();
        self.cell.changed.notify_all();
    }

    pub fn is_latched(&self) -> bool {
        self.cell.is_latched()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Instant;

    use super::*;
    use crate::mock::MockPermission;

    /// Grants permission while the observer is being registered, before any
    /// observer is listening, so nobody is told about the change.
    struct GrantedDuringRegistration {
        state: Mutex<AuthorizationState>,
    }

    impl PermissionProvider for GrantedDuringRegistration {
        fn current_state(&self) -> AuthorizationState {
            *self.state.lock().unwrap()
        }

        fn request_permission(&self) {}

        fn register_observer(&self, _observer: Arc<dyn AuthorizationObserver>) {
            *self.state.lock().unwrap() = AuthorizationState::Granted;
        }
    }

    #[test]
    fn test_change_during_registration_is_not_lost() {
        let gate = AuthorizationGate::new(Arc::new(GrantedDuringRegistration {
            state: Mutex::new(AuthorizationState::Unknown),
        }));

        assert_eq!(gate.current_state(), AuthorizationState::Granted);
        assert!(gate.may_scan());
        assert!(!gate.request_if_undetermined());
    }

    #[test]
    fn test_request_is_issued_once() {
        let permission = Arc::new(MockPermission::new(AuthorizationState::Unknown));
        let gate = AuthorizationGate::new(permission.clone());

        assert!(gate.request_if_undetermined());
        assert_eq!(gate.current_state(), AuthorizationState::Pending);
        assert!(!gate.request_if_undetermined());
        assert_eq!(permission.request_count(), 1);
        assert!(!gate.may_scan());
    }

    #[test]
    fn test_request_is_noop_when_decided() {
        for state in [
            AuthorizationState::Granted,
            AuthorizationState::Denied,
            AuthorizationState::Restricted,
        ] {
            let permission = Arc::new(MockPermission::new(state));
            let gate = AuthorizationGate::new(permission.clone());

            assert!(!gate.request_if_undetermined());
            assert_eq!(gate.current_state(), state);
            assert_eq!(permission.request_count(), 0);
        }
    }

    #[test]
    fn test_pending_ignores_non_terminal_updates() {
        let permission = Arc::new(MockPermission::new(AuthorizationState::Unknown));
        let gate = AuthorizationGate::new(permission.clone());
        gate.request_if_undetermined();

        permission.deliver(AuthorizationState::Unknown);
        assert_eq!(gate.current_state(), AuthorizationState::Pending);

        permission.deliver(AuthorizationState::Denied);
        assert_eq!(gate.current_state(), AuthorizationState::Denied);
        assert!(!gate.may_scan());
    }

    #[test]
    fn test_await_terminal_times_out_with_pending() {
        let permission = Arc::new(MockPermission::new(AuthorizationState::Unknown));
        let gate = AuthorizationGate::new(permission);
        gate.request_if_undetermined();

        let state = gate.await_terminal(Duration::from_millis(50));
        assert_eq!(state, AuthorizationState::Pending);
        assert!(!gate.may_scan());
    }

    #[test]
    fn test_await_terminal_returns_immediately_when_not_pending() {
        let permission = Arc::new(MockPermission::new(AuthorizationState::Unknown));
        let gate = AuthorizationGate::new(permission);

        let start = Instant::now();
        assert_eq!(
            gate.await_terminal(Duration::from_secs(30)),
            AuthorizationState::Unknown
        );
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_await_terminal_wakes_on_callback() {
        let permission = Arc::new(MockPermission::new(AuthorizationState::Unknown));
        let gate = AuthorizationGate::new(permission.clone());
        gate.request_if_undetermined();

        let callback = thread::spawn({
            let permission = permission.clone();
            move || {
                thread::sleep(Duration::from_millis(20));
                permission.deliver(AuthorizationState::Granted);
            }
        });

        let start = Instant::now();
        let state = gate.await_terminal(Duration::from_secs(30));
        callback.join().unwrap();

        assert_eq!(state, AuthorizationState::Granted);
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(gate.may_scan());
    }

    #[test]
    fn test_probe_latches_and_sticks() {
        let permission = Arc::new(MockPermission::new(AuthorizationState::Unknown));
        let gate = AuthorizationGate::new(permission.clone());

        assert!(!gate.may_scan_or_probe(|| false));
        assert!(!gate.is_latched());

        assert!(gate.may_scan_or_probe(|| true));
        assert!(gate.is_latched());
        assert_eq!(gate.current_state(), AuthorizationState::Granted);

        // Later reports cannot unlatch the gate
        permission.deliver(AuthorizationState::Denied);
        assert!(gate.may_scan());
        assert!(!gate.request_if_undetermined());
    }

    #[test]
    fn test_refused_states_never_probe() {
        for state in [AuthorizationState::Denied, AuthorizationState::Restricted] {
            let gate = AuthorizationGate::new(Arc::new(MockPermission::new(state)));
            let mut probed = false;

            assert!(!gate.may_scan_or_probe(|| {
                probed = true;
                true
            }));
            assert!(!probed);
        }
    }

    #[test]
    fn test_external_change_lifts_denial() {
        let permission = Arc::new(MockPermission::new(AuthorizationState::Denied));
        let gate = AuthorizationGate::new(permission.clone());
        assert!(!gate.may_scan());

        permission.deliver(AuthorizationState::Granted);
        assert!(gate.may_scan());
    }
}
