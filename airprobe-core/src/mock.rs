//! In-memory collaborators for tests and offline demos.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::authorization::AuthorizationState;
use crate::error::RadioError;
use crate::permission::{AuthorizationObserver, PermissionProvider};
use crate::radio::{Radio, RawAssociation, RawProfile, RawScanEntry};
use crate::scanner::{CancelToken, Sleeper};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub type ScanResult = Result<Vec<RawScanEntry>, RadioError>;

/// Radio that replays a script of scan results.
///
/// Once the script runs out every further scan returns the fallback, which
/// defaults to an empty result.
pub struct MockRadio {
    interface: String,
    scans: Mutex<VecDeque<ScanResult>>,
    fallback: ScanResult,
    association: Result<Option<RawAssociation>, RadioError>,
    profiles: Result<Option<Vec<RawProfile>>, RadioError>,
    scan_calls: AtomicUsize,
    filters: Mutex<Vec<Option<String>>>,
}

impl MockRadio {
    pub fn new<S: Into<String>>(interface: S) -> Self {
        Self {
            interface: interface.into(),
            scans: Mutex::new(VecDeque::new()),
            fallback: Ok(Vec::new()),
            association: Ok(None),
            profiles: Ok(None),
            scan_calls: AtomicUsize::new(0),
            filters: Mutex::new(Vec::new()),
        }
    }

    /// A radio that is busy once, then sees three networks.
    pub fn demo() -> Self {
        Self::new("en0")
            .with_scans(vec![
                Err(RadioError::busy("Resource busy")),
                Ok(vec![
                    entry("CafeWiFi", "3c:22:fb:10:20:30", -45, 6, -90, "US"),
                    entry("Library", "3c:22:fb:10:20:31", -67, 36, -92, "US"),
                    entry("Printer-Direct", "02:11:22:33:44:55", -71, 11, -91, ""),
                ]),
            ])
            .with_association(Some(RawAssociation {
                interface_name: Some("en0".to_string()),
                ssid: Some("CafeWiFi".to_string()),
                bssid: Some("3c:22:fb:10:20:30".to_string()),
                channel: Some(6),
                rssi: Some(-45),
                noise: Some(-90),
                tx_rate: Some(144.0),
                security: Some(4),
            }))
            .with_profiles(Some(vec![RawProfile {
                ssid: Some("CafeWiFi".to_string()),
                security: Some(4),
                auto_join: Some(true),
                last_connected: Some(1_700_000_000),
            }]))
    }

    pub fn with_scans(mut self, scans: Vec<ScanResult>) -> Self {
        self.scans = Mutex::new(scans.into());
        self
    }

    pub fn with_fallback(mut self, fallback: ScanResult) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_association(mut self, association: Option<RawAssociation>) -> Self {
        self.association = Ok(association);
        self
    }

    pub fn with_association_error(mut self, error: RadioError) -> Self {
        self.association = Err(error);
        self
    }

    pub fn with_profiles(mut self, profiles: Option<Vec<RawProfile>>) -> Self {
        self.profiles = Ok(profiles);
        self
    }

    pub fn with_profiles_error(mut self, error: RadioError) -> Self {
        self.profiles = Err(error);
        self
    }

    pub fn scan_calls(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }

    pub fn filters(&self) -> Vec<Option<String>> {
        lock(&self.filters).clone()
    }
}

impl Radio for MockRadio {
    fn interface_name(&self) -> &str {
        &self.interface
    }

    fn current_association(&self) -> Result<Option<RawAssociation>, RadioError> {
        self.association.clone()
    }

    fn scan_once(&self, ssid_filter: Option<&str>) -> ScanResult {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.filters).push(ssid_filter.map(str::to_string));

        lock(&self.scans)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn saved_profiles(&self) -> Result<Option<Vec<RawProfile>>, RadioError> {
        self.profiles.clone()
    }
}

/// Permission subsystem driven by the test.
///
/// [`deliver`](Self::deliver) plays the role of the OS callback and may be
/// called from any thread.
pub struct MockPermission {
    state: Arc<Mutex<AuthorizationState>>,
    observers: Mutex<Vec<Arc<dyn AuthorizationObserver>>>,
    requests: AtomicUsize,
    answer: Option<(AuthorizationState, Duration)>,
}

impl MockPermission {
    pub fn new(state: AuthorizationState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            observers: Mutex::new(Vec::new()),
            requests: AtomicUsize::new(0),
            answer: None,
        }
    }

    /// Answer every permission request with `state` after `delay`, from a
    /// separate thread.
    pub fn answering(mut self, state: AuthorizationState, delay: Duration) -> Self {
        self.answer = Some((state, delay));
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn deliver(&self, state: AuthorizationState) {
        *lock(&self.state) = state;

        let observers = lock(&self.observers).clone();
        for observer in observers {
            observer.on_state_changed(state);
        }
    }
}

impl PermissionProvider for MockPermission {
    fn current_state(&self) -> AuthorizationState {
        *lock(&self.state)
    }

    fn request_permission(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);

        if let Some((state, delay)) = self.answer {
            let current = self.state.clone();
            let observers = lock(&self.observers).clone();
            thread::spawn(move || {
                thread::sleep(delay);
                *lock(&current) = state;
                for observer in observers {
                    observer.on_state_changed(state);
                }
            });
        }
    }

    fn register_observer(&self, observer: Arc<dyn AuthorizationObserver>) {
        lock(&self.observers).push(observer);
    }
}

/// Records retry pauses instead of sleeping.
///
/// With a limit set, the pause that reaches the limit cancels the token, which
/// bounds loops that would otherwise retry forever.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
    cancel_after: Option<usize>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancelling_after(pauses: usize) -> Self {
        Self {
            delays: Mutex::new(Vec::new()),
            cancel_after: Some(pauses),
        }
    }

    pub fn delays(&self) -> Vec<Duration> {
        lock(&self.delays).clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, delay: Duration, cancel: &CancelToken) -> bool {
        let count = {
            let mut delays = lock(&self.delays);
            delays.push(delay);
            delays.len()
        };

        if self.cancel_after.is_some_and(|limit| count >= limit) {
            cancel.cancel();
        }

        !cancel.is_cancelled()
    }
}

pub fn entry(
    ssid: &str,
    bssid: &str,
    rssi: i64,
    channel: i64,
    noise: i64,
    country_code: &str,
) -> RawScanEntry {
    RawScanEntry {
        ssid: Some(ssid.to_string()),
        bssid: Some(bssid.to_string()),
        rssi: Some(rssi),
        channel: Some(channel),
        ibss: Some(false),
        noise: Some(noise),
        country_code: Some(country_code.to_string()),
    }
}
