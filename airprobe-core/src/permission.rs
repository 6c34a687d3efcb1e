use std::sync::Arc;

use crate::authorization::AuthorizationState;

/// Receives permission changes pushed by the OS permission subsystem.
///
/// Called from whatever thread the subsystem delivers on.
pub trait AuthorizationObserver: Send + Sync {
    fn on_state_changed(&self, state: AuthorizationState);
}

/// The OS permission subsystem guarding radio scans.
pub trait PermissionProvider: Send + Sync {
    fn current_state(&self) -> AuthorizationState;

    /// Fire-and-forget. The outcome arrives later through the observers.
    fn request_permission(&self);

    fn register_observer(&self, observer: Arc<dyn AuthorizationObserver>);
}
