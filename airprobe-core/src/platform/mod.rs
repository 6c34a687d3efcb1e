#[cfg(target_os = "linux")]
pub mod networkmanager;

#[cfg(target_os = "linux")]
pub use networkmanager::{NmPermission, NmRadio};
