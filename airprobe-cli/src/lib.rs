use std::sync::Arc;
use std::time::{Duration, Instant};

use airprobe_core::authorization::AuthorizationState;
use airprobe_core::error::{Result, ScanError};
use airprobe_core::mock::{MockPermission, MockRadio};
use airprobe_core::permission::PermissionProvider;
use airprobe_core::radio::Radio;
use airprobe_core::scanner::CancelToken;
use airprobe_core::wifi::WifiScanner;

use crate::cli::Args;
use crate::report::Report;
use crate::settings::{Backend, Settings};

pub mod cli;
pub mod report;
pub mod settings;

const AUTH_POLL: Duration = Duration::from_millis(250);

type Collaborators = (Arc<dyn Radio>, Arc<dyn PermissionProvider>);

fn collaborators(settings: &Settings) -> Result<Collaborators> {
    match settings.radio.backend {
        Backend::Mock => {
            let radio: Arc<dyn Radio> = Arc::new(MockRadio::demo());
            let permission: Arc<dyn PermissionProvider> = Arc::new(
                MockPermission::new(AuthorizationState::Unknown)
                    .answering(AuthorizationState::Granted, Duration::from_millis(200)),
            );
            Ok((radio, permission))
        }
        #[cfg(target_os = "linux")]
        Backend::NetworkManager => {
            use airprobe_core::platform::{NmPermission, NmRadio};

            let radio: Arc<dyn Radio> =
                Arc::new(NmRadio::discover(settings.radio.interface.as_deref())?);
            let permission: Arc<dyn PermissionProvider> = Arc::new(NmPermission::new());
            Ok((radio, permission))
        }
        #[cfg(not(target_os = "linux"))]
        Backend::NetworkManager => {
            tracing::error!("NetworkManager is only available on Linux");
            Err(ScanError::NoInterfaceAvailable)
        }
    }
}

/// Waits for a pending permission request in short slices so Ctrl-C is
/// noticed.
fn await_authorization(wifi: &WifiScanner, cancel: &CancelToken) -> AuthorizationState {
    let deadline = Instant::now() + wifi.config().auth_timeout();
    let mut state = wifi.authorization_state();

    if state == AuthorizationState::Pending {
        tracing::info!("Waiting for location authorization...");
    }

    while state == AuthorizationState::Pending && !cancel.is_cancelled() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            tracing::warn!("Timed out waiting for location authorization");
            break;
        }
        state = wifi.await_authorization(Some(remaining.min(AUTH_POLL)));
    }

    state
}

fn survey(settings: &Settings, args: &Args, cancel: &CancelToken) -> Result<Report> {
    let (radio, permission) = collaborators(settings)?;
    let wifi = WifiScanner::new(radio, permission, args.scanner_config(&settings.scanner));

    await_authorization(&wifi, cancel);

    let current = wifi.current_network();
    let networks = wifi.scan_networks(args.ssid.as_deref(), cancel)?;
    let preferred = wifi.preferred_networks();

    Ok(Report {
        current,
        networks,
        preferred,
    })
}

pub async fn run(settings: &Arc<Settings>, args: Args) -> Result<()> {
    let cancel = CancelToken::new();
    let json = args.json;

    let mut task = tokio::task::spawn_blocking({
        let settings = settings.clone();
        let cancel = cancel.clone();
        move || survey(&settings, &args, &cancel)
    });

    let joined = tokio::select! {
        joined = &mut task => joined,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, stopping scan...");
            cancel.cancel();
            task.await
        }
    };

    let report = joined.map_err(|e| ScanError::Io(std::io::Error::other(e)))??;

    if json {
        let document = serde_json::to_string_pretty(&report)
            .map_err(|e| ScanError::Io(std::io::Error::other(e)))?;
        println!("{document}");
    } else {
        print!("{report}");
    }

    Ok(())
}
