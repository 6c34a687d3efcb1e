use std::path::PathBuf;

use airprobe_core::config::ScannerConfig;
use clap::Parser;

/// Survey nearby Wi-Fi networks.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "airprobe", version, about)]
pub struct Args {
    /// Only report networks with this SSID
    #[arg(long)]
    pub ssid: Option<String>,

    /// Seconds to wait for a pending scan permission request
    #[arg(long, value_name = "SECS")]
    pub wait_timeout: Option<u64>,

    /// Pause between scan attempts in milliseconds
    #[arg(long, value_name = "MS")]
    pub retry_delay: Option<u64>,

    /// Give up after this many scan attempts
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: Option<u32>,

    /// Print one JSON document instead of text
    #[arg(long)]
    pub json: bool,

    /// Settings file layered over the built-in defaults
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Command-line values take precedence over the settings file.
    pub fn scanner_config(&self, base: &ScannerConfig) -> ScannerConfig {
        let mut config = base.clone();
        if let Some(secs) = self.wait_timeout {
            config.auth_timeout_ms = secs.saturating_mul(1000);
        }
        if let Some(delay) = self.retry_delay {
            config.retry_delay_ms = delay;
        }
        if self.max_attempts.is_some() {
            config.max_attempts = self.max_attempts;
        }
        config
    }
}
