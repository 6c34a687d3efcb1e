use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use airprobe_cli::cli::Args;
use airprobe_cli::run;
use airprobe_cli::settings::Settings;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let settings =
        Arc::new(Settings::new(args.config.as_deref()).expect("Failed to load settings."));

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let app_name = env!("CARGO_PKG_NAME").replace('-', "_");
            let level = settings.logger.level.as_str();

            format!("{app_name}={level},airprobe_core={level}").into()
        }))
        .with_writer(std::io::stderr)
        .init();

    match run(&settings, args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Error in main: {}", e);
            ExitCode::FAILURE
        }
    }
}
