use std::path::Path;

use airprobe_core::config::ScannerConfig;
use config::{Config, ConfigError, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    NetworkManager,
    /// Scripted radio, for trying the tool without Wi-Fi hardware
    Mock,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Radio {
    #[serde(default)]
    pub backend: Backend,
    /// Wi-Fi device to use instead of the first one found
    pub interface: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub logger: Logger,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub radio: Radio,
}

const DEFAULT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../",
    "configs/default.toml"
));

impl Settings {
    /// Compiled-in defaults, then the optional file, then `AIRPROBE_*`
    /// environment variables (`AIRPROBE_RADIO__INTERFACE=wlan1`).
    pub fn new(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load(path, None)
    }

    /// Like [`new`](Self::new), reading the environment from `env` instead of
    /// the process when given.
    pub fn load(
        path: Option<&Path>,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT, FileFormat::Toml));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        builder
            .add_source(
                Environment::with_prefix("AIRPROBE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use std::{env, fs, process};

    use airprobe_core::config::ErrorPolicy;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Option<Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::load(None, vars(&[])).unwrap();

        assert_eq!(settings.logger.level, "info");
        assert_eq!(settings.radio.backend, Backend::NetworkManager);
        assert_eq!(settings.scanner, ScannerConfig::default());
        assert_eq!(settings.radio.interface, None);
    }

    #[test]
    fn test_file_keeps_unset_fields() {
        let path = env::temp_dir().join(format!("airprobe-settings-{}.toml", process::id()));
        fs::write(
            &path,
            r#"
            [scanner]
            max_attempts = 5
            error_policy = "busy_only"

            [radio]
            interface = "wlan1"
            "#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path), vars(&[]));
        fs::remove_file(&path).unwrap();
        let settings = settings.unwrap();

        assert_eq!(settings.scanner.max_attempts, Some(5));
        assert_eq!(settings.scanner.error_policy, ErrorPolicy::BusyOnly);
        assert_eq!(settings.scanner.retry_delay_ms, 2000);
        assert_eq!(settings.radio.interface.as_deref(), Some("wlan1"));
        assert_eq!(settings.logger.level, "info");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = env::temp_dir().join("airprobe-settings-does-not-exist.toml");
        assert!(Settings::load(Some(&path), vars(&[])).is_err());
    }

    #[test]
    fn test_environment_overrides() {
        let settings = Settings::load(
            None,
            vars(&[
                ("AIRPROBE_LOGGER__LEVEL", "debug"),
                ("AIRPROBE_RADIO__INTERFACE", "wlp2s0"),
                ("AIRPROBE_RADIO__BACKEND", "mock"),
                ("AIRPROBE_SCANNER__RETRY_DELAY_MS", "500"),
                ("OTHER_RADIO__BACKEND", "airport"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.logger.level, "debug");
        assert_eq!(settings.radio.interface.as_deref(), Some("wlp2s0"));
        assert_eq!(settings.radio.backend, Backend::Mock);
        assert_eq!(settings.scanner.retry_delay_ms, 500);

        assert!(Settings::load(None, vars(&[("AIRPROBE_RADIO__BACKEND", "airport")])).is_err());
    }
}
