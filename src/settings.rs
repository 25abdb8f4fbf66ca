use anyhow::{Context, Result};
use clap::{Arg, Command};
use config::{Config, Environment, File};
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::{
    alertmanager_webhook_receiver::AlertReceiverSettings, dispatcher::VictorOpsSettings,
    log::LogSettings, telemetry_endpoint::TelemetryEndpointSettings,
};

static SETTINGS: OnceCell<Settings> = OnceCell::new();

/// prefix of environment variables overriding the config file, e.g.
/// `AM_VICTOROPS__VICTOROPS__BASE_URL`
const ENV_PREFIX: &str = "AM_VICTOROPS";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub webhook_receiver: AlertReceiverSettings,
    pub victorops: VictorOpsSettings,
    pub log: LogSettings,
    pub telemetry_endpoint: TelemetryEndpointSettings,
}

impl Settings {
    pub fn global() -> &'static Self {
        SETTINGS.get_or_init(|| {
            match Self::load().context("failed to load config and command line arguments") {
                Ok(settings) => settings,
                Err(err) => {
                    // tracing wasn't setup yet
                    panic!("{:#?}", err);
                }
            }
        })
    }

    fn load() -> Result<Self> {
        let opts = Command::new(clap::crate_name!())
            .version(clap::crate_version!())
            .about(clap::crate_description!())
            .author(clap::crate_authors!())
            .arg(
                Arg::new("config")
                    .help("path of config file")
                    .takes_value(true)
                    .short('c')
                    .long("config")
                    .default_value("./config.yaml"),
            )
            .arg(
                Arg::new("level")
                    .help("log level")
                    .possible_values(["error", "warn", "info", "debug", "trace"])
                    .ignore_case(true)
                    .takes_value(true)
                    .long("log"),
            )
            .get_matches();

        let config_path = opts.value_of("config").unwrap_or("./config.yaml");

        let mut settings = Self::from_file(config_path)?;

        if let Some(level) = opts.value_of("level") {
            settings.log.level = level.to_string();
        }

        Ok(settings)
    }

    /// Loads the built in defaults, overridden by the config file at `path` (if
    /// it exists) and then by environment variables.
    pub fn from_file(path: &str) -> Result<Self> {
        Config::builder()
            .set_default("webhook_receiver.bind_address", "0.0.0.0")?
            .set_default("webhook_receiver.port", 80_i64)?
            .set_default("webhook_receiver.route", "/victorops")?
            .set_default("victorops.base_url", "https://alert.victorops.com")?
            .set_default("victorops.request_timeout", 30.0)?
            .set_default("log.level", "info")?
            .set_default("telemetry_endpoint.bind_address", "0.0.0.0")?
            .set_default("telemetry_endpoint.port", 9090_i64)?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("can't load config")?
            .try_deserialize()
            .context("can't load config")
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, time::Duration};

    use super::*;

    #[test]
    fn defaults_apply_without_config_file() {
        let settings = Settings::from_file("./does-not-exist.yaml").unwrap();

        assert_eq!(settings.webhook_receiver.route, "/victorops");
        assert_eq!(settings.webhook_receiver.to_socket_addr().port(), 80);
        assert_eq!(
            settings.victorops.base_url.as_str(),
            "https://alert.victorops.com/"
        );
        assert_eq!(settings.victorops.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.log.level, "info");
        assert_eq!(settings.telemetry_endpoint.to_socket_addr().port(), 9090);
    }

    #[test]
    fn config_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("am-victorops-{}.yaml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "webhook_receiver:\n  port: 8080\n  route: /alerts\nvictorops:\n  request_timeout: 2.5"
        )
        .unwrap();

        let settings = Settings::from_file(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(settings.webhook_receiver.port, 8080);
        assert_eq!(settings.webhook_receiver.route, "/alerts");
        assert_eq!(settings.victorops.request_timeout, Duration::from_millis(2500));
        assert_eq!(
            settings.victorops.base_url.as_str(),
            "https://alert.victorops.com/"
        );
    }
}
