use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::core::DEFAULT_MAX_N;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub compute: ComputeSettings,
    #[serde(default)]
    pub users: UserSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub file_enabled: bool,
    #[serde(default = "default_log_directory")]
    pub directory: String,
    #[serde(default = "default_log_file")]
    pub file_name: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file_enabled: true,
            directory: default_log_directory(),
            file_name: default_log_file(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }
fn default_log_directory() -> String { "logs".to_string() }
fn default_log_file() -> String { "app.log".to_string() }
fn default_true() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_otlp_endpoint")]
    pub otlp_endpoint: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: default_service_name(),
            otlp_endpoint: default_otlp_endpoint(),
        }
    }
}

fn default_service_name() -> String { "otel-tutorial".to_string() }
fn default_otlp_endpoint() -> String { "http://127.0.0.1:4317".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct ComputeSettings {
    #[serde(default = "default_max_n")]
    pub max_n: u32,
}

impl Default for ComputeSettings {
    fn default() -> Self {
        Self { max_n: default_max_n() }
    }
}

fn default_max_n() -> u32 { DEFAULT_MAX_N }

#[derive(Debug, Clone, Deserialize)]
pub struct UserSettings {
    #[serde(default = "default_user_capacity")]
    pub capacity: usize,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self { capacity: default_user_capacity() }
    }
}

fn default_user_capacity() -> usize { 10_000 }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with APP_)
    /// 5. Standard OpenTelemetry variables (OTEL_EXPORTER_OTLP_ENDPOINT, OTEL_SERVICE_NAME)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__SERVER__PORT -> server.port
            .add_source(app_environment())
            .build()?;

        apply_otel_env(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(app_environment())
            .build()?;

        apply_otel_env(settings)?.try_deserialize()
    }
}

fn app_environment() -> Environment {
    Environment::with_prefix("APP")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Map the standard OTEL_* variables onto the telemetry section.
/// Setting an exporter endpoint implies export is wanted.
fn apply_otel_env(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(endpoint) = env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        if !endpoint.is_empty() {
            builder = builder
                .set_override("telemetry.otlp_endpoint", endpoint)?
                .set_override("telemetry.enabled", true)?;
        }
    }
    if let Ok(service_name) = env::var("OTEL_SERVICE_NAME") {
        if !service_name.is_empty() {
            builder = builder.set_override("telemetry.service_name", service_name)?;
        }
    }

    builder.build()
}
