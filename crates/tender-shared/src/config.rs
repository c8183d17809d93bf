//! Configuration management

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::constants::{
    DEFAULT_MAX_QUORUM, DEFAULT_MAX_RETRIES, DEFAULT_OPERATION_TIMEOUT_MS, DEFAULT_RETRY_BACKOFF_MS,
};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// Tunables of the lifecycle engine.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineSettings {
    /// Cap applied to the responsible-user count when computing the quorum.
    pub max_quorum: usize,
    /// Attempts for writes that hit a concurrent modification.
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// Deadline for a single service operation, store round-trips included.
    pub operation_timeout_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_quorum: DEFAULT_MAX_QUORUM,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
        }
    }
}

impl EngineSettings {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// `json` or `pretty`.
    pub format: String,
    /// Directory for daily-rolling log files; stdout only when absent.
    pub directory: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
            directory: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let config = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__").try_parsing(true))
            .build()?;
        config.try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("app.env", "development")?
            .set_default("app.name", "tender-engine")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.acquire_timeout_secs", 3)?
            .set_default("engine.max_quorum", DEFAULT_MAX_QUORUM as i64)?
            .set_default("engine.max_retries", DEFAULT_MAX_RETRIES as i64)?
            .set_default("engine.retry_backoff_ms", DEFAULT_RETRY_BACKOFF_MS as i64)?
            .set_default("engine.operation_timeout_ms", DEFAULT_OPERATION_TIMEOUT_MS as i64)?
            .set_default("log.level", "info")?
            .set_default("log.format", "json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = AppConfig::defaults()
            .unwrap()
            .set_override("database.url", "postgres://localhost/tenders")
            .unwrap()
            .build()
            .unwrap();
        let app: AppConfig = config.try_deserialize().unwrap();

        assert_eq!(app.app.name, "tender-engine");
        assert_eq!(app.database.max_connections, 10);
        assert_eq!(app.engine.max_quorum, 3);
        assert_eq!(app.engine.max_retries, 5);
        assert_eq!(app.log.format, "json");
        assert!(app.log.directory.is_none());
    }

    #[test]
    fn test_file_overrides_engine_settings() {
        let toml = r#"
            [database]
            url = "postgres://db/tenders"

            [engine]
            max_quorum = 5
            operation_timeout_ms = 250
        "#;
        let config = AppConfig::defaults()
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap();
        let app: AppConfig = config.try_deserialize().unwrap();

        assert_eq!(app.engine.max_quorum, 5);
        assert_eq!(app.engine.operation_timeout(), Duration::from_millis(250));
        assert_eq!(app.engine.max_retries, 5);
    }

    #[test]
    fn test_engine_settings_default() {
        let settings = EngineSettings::default();
        assert_eq!(settings.max_quorum, DEFAULT_MAX_QUORUM);
        assert_eq!(settings.retry_backoff(), Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS));
    }
}
