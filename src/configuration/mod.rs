use crate::core::http::RetryableClient;
use crate::database::{DatabaseError, DatabaseService};
use crate::registration::RegistrationService;
use crate::web_api::WebApiClient;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("File read error: {0}")]
    FileError(String),

    #[error("Deserialization error:{0}")]
    DeserializationError(String),

    #[error("Environment variable {0} not set")]
    MissingEnv(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidEnv(&'static str, String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("HTTP client error: {0}")]
    HttpClientError(String),
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_database_file")]
    pub database_file: String,
    #[serde(default)]
    pub admin_ids: Vec<i64>,
    pub web_api: WebApiConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebApiConfig {
    pub host: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    pub error_channel_id: Option<i64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_database_file() -> String {
    "user_data.db".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

impl Config {
    pub fn new(config_file: &str) -> Result<Self, ConfigError> {
        let config_str =
            fs::read_to_string(config_file).map_err(|e| ConfigError::FileError(e.to_string()))?;
        let mut config = Self::from_json(&config_str)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_json(config_str: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(config_str)
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    // ADMIN_IDS (a JSON array) and API_HOST take precedence over the file
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(admin_ids) = env::var("ADMIN_IDS") {
            self.admin_ids = serde_json::from_str(&admin_ids)
                .map_err(|e| ConfigError::InvalidEnv("ADMIN_IDS", e.to_string()))?;
        }
        if let Ok(host) = env::var("API_HOST") {
            self.web_api.host = host;
        }
        Ok(())
    }
}

/// Secrets that never live in the config file.
#[derive(Clone)]
pub struct Secrets {
    pub bot_token: String,
    pub api_token: String,
}

impl Secrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bot_token: env::var("BOT_TOKEN").map_err(|_| ConfigError::MissingEnv("BOT_TOKEN"))?,
            api_token: env::var("API_TOKEN").map_err(|_| ConfigError::MissingEnv("API_TOKEN"))?,
        })
    }
}

#[derive(Clone)]
pub struct Context {
    pub config: Config,
    pub secrets: Secrets,
    pub registration: Arc<RegistrationService>,
}

impl Context {
    pub async fn new(config: Config, secrets: Secrets) -> Result<Self, ConfigError> {
        let database = Arc::new(DatabaseService::open(Path::new(&config.database_file)).await?);
        let http_client = RetryableClient::with_settings(
            Duration::from_secs(config.web_api.timeout_secs),
            config.web_api.max_retries,
        )
        .map_err(|e| ConfigError::HttpClientError(e.to_string()))?;
        let web_api = Arc::new(WebApiClient::new(
            &config.web_api.host,
            &secrets.api_token,
            http_client,
        ));
        let registration = Arc::new(RegistrationService::new(database, web_api));

        Ok(Self {
            config,
            secrets,
            registration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const MINIMAL: &str = r#"{ "web_api": { "host": "http://localhost:4533" } }"#;

    #[test]
    fn test_defaults() {
        let config = Config::from_json(MINIMAL).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.database_file, "user_data.db");
        assert!(config.admin_ids.is_empty());
        assert_eq!(config.web_api.timeout_secs, 10);
        assert_eq!(config.web_api.max_retries, 2);
        assert_eq!(config.telegram.error_channel_id, None);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_json(
            r#"{
                "log_level": "debug",
                "database_file": "data/bot.db",
                "admin_ids": [11, 22],
                "web_api": { "host": "https://music.example.com", "timeout_secs": 3, "max_retries": 0 },
                "telegram": { "error_channel_id": -100123 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.admin_ids, vec![11, 22]);
        assert_eq!(config.web_api.timeout_secs, 3);
        assert_eq!(config.telegram.error_channel_id, Some(-100123));
    }

    #[test]
    fn test_missing_web_api_is_rejected() {
        assert!(matches!(
            Config::from_json("{}"),
            Err(ConfigError::DeserializationError(_))
        ));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        env::set_var("ADMIN_IDS", "[7, 8]");
        env::set_var("API_HOST", "https://override.example.com");

        let mut config = Config::from_json(MINIMAL).unwrap();
        let result = config.apply_env_overrides();

        env::remove_var("ADMIN_IDS");
        env::remove_var("API_HOST");

        result.unwrap();
        assert_eq!(config.admin_ids, vec![7, 8]);
        assert_eq!(config.web_api.host, "https://override.example.com");
    }

    #[test]
    #[serial]
    fn test_invalid_admin_ids() {
        env::set_var("ADMIN_IDS", "not json");
        let mut config = Config::from_json(MINIMAL).unwrap();
        let result = config.apply_env_overrides();
        env::remove_var("ADMIN_IDS");

        assert!(matches!(result, Err(ConfigError::InvalidEnv("ADMIN_IDS", _))));
    }

    #[test]
    #[serial]
    fn test_secrets_from_env() {
        env::set_var("BOT_TOKEN", "bot");
        env::remove_var("API_TOKEN");
        assert!(matches!(
            Secrets::from_env(),
            Err(ConfigError::MissingEnv("API_TOKEN"))
        ));

        env::set_var("API_TOKEN", "api");
        let secrets = Secrets::from_env().unwrap();
        env::remove_var("BOT_TOKEN");
        env::remove_var("API_TOKEN");

        assert_eq!(secrets.bot_token, "bot");
        assert_eq!(secrets.api_token, "api");
    }
}
