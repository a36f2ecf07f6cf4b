use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::hosting::worker_origin;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("Failed to read config file at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub listen_addr: String,
    /// Origin of the hosting worker; path and query of the configured value are dropped.
    pub hosting_worker_url: String,
    pub hosting_worker_timeout_secs: u64,
    pub app_url: String,
    pub webhook_token: String,
    pub jwt_secret: String,
    pub bot_group_redirect_url: String,
    pub log_dir: String,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    database_url: Option<String>,
    listen_addr: Option<String>,
    hosting_worker_url: Option<String>,
    hosting_worker_timeout_secs: Option<u64>,
    app_url: Option<String>,
    webhook_token: Option<String>,
    jwt_secret: Option<String>,
    bot_group_redirect_url: Option<String>,
    log_dir: Option<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_bot_group_redirect_url() -> String {
    "https://t.me/loliai_bot".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

const DEFAULT_HOSTING_WORKER_TIMEOUT_SECS: u64 = 30;

impl ServerConfig {
    /// File, then environment (after `.env`), then defaults. Environment wins over file.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let file_config = match config_path {
            Some(path_str) if Path::new(path_str).exists() => {
                let contents = fs::read_to_string(path_str).map_err(|source| ConfigError::Io {
                    path: path_str.to_string(),
                    source,
                })?;
                parse_file_config(path_str, &contents)?
            }
            _ => PartialServerConfig::default(),
        };

        let env_config: PartialServerConfig = envy::from_env::<PartialServerConfig>()?;

        Self::merge(env_config, file_config)
    }

    fn merge(
        env_config: PartialServerConfig,
        file_config: PartialServerConfig,
    ) -> Result<Self, ConfigError> {
        let raw_worker_url = env_config
            .hosting_worker_url
            .or(file_config.hosting_worker_url)
            .ok_or(ConfigError::Missing("HOSTING_WORKER_URL"))?;
        let hosting_worker_url =
            worker_origin(&raw_worker_url).map_err(|message| ConfigError::Invalid {
                key: "HOSTING_WORKER_URL",
                message,
            })?;

        let hosting_worker_timeout_secs = env_config
            .hosting_worker_timeout_secs
            .or(file_config.hosting_worker_timeout_secs)
            .unwrap_or(DEFAULT_HOSTING_WORKER_TIMEOUT_SECS);
        if hosting_worker_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "HOSTING_WORKER_TIMEOUT_SECS",
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(ServerConfig {
            database_url: env_config
                .database_url
                .or(file_config.database_url)
                .ok_or(ConfigError::Missing("DATABASE_URL"))?,
            listen_addr: env_config
                .listen_addr
                .or(file_config.listen_addr)
                .unwrap_or_else(default_listen_addr),
            hosting_worker_url,
            hosting_worker_timeout_secs,
            app_url: env_config
                .app_url
                .or(file_config.app_url)
                .ok_or(ConfigError::Missing("APP_URL"))?,
            webhook_token: env_config
                .webhook_token
                .or(file_config.webhook_token)
                .ok_or(ConfigError::Missing("WEBHOOK_TOKEN"))?,
            jwt_secret: env_config
                .jwt_secret
                .or(file_config.jwt_secret)
                .ok_or(ConfigError::Missing("JWT_SECRET"))?,
            bot_group_redirect_url: env_config
                .bot_group_redirect_url
                .or(file_config.bot_group_redirect_url)
                .unwrap_or_else(default_bot_group_redirect_url),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
        })
    }

    pub fn hosting_worker_timeout(&self) -> Duration {
        Duration::from_secs(self.hosting_worker_timeout_secs)
    }
}

fn parse_file_config(path: &str, contents: &str) -> Result<PartialServerConfig, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
impl ServerConfig {
    pub(crate) fn for_tests() -> Self {
        ServerConfig {
            database_url: "postgres://localhost/apphost".to_string(),
            listen_addr: default_listen_addr(),
            hosting_worker_url: "http://127.0.0.1:9".to_string(),
            hosting_worker_timeout_secs: 5,
            app_url: "https://app.example.com".to_string(),
            webhook_token: "worker-secret".to_string(),
            jwt_secret: "jwt-secret".to_string(),
            bot_group_redirect_url: default_bot_group_redirect_url(),
            log_dir: default_log_dir(),
        }
    }
}
