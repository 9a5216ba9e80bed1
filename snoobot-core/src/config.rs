//! Bot configuration: an optional TOML file overlaid with environment variables.

use crate::error::{ConfigError, CoreError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const ENV_CLIENT_ID: &str = "REDDIT_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "REDDIT_CLIENT_SECRET";
pub const ENV_USER_AGENT: &str = "REDDIT_USER_AGENT";
pub const ENV_STATE_PATH: &str = "SNOOBOT_STATE_PATH";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub reddit: RedditConfig,
    pub bot: BotSettings,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Reddit rejects requests without a descriptive user agent.
    pub user_agent: String,
    pub redirect_uri: String,
    pub api_base: String,
    pub token_url: String,
    pub post_limit: u32,
    pub request_timeout_secs: u64,
    pub min_request_interval_ms: u64,
    pub token_expiry_buffer_secs: u64,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            user_agent: String::new(),
            redirect_uri: "http://localhost:8080/callback".to_string(),
            api_base: "https://oauth.reddit.com".to_string(),
            token_url: "https://www.reddit.com/api/v1/access_token".to_string(),
            post_limit: 5,
            request_timeout_secs: 30,
            min_request_interval_ms: 1000,
            token_expiry_buffer_secs: 300,
        }
    }
}

impl RedditConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn token_expiry_buffer(&self) -> Duration {
        Duration::from_secs(self.token_expiry_buffer_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    /// Command prefix that activates a fetch, e.g. `/reddit rust`.
    pub trigger: String,
    /// Used when neither the message nor the install config names a subreddit.
    pub default_parameter: String,
    /// Install config key holding the group's subreddit.
    pub parameter_key: String,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            trigger: "/reddit".to_string(),
            default_parameter: "programming".to_string(),
            parameter_key: "subreddit".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub state_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("installs.json"),
        }
    }
}

impl BotConfig {
    /// Reads `path` if given, applies environment overrides and validates.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&raw)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, CoreError> {
        let config: BotConfig = toml::from_str(raw).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Overlays non-empty values returned by `lookup` for the known variables.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(value) = read(ENV_CLIENT_ID) {
            debug!("Using {} from environment", ENV_CLIENT_ID);
            self.reddit.client_id = value;
        }
        if let Some(value) = read(ENV_CLIENT_SECRET) {
            debug!("Using {} from environment", ENV_CLIENT_SECRET);
            self.reddit.client_secret = value;
        }
        if let Some(value) = read(ENV_USER_AGENT) {
            self.reddit.user_agent = value;
        }
        if let Some(value) = read(ENV_STATE_PATH) {
            self.storage.state_path = PathBuf::from(value);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("reddit.client_id", &self.reddit.client_id),
            ("reddit.client_secret", &self.reddit.client_secret),
            ("reddit.user_agent", &self.reddit.user_agent),
            ("bot.trigger", &self.bot.trigger),
            ("bot.default_parameter", &self.bot.default_parameter),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                });
            }
        }

        if self.reddit.post_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "reddit.post_limit".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(())
    }
}
