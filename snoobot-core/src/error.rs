use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Reddit API error: {0}")]
    RedditApi(#[from] RedditApiError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Webhook delivery failed with status {status_code}")]
    WebhookRejected { status_code: u16 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RedditApiError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Subreddit not found: {subreddit}")]
    SubredditNotFound { subreddit: String },

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Upstream returned status {status_code}")]
    UpstreamStatus {
        status_code: u16,
        detail: Option<String>,
    },
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Failed to persist installs to {path}: {reason}")]
    PersistFailed { path: String, reason: String },

    #[error("Failed to load installs from {path}: {reason}")]
    LoadFailed { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
