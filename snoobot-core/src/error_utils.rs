use crate::error::*;
use tracing::{error, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::RedditApi(e) => {
                error!("Reddit API error details: {:?}", e);
            }
            CoreError::Registry(e) => {
                error!("Registry error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::RedditApi(e) => e.is_retryable(),
            CoreError::Network(_) => true,
            CoreError::Transport { .. } => true,
            CoreError::WebhookRejected { status_code } => *status_code >= 500,
            _ => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::RedditApi(e) => e.user_friendly_message(),
            CoreError::Registry(RegistryError::MissingField { field }) => {
                format!("Missing required field: {}.", field)
            }
            CoreError::Registry(_) => {
                "The bot could not save its installation state.".to_string()
            }
            CoreError::Config(ConfigError::MissingField { field }) => {
                format!("Configuration is missing required field: {}", field)
            }
            CoreError::Config(e) => format!("Configuration problem: {}", e),
            CoreError::Network(_) | CoreError::Transport { .. } => {
                "Could not reach Reddit. Please try again later.".to_string()
            }
            CoreError::InvalidInput { message } => format!("Invalid input: {}", message),
            CoreError::WebhookRejected { status_code } => {
                format!("The group webhook rejected the message (HTTP {}).", status_code)
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::RedditApi(_) => "REDDIT_API".to_string(),
            CoreError::Registry(_) => "REGISTRY".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::Transport { .. } => "TRANSPORT".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::WebhookRejected { .. } => "WEBHOOK_REJECTED".to_string(),
        }
    }
}

impl ErrorExt for RedditApiError {
    fn log_error(&self) -> &Self {
        error!("RedditApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("RedditApiError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            RedditApiError::RateLimitExceeded => true,
            RedditApiError::UpstreamStatus { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            RedditApiError::AuthenticationFailed { .. } => {
                "Reddit authentication failed. Please check the bot credentials.".to_string()
            }
            RedditApiError::RateLimitExceeded => {
                "Reddit is rate limiting the bot. Please wait a minute before trying again."
                    .to_string()
            }
            RedditApiError::SubredditNotFound { subreddit } => {
                format!("Subreddit 'r/{}' not found or is private.", subreddit)
            }
            RedditApiError::InvalidResponse { .. } => {
                "Reddit sent a response the bot could not read.".to_string()
            }
            RedditApiError::UpstreamStatus {
                status_code,
                detail: Some(detail),
            } => format!("Reddit returned an error (HTTP {}): {}", status_code, detail),
            RedditApiError::UpstreamStatus { status_code, .. } => format!(
                "Reddit returned an error (HTTP {}). Please try again later.",
                status_code
            ),
        }
    }

    fn error_code(&self) -> String {
        match self {
            RedditApiError::AuthenticationFailed { .. } => "REDDIT_AUTH_FAILED".to_string(),
            RedditApiError::RateLimitExceeded => "REDDIT_RATE_LIMIT".to_string(),
            RedditApiError::SubredditNotFound { .. } => "REDDIT_SUBREDDIT_NOT_FOUND".to_string(),
            RedditApiError::InvalidResponse { .. } => "REDDIT_INVALID_RESPONSE".to_string(),
            RedditApiError::UpstreamStatus { .. } => "REDDIT_UPSTREAM_STATUS".to_string(),
        }
    }
}
