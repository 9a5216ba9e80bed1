use crate::error::{CoreError, RedditApiError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single `(key, value)` pair of per-group settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
}

impl ConfigEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A group's registration of the bot.
///
/// Field names are part of the persisted snapshot format and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Install {
    pub token: String,
    pub group_id: String,
    pub group_name: String,
    pub webhook: String,
    #[serde(default)]
    pub config: Vec<ConfigEntry>,
    #[serde(default)]
    pub is_paused: bool,
}

impl Install {
    /// Looks up a config value. Duplicate keys resolve to the first occurrence.
    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.config
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }
}

/// Everything needed to register a group, minus the generated token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallRequest {
    pub group_id: String,
    pub group_name: String,
    pub webhook: String,
    #[serde(default)]
    pub config: Vec<ConfigEntry>,
}

/// Result of one content fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(String),
    AuthFailure,
    NotFound,
    RateLimited,
    UpstreamError {
        status: u16,
        detail: Option<String>,
    },
    TransportError(String),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    /// The error equivalent of a failed outcome, `None` for `Success`.
    pub fn to_error(&self, parameter: &str) -> Option<CoreError> {
        let error = match self {
            FetchOutcome::Success(_) => return None,
            FetchOutcome::AuthFailure => CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                reason: "credentials rejected by Reddit".to_string(),
            }),
            FetchOutcome::NotFound => CoreError::RedditApi(RedditApiError::SubredditNotFound {
                subreddit: parameter.to_string(),
            }),
            FetchOutcome::RateLimited => CoreError::RedditApi(RedditApiError::RateLimitExceeded),
            FetchOutcome::UpstreamError { status, detail } => {
                CoreError::RedditApi(RedditApiError::UpstreamStatus {
                    status_code: *status,
                    detail: detail.clone(),
                })
            }
            FetchOutcome::TransportError(message) => CoreError::Transport {
                message: message.clone(),
            },
        };
        Some(error)
    }

    /// The text shown to the group for this outcome.
    pub fn into_message(self, parameter: &str) -> String {
        use crate::error_utils::ErrorExt;

        match self {
            FetchOutcome::Success(text) => text,
            failed => failed
                .to_error(parameter)
                .map(|error| error.user_friendly_message())
                .unwrap_or_default(),
        }
    }
}

/// One listing item after field extraction, ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedPost {
    pub title: String,
    pub permalink: String,
    pub score: i64,
    pub num_comments: Option<u64>,
    pub author: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub preview: Option<String>,
    pub nsfw: bool,
}

/// A single thing the host platform should do in response to a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BotAction {
    SendMessage { text: String },
}

/// Structured reply to an inbound message. Never an error at the HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<BotAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl BotResponse {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            success: true,
            actions: vec![BotAction::SendMessage { text: text.into() }],
            note: None,
        }
    }

    /// Successful reply with nothing to send.
    pub fn ignored() -> Self {
        Self {
            success: true,
            actions: Vec::new(),
            note: None,
        }
    }

    pub fn rejected(note: impl Into<String>) -> Self {
        Self {
            success: false,
            actions: Vec::new(),
            note: Some(note.into()),
        }
    }

    /// Text of the first outbound message, if any.
    pub fn text(&self) -> Option<&str> {
        self.actions.iter().find_map(|action| match action {
            BotAction::SendMessage { text } => Some(text.as_str()),
        })
    }
}
