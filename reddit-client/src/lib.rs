//! Reddit integration: application-only OAuth2, request spacing, hot listing
//! fetches and chat formatting of the results.

pub mod api;
pub mod auth;
pub mod format;
pub mod rate_limiter;

pub use api::RedditApiClient;
pub use auth::CredentialCache;
pub use rate_limiter::{RateLimitConfig, RateLimiter};

use async_trait::async_trait;
use snoobot_core::FetchOutcome;

/// Anything that can turn a parameter into a fetch outcome.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, parameter: &str) -> FetchOutcome;
}
