use crate::auth::CredentialCache;
use crate::format::format_listing_body;
use crate::rate_limiter::{RateLimitConfig, RateLimitStatus, RateLimiter};
use crate::ContentSource;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use snoobot_core::{CoreError, ErrorExt, FetchOutcome, RedditConfig};
use tracing::{debug, error, info, warn};

/// Result of a single token + request pass.
#[derive(Debug)]
enum Attempt {
    Finished(FetchOutcome),
    /// Reddit answered 401 or 403 to the bearer token.
    TokenRejected(StatusCode),
}

#[derive(Debug, Clone)]
pub struct RedditApiClient {
    http_client: Client,
    credentials: CredentialCache,
    rate_limiter: RateLimiter,
    api_base: String,
    user_agent: String,
    post_limit: u32,
}

impl RedditApiClient {
    pub fn new(config: &RedditConfig) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout())
            .build()?;

        let rate_limiter = RateLimiter::new(RateLimitConfig::with_min_interval(
            config.min_request_interval(),
        ));
        let credentials = CredentialCache::new(config, http_client.clone(), rate_limiter.clone())?;

        Ok(Self {
            http_client,
            credentials,
            rate_limiter,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            post_limit: config.post_limit,
        })
    }

    /// Fetches and formats the hot listing of `subreddit`.
    ///
    /// A rejected token is invalidated and the whole pass retried exactly once.
    pub async fn fetch_hot(&self, subreddit: &str) -> FetchOutcome {
        if !is_valid_subreddit_name(subreddit) {
            debug!("Refusing to query malformed subreddit name {:?}", subreddit);
            return FetchOutcome::NotFound;
        }

        match self.attempt(subreddit).await {
            Attempt::Finished(outcome) => outcome,
            Attempt::TokenRejected(status) => {
                warn!(
                    "Reddit rejected access token with {}, refreshing and retrying once",
                    status
                );
                self.credentials.invalidate().await;

                match self.attempt(subreddit).await {
                    Attempt::Finished(outcome) => outcome,
                    Attempt::TokenRejected(status) => {
                        error!(
                            "Fresh access token rejected with {} for r/{}",
                            status, subreddit
                        );
                        FetchOutcome::AuthFailure
                    }
                }
            }
        }
    }

    async fn attempt(&self, subreddit: &str) -> Attempt {
        let access_token = match self.credentials.get_token().await {
            Ok(token) => token,
            Err(CoreError::Transport { message }) => {
                return Attempt::Finished(FetchOutcome::TransportError(message));
            }
            Err(e) => {
                e.log_warn();
                return Attempt::Finished(FetchOutcome::AuthFailure);
            }
        };

        let permit = self.rate_limiter.acquire_permit().await;
        debug!("Acquired rate limit permit after {:?}", permit.queue_wait_time);

        let endpoint = format!("/r/{}/hot", subreddit);
        let url = format!("{}{}", self.api_base, endpoint);
        let limit = self.post_limit.to_string();

        info!("Making Reddit API request: GET {}", endpoint);
        let response = match self
            .http_client
            .get(&url)
            .bearer_auth(&access_token)
            .header(USER_AGENT, &self.user_agent)
            .query(&[("limit", limit.as_str()), ("raw_json", "1")])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for GET {}: {}", endpoint, e);
                return Attempt::Finished(FetchOutcome::TransportError(e.to_string()));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return match response.text().await {
                Ok(body) => Attempt::Finished(FetchOutcome::Success(format_listing_body(
                    &body,
                    subreddit,
                    Utc::now(),
                ))),
                Err(e) => {
                    error!("Failed to read body for {}: {}", endpoint, e);
                    Attempt::Finished(FetchOutcome::TransportError(e.to_string()))
                }
            };
        }

        warn!("Request failed with status: {} for {}", status, endpoint);
        let outcome = match status.as_u16() {
            401 | 403 => return Attempt::TokenRejected(status),
            404 => FetchOutcome::NotFound,
            429 => FetchOutcome::RateLimited,
            code => FetchOutcome::UpstreamError {
                status: code,
                detail: upstream_error_detail(response.text().await.ok().as_deref()),
            },
        };
        Attempt::Finished(outcome)
    }

    pub fn credentials(&self) -> &CredentialCache {
        &self.credentials
    }

    pub async fn get_rate_limit_status(&self) -> RateLimitStatus {
        self.rate_limiter.get_rate_limit_status().await
    }
}

#[async_trait]
impl ContentSource for RedditApiClient {
    async fn fetch(&self, parameter: &str) -> FetchOutcome {
        self.fetch_hot(parameter).await
    }
}

/// Subreddit names are 2-21 characters of letters, digits and underscores.
pub fn is_valid_subreddit_name(name: &str) -> bool {
    (2..=21).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Pulls a readable message out of a Reddit error body, if it has one.
fn upstream_error_detail(body: Option<&str>) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body?).ok()?;
    ["message", "reason", "error_description"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}
