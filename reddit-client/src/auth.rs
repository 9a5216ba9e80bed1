//! Application-only OAuth2 token handling for the Reddit API.
//!
//! A single bearer token is shared by the whole process. It is fetched with
//! the client-credentials grant, reused until shortly before it expires and
//! dropped as soon as Reddit rejects it.

use crate::rate_limiter::RateLimiter;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthType, AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError,
    TokenResponse, TokenUrl,
};
use snoobot_core::{ConfigError, CoreError, RedditApiError, RedditConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const REDDIT_AUTHORIZE_URL: &str = "https://www.reddit.com/api/v1/authorize";

/// Lifetime assumed when the token response omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Upper bound on an advertised lifetime; keeps `expires_at` representable.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 3600);

#[derive(Debug, Clone)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: Instant,
}

impl CachedToken {
    /// Usable only while `now + buffer` is still before expiry.
    pub fn is_fresh(&self, buffer: Duration) -> bool {
        Instant::now() + buffer < self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct CredentialCache {
    oauth_client: BasicClient,
    http_client: reqwest::Client,
    rate_limiter: RateLimiter,
    redirect_uri: String,
    expiry_buffer: Duration,
    token: Arc<Mutex<Option<CachedToken>>>,
}

impl CredentialCache {
    pub fn new(
        config: &RedditConfig,
        http_client: reqwest::Client,
        rate_limiter: RateLimiter,
    ) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTHORIZE_URL.to_string()).map_err(|e| {
            ConfigError::InvalidValue {
                field: "authorize_url".to_string(),
                value: e.to_string(),
            }
        })?;
        let token_url =
            TokenUrl::new(config.token_url.clone()).map_err(|_| ConfigError::InvalidValue {
                field: "reddit.token_url".to_string(),
                value: config.token_url.clone(),
            })?;

        let oauth_client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::BasicAuth);

        Ok(Self {
            oauth_client,
            http_client,
            rate_limiter,
            redirect_uri: config.redirect_uri.clone(),
            expiry_buffer: config.token_expiry_buffer(),
            token: Arc::new(Mutex::new(None)),
        })
    }

    /// Returns the cached token, refreshing it first when missing or near expiry.
    ///
    /// The cache lock is held across the refresh so concurrent callers wait for
    /// one token request instead of each issuing their own.
    pub async fn get_token(&self) -> Result<String, CoreError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_fresh(self.expiry_buffer) {
                debug!("Reusing cached Reddit access token");
                return Ok(token.access_token.clone());
            }
            debug!("Cached Reddit access token is near expiry");
        }

        // Leave the slot empty if the refresh fails.
        *cached = None;
        let fresh = self.request_token().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    /// Forgets the cached token so the next `get_token` refreshes.
    pub async fn invalidate(&self) {
        let mut cached = self.token.lock().await;
        if cached.take().is_some() {
            info!("Invalidated cached Reddit access token");
        }
    }

    pub async fn has_token(&self) -> bool {
        self.token.lock().await.is_some()
    }

    async fn request_token(&self) -> Result<CachedToken, CoreError> {
        self.rate_limiter.acquire_permit().await;
        info!("Requesting new Reddit access token");

        let http_client = self.http_client.clone();
        let response = self
            .oauth_client
            .exchange_client_credentials()
            .add_extra_param("redirect_uri", self.redirect_uri.clone())
            .request_async(|request| send_token_request(http_client, request))
            .await
            .map_err(|e| match e {
                RequestTokenError::Request(err) => {
                    warn!("Token request transport failure: {}", err);
                    CoreError::Transport {
                        message: err.to_string(),
                    }
                }
                RequestTokenError::ServerResponse(body) => {
                    let reason = match body.error_description() {
                        Some(description) => format!("{}: {}", body.error(), description),
                        None => body.error().to_string(),
                    };
                    warn!("Reddit rejected token request: {}", reason);
                    CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason })
                }
                RequestTokenError::Parse(err, _) => {
                    warn!("Unreadable token response: {}", err);
                    CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                        reason: format!("unreadable token response: {}", err),
                    })
                }
                RequestTokenError::Other(reason) => {
                    warn!("Token request failed: {}", reason);
                    CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason })
                }
            })?;

        let mut lifetime = response.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
        if lifetime > MAX_TOKEN_LIFETIME {
            warn!(
                "Token lifetime {:?} exceeds {:?}, capping it",
                lifetime, MAX_TOKEN_LIFETIME
            );
            lifetime = MAX_TOKEN_LIFETIME;
        }
        debug!("Received Reddit access token valid for {:?}", lifetime);

        Ok(CachedToken {
            access_token: response.access_token().secret().clone(),
            expires_at: Instant::now() + lifetime,
        })
    }
}

/// Sends an oauth2 token request through the shared reqwest client so it
/// carries the configured user agent and timeouts.
async fn send_token_request(
    client: reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = client
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limiter::RateLimitConfig;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer, buffer_secs: u64) -> RedditConfig {
        RedditConfig {
            client_id: "test_client_id".to_string(),
            client_secret: "test_client_secret".to_string(),
            user_agent: "snoobot-test/1.0".to_string(),
            token_url: format!("{}/api/v1/access_token", server.uri()),
            api_base: server.uri(),
            min_request_interval_ms: 0,
            token_expiry_buffer_secs: buffer_secs,
            ..RedditConfig::default()
        }
    }

    fn cache_for(config: &RedditConfig) -> CredentialCache {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap();
        let limiter = RateLimiter::new(RateLimitConfig::with_min_interval(Duration::ZERO));
        CredentialCache::new(config, http, limiter).unwrap()
    }

    fn token_body(token: &str, expires_in: u64) -> serde_json::Value {
        json!({
            "access_token": token,
            "token_type": "bearer",
            "expires_in": expires_in,
            "scope": "*"
        })
    }

    #[tokio::test]
    async fn test_token_is_cached_within_validity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .and(header_exists("authorization"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("redirect_uri="))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("abc", 3600)))
            .expect(1)
            .mount(&server)
            .await;

        let cache = cache_for(&test_config(&server, 300));
        assert!(!cache.has_token().await);

        assert_eq!(cache.get_token().await.unwrap(), "abc");
        assert_eq!(cache.get_token().await.unwrap(), "abc");
        assert!(cache.has_token().await);
    }

    #[tokio::test]
    async fn test_near_expiry_token_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("short", 60)))
            .expect(2)
            .mount(&server)
            .await;

        // A 60 second token is already inside the 300 second buffer.
        let cache = cache_for(&test_config(&server, 300));
        cache.get_token().await.unwrap();
        cache.get_token().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("abc", 3600)))
            .expect(2)
            .mount(&server)
            .await;

        let cache = cache_for(&test_config(&server, 300));
        cache.get_token().await.unwrap();
        cache.invalidate().await;
        assert!(!cache.has_token().await);
        cache.get_token().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_credentials_leave_cache_unset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "error": "invalid_client" })),
            )
            .mount(&server)
            .await;

        let cache = cache_for(&test_config(&server, 300));
        let result = cache.get_token().await;

        match result {
            Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason })) => {
                assert!(reason.contains("invalid_client"));
            }
            other => panic!("Expected AuthenticationFailed, got {:?}", other),
        }
        assert!(!cache.has_token().await);
    }

    #[tokio::test]
    async fn test_oversized_lifetime_is_capped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "forever",
                "token_type": "bearer",
                "expires_in": u64::MAX
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cache = cache_for(&test_config(&server, 300));
        assert_eq!(cache.get_token().await.unwrap(), "forever");
        assert_eq!(cache.get_token().await.unwrap(), "forever");

        let cached = cache.token.lock().await.clone().unwrap();
        assert!(cached.expires_at <= Instant::now() + MAX_TOKEN_LIFETIME);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("shared", 3600)))
            .expect(1)
            .mount(&server)
            .await;

        let cache = cache_for(&test_config(&server, 300));
        let (a, b) = tokio::join!(cache.get_token(), cache.get_token());
        assert_eq!(a.unwrap(), "shared");
        assert_eq!(b.unwrap(), "shared");
    }

    #[test]
    fn test_new_cache_starts_empty() {
        let config = RedditConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            user_agent: "snoobot-test/1.0".to_string(),
            ..RedditConfig::default()
        };
        let cache = cache_for(&config);
        assert!(!tokio_test::block_on(cache.has_token()));
    }

    #[test]
    fn test_invalid_token_url_rejected() {
        let config = RedditConfig {
            token_url: "not a url".to_string(),
            ..RedditConfig::default()
        };
        let limiter = RateLimiter::new(RateLimitConfig::reddit_oauth());
        let result = CredentialCache::new(&config, reqwest::Client::new(), limiter);
        assert!(matches!(
            result,
            Err(CoreError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_cached_token_freshness() {
        let token = CachedToken {
            access_token: "abc".to_string(),
            expires_at: Instant::now() + Duration::from_secs(600),
        };
        assert!(token.is_fresh(Duration::from_secs(300)));
        assert!(!token.is_fresh(Duration::from_secs(900)));
    }
}
