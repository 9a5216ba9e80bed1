use snoobot_core::{ConfigError, CoreError, ErrorExt, FetchOutcome, RedditApiError, RegistryError};

#[test]
fn test_error_codes() {
    let reddit_error = CoreError::RedditApi(RedditApiError::RateLimitExceeded);
    assert_eq!(reddit_error.error_code(), "REDDIT_API");

    let registry_error = CoreError::Registry(RegistryError::MissingField {
        field: "webhook".to_string(),
    });
    assert_eq!(registry_error.error_code(), "REGISTRY");

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "reddit.client_id".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");

    let transport_error = CoreError::Transport {
        message: "connection refused".to_string(),
    };
    assert_eq!(transport_error.error_code(), "TRANSPORT");
}

#[test]
fn test_retryable_errors() {
    let retryable_error = CoreError::RedditApi(RedditApiError::UpstreamStatus {
        status_code: 503,
        detail: None,
    });
    assert!(retryable_error.is_retryable());

    let not_found = CoreError::RedditApi(RedditApiError::SubredditNotFound {
        subreddit: "nope".to_string(),
    });
    assert!(!not_found.is_retryable());

    let validation = CoreError::Registry(RegistryError::MissingField {
        field: "token".to_string(),
    });
    assert!(!validation.is_retryable());
}

#[test]
fn test_user_friendly_messages() {
    let upstream = CoreError::RedditApi(RedditApiError::UpstreamStatus {
        status_code: 500,
        detail: Some("internal".to_string()),
    });
    let message = upstream.user_friendly_message();
    assert!(message.contains("HTTP 500"));
    assert!(message.contains("internal"));

    let validation = CoreError::Registry(RegistryError::MissingField {
        field: "webhook".to_string(),
    });
    assert!(validation.user_friendly_message().contains("webhook"));

    let transport = FetchOutcome::TransportError("timed out".to_string()).into_message("rust");
    assert!(transport.contains("try again later"));
}

#[test]
fn test_outcome_error_mapping() {
    let error = FetchOutcome::NotFound.to_error("kotlin").unwrap();
    match error {
        CoreError::RedditApi(RedditApiError::SubredditNotFound { subreddit }) => {
            assert_eq!(subreddit, "kotlin")
        }
        other => panic!("Expected SubredditNotFound, got {:?}", other),
    }

    // Logging helpers hand back the same error.
    let error = FetchOutcome::RateLimited.to_error("kotlin").unwrap();
    assert_eq!(error.log_warn().error_code(), "REDDIT_API");
}
