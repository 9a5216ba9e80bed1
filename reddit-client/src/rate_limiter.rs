use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Minimum spacing between the starts of two permitted requests.
    pub min_interval: Duration,
}

impl RateLimitConfig {
    pub fn reddit_oauth() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
        }
    }

    pub fn with_min_interval(min_interval: Duration) -> Self {
        Self { min_interval }
    }
}

#[derive(Debug, Default)]
struct WindowState {
    last_permit: Option<Instant>,
    permits_granted: u64,
}

/// Spaces requests against the Reddit API.
///
/// One instance is shared by token requests and content requests. Waiters
/// hold the lock while sleeping, so turns are handed out in lock order and
/// two callers can never observe the same free slot.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Arc<Mutex<WindowState>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(WindowState::default())),
        }
    }

    /// Suspends until `min_interval` has passed since the previous permit.
    pub async fn acquire_permit(&self) -> RateLimitPermit {
        let start_time = Instant::now();
        let mut state = self.state.lock().await;

        if let Some(last) = state.last_permit {
            let ready_at = last + self.config.min_interval;
            if ready_at > Instant::now() {
                tracing::debug!(
                    "Rate limit spacing, waiting {:?}",
                    ready_at.saturating_duration_since(Instant::now())
                );
                sleep_until(ready_at).await;
            }
        }

        state.last_permit = Some(Instant::now());
        state.permits_granted += 1;

        RateLimitPermit {
            queue_wait_time: start_time.elapsed(),
        }
    }

    pub async fn get_rate_limit_status(&self) -> RateLimitStatus {
        let state = self.state.lock().await;
        let next_permit_in = state
            .last_permit
            .map(|last| (last + self.config.min_interval).saturating_duration_since(Instant::now()))
            .unwrap_or_default();

        RateLimitStatus {
            min_interval: self.config.min_interval,
            permits_granted: state.permits_granted,
            next_permit_in,
        }
    }
}

#[derive(Debug)]
pub struct RateLimitPermit {
    pub queue_wait_time: Duration,
}

#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    pub min_interval: Duration,
    pub permits_granted: u64,
    pub next_permit_in: Duration,
}

impl RateLimitStatus {
    pub fn is_ready(&self) -> bool {
        self.next_permit_in.is_zero()
    }
}
