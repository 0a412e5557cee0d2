//! Client-side pacing between feed reads.
//!
//! The collector calls [`Pacer::after_item`] after every post it iterates and
//! [`Pacer::after_batch`] after every batch flush. [`FixedDelayPacer`] waits a
//! constant interval at both points; [`TokenBucketPacer`] only waits when the
//! configured request rate would otherwise be exceeded.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;
use tracker_core::CoreError;

pub trait Pacer {
    async fn after_item(&self);
    async fn after_batch(&self);
}

impl<P: Pacer + ?Sized> Pacer for &P {
    async fn after_item(&self) {
        (**self).after_item().await
    }

    async fn after_batch(&self) {
        (**self).after_batch().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelayPacer {
    item_delay: Duration,
    batch_delay: Duration,
}

impl FixedDelayPacer {
    pub fn new(item_delay: Duration, batch_delay: Duration) -> Self {
        Self {
            item_delay,
            batch_delay,
        }
    }

    /// No waiting at all.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn item_delay(&self) -> Duration {
        self.item_delay
    }

    pub fn batch_delay(&self) -> Duration {
        self.batch_delay
    }
}

impl Pacer for FixedDelayPacer {
    async fn after_item(&self) {
        if !self.item_delay.is_zero() {
            sleep(self.item_delay).await;
        }
    }

    async fn after_batch(&self) {
        if !self.batch_delay.is_zero() {
            debug!("Pausing {:?} after batch", self.batch_delay);
            sleep(self.batch_delay).await;
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub time_window: Duration,
    pub burst_allowance: u32,
}

impl RateLimitConfig {
    pub fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            time_window: Duration::from_secs(60),
            burst_allowance: (max_requests / 10).max(1),
        }
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct TokenBucket {
    state: Mutex<BucketState>,
    capacity: f64,
    refill_rate: f64, // tokens per second
}

impl TokenBucket {
    /// Fails unless the budget, window and burst are all non-zero.
    pub fn new(config: &RateLimitConfig) -> Result<Self, CoreError> {
        if config.max_requests == 0 || config.time_window.is_zero() || config.burst_allowance == 0
        {
            return Err(CoreError::InvalidInput {
                message: format!(
                    "rate limit of {} requests per {:?} with burst {} can never refill",
                    config.max_requests, config.time_window, config.burst_allowance
                ),
            });
        }

        let capacity = f64::from(config.burst_allowance);
        let refill_rate = f64::from(config.max_requests) / config.time_window.as_secs_f64();

        Ok(Self {
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            capacity,
            refill_rate,
        })
    }

    /// Takes `tokens_needed` tokens, or returns how long until they are available.
    pub fn try_acquire(&self, tokens_needed: f64) -> Result<(), Duration> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.refill(&mut state);

        if state.tokens >= tokens_needed {
            state.tokens -= tokens_needed;
            Ok(())
        } else {
            let missing = tokens_needed - state.tokens;
            Err(Duration::from_secs_f64(missing / self.refill_rate))
        }
    }

    pub fn available_tokens(&self) -> f64 {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.refill(&mut state);
        state.tokens
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill);
        state.tokens = (state.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity);
        state.last_refill = now;
    }
}

/// Paces items against a token bucket instead of a fixed delay.
#[derive(Debug)]
pub struct TokenBucketPacer {
    bucket: TokenBucket,
}

impl TokenBucketPacer {
    pub fn new(config: RateLimitConfig) -> Result<Self, CoreError> {
        Ok(Self {
            bucket: TokenBucket::new(&config)?,
        })
    }

    pub fn available_tokens(&self) -> f64 {
        self.bucket.available_tokens()
    }
}

impl Pacer for TokenBucketPacer {
    async fn after_item(&self) {
        loop {
            match self.bucket.try_acquire(1.0) {
                Ok(()) => break,
                Err(wait_time) => {
                    debug!("Rate limit reached, waiting {:?}", wait_time);
                    sleep(wait_time).await;
                }
            }
        }
    }

    async fn after_batch(&self) {}
}
