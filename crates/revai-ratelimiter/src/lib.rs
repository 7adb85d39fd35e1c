//! Per-identity token-bucket rate limiting.
//!
//! Each [`Identity`] (an authenticated user or, failing that, a client IP)
//! gets its own lazily-refilled token bucket. Authenticated and
//! IP-addressed identities never share a bucket, since `Identity` itself
//! distinguishes the two and is used as the map key.
//!
//! # Examples
//!
//! ```
//! use revai_ratelimiter::RateLimiterConfigBuilder;
//! use revai_core::Identity;
//!
//! let limiter = RateLimiterConfigBuilder::new()
//!     .capacity(10.0)
//!     .refill_rate(10.0)
//!     .build();
//!
//! let identity = Identity::User("alice".to_string());
//! assert!(limiter.check(&identity).is_ok());
//! ```

mod config;
mod error;
mod events;
mod limiter;

pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use error::RateLimiterError;
pub use events::RateLimiterEvent;

use limiter::TokenBucket;
use revai_core::Identity;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

/// A per-identity token-bucket rate limiter.
///
/// Cloning shares the underlying bucket table; use this when handing the
/// limiter to multiple worker tasks.
#[derive(Clone)]
pub struct RateLimiter {
    config: Arc<RateLimiterConfig>,
    buckets: Arc<RwLock<HashMap<Identity, Arc<Mutex<TokenBucket>>>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config: Arc::new(config),
            buckets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn bucket_for(&self, identity: &Identity) -> Arc<Mutex<TokenBucket>> {
        if let Some(bucket) = self.buckets.read().unwrap().get(identity) {
            return Arc::clone(bucket);
        }

        let mut buckets = self.buckets.write().unwrap();
        Arc::clone(
            buckets
                .entry(identity.clone())
                .or_insert_with(|| Arc::new(Mutex::new(TokenBucket::new(
                    self.config.capacity,
                    self.config.refill_rate,
                )))),
        )
    }

    /// Attempts to withdraw one token for `identity`.
    ///
    /// Creates the identity's bucket, full, on first use.
    pub fn check(&self, identity: &Identity) -> Result<(), RateLimiterError> {
        let bucket = self.bucket_for(identity);
        let mut bucket = bucket.lock().unwrap();
        let now = Instant::now();

        match bucket.try_acquire(now) {
            Ok(remaining) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    pattern = %self.config.name,
                    identity = ?identity,
                    remaining,
                    "rate limiter permit acquired"
                );
                #[cfg(feature = "metrics")]
                metrics::counter!(
                    "ratelimiter_permits_acquired_total",
                    "pattern" => self.config.name.clone()
                )
                .increment(1);

                let event = RateLimiterEvent::PermitAcquired {
                    pattern_name: self.config.name.clone(),
                    timestamp: now,
                    identity: identity.clone(),
                    remaining,
                };
                self.config.event_listeners.emit(&event);
                Ok(())
            }
            Err(retry_after) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    pattern = %self.config.name,
                    identity = ?identity,
                    "rate limiter permit rejected"
                );
                #[cfg(feature = "metrics")]
                metrics::counter!(
                    "ratelimiter_permits_rejected_total",
                    "pattern" => self.config.name.clone()
                )
                .increment(1);

                let event = RateLimiterEvent::PermitRejected {
                    pattern_name: self.config.name.clone(),
                    timestamp: now,
                    identity: identity.clone(),
                };
                self.config.event_listeners.emit(&event);
                Err(RateLimiterError::RateLimitExceeded { retry_after })
            }
        }
    }

    /// Returns the number of tokens currently available for `identity`,
    /// without consuming one. Identities never seen before report a full
    /// bucket.
    pub fn remaining(&self, identity: &Identity) -> f64 {
        if let Some(bucket) = self.buckets.read().unwrap().get(identity) {
            return bucket.lock().unwrap().remaining(Instant::now());
        }
        self.config.capacity
    }

    /// Gives back one token previously withdrawn via [`Self::check`].
    ///
    /// Used by callers that must roll back a consumed token when a later
    /// admission step rejects the request (e.g. quota or queue capacity),
    /// so the net effect matches "token consumed only on full admission".
    pub fn refund(&self, identity: &Identity) {
        let bucket = self.bucket_for(identity);
        bucket.lock().unwrap().refund(Instant::now());
    }

    /// Resets `identity`'s bucket back to full capacity.
    pub fn reset_quota(&self, identity: &Identity) {
        let bucket = self.bucket_for(identity);
        bucket.lock().unwrap().reset();

        let event = RateLimiterEvent::BucketReset {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            identity: identity.clone(),
        };
        self.config.event_listeners.emit(&event);
    }
}
