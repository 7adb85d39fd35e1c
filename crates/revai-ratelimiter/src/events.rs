use revai_core::Identity;
use std::time::Instant;

/// Events emitted by the rate limiter.
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// A token was granted.
    PermitAcquired {
        pattern_name: String,
        timestamp: Instant,
        identity: Identity,
        remaining: f64,
    },
    /// No token was available; the request is rejected.
    PermitRejected {
        pattern_name: String,
        timestamp: Instant,
        identity: Identity,
    },
    /// A bucket was reset to full capacity, e.g. via an explicit quota reset.
    BucketReset {
        pattern_name: String,
        timestamp: Instant,
        identity: Identity,
    },
}

impl revai_core::CoordinatorEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::PermitAcquired { .. } => "permit_acquired",
            RateLimiterEvent::PermitRejected { .. } => "permit_rejected",
            RateLimiterEvent::BucketReset { .. } => "bucket_reset",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::PermitAcquired { timestamp, .. }
            | RateLimiterEvent::PermitRejected { timestamp, .. }
            | RateLimiterEvent::BucketReset { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RateLimiterEvent::PermitAcquired { pattern_name, .. }
            | RateLimiterEvent::PermitRejected { pattern_name, .. }
            | RateLimiterEvent::BucketReset { pattern_name, .. } => pattern_name,
        }
    }
}
