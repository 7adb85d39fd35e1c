use revai_core::CoordinatorEvent;
use std::time::{Duration, Instant};

/// Events emitted by the retry policy.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// A retry attempt is about to be made.
    Retry {
        pattern_name: String,
        timestamp: Instant,
        attempt: u32,
        delay: Duration,
    },
    /// The operation succeeded, either on the first try or after retries.
    Success {
        pattern_name: String,
        timestamp: Instant,
        attempts: u32,
    },
    /// All retry attempts were exhausted without success.
    RetriesExhausted {
        pattern_name: String,
        timestamp: Instant,
        attempts: u32,
    },
    /// An error occurred but was not retried, per the retry predicate.
    NonRetryableError {
        pattern_name: String,
        timestamp: Instant,
        attempt: u32,
    },
    /// A retry was skipped because the retry budget was exhausted.
    BudgetExhausted {
        pattern_name: String,
        timestamp: Instant,
        attempt: u32,
    },
}

impl CoordinatorEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::RetriesExhausted { .. } => "retries_exhausted",
            RetryEvent::NonRetryableError { .. } => "non_retryable_error",
            RetryEvent::BudgetExhausted { .. } => "budget_exhausted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::RetriesExhausted { timestamp, .. }
            | RetryEvent::NonRetryableError { timestamp, .. }
            | RetryEvent::BudgetExhausted { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RetryEvent::Retry { pattern_name, .. }
            | RetryEvent::Success { pattern_name, .. }
            | RetryEvent::RetriesExhausted { pattern_name, .. }
            | RetryEvent::NonRetryableError { pattern_name, .. }
            | RetryEvent::BudgetExhausted { pattern_name, .. } => pattern_name,
        }
    }
}
