use revai_circuitbreaker::CircuitBreakerError;
use revai_costtracker::CostTrackerError;
use revai_ratelimiter::RateLimiterError;

/// Reason a `submit` call was rejected before the job ever reached the queue.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: std::time::Duration },

    #[error("quota exceeded, {remaining} remaining")]
    QuotaExceeded { remaining: f64 },

    #[error("queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("duplicate submission, existing job {existing_job_id}")]
    Duplicate { existing_job_id: revai_core::JobId },

    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },
}

impl DispatchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, DispatchError::RateLimited { .. })
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, DispatchError::QuotaExceeded { .. })
    }

    pub fn is_queue_full(&self) -> bool {
        matches!(self, DispatchError::QueueFull { .. })
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, DispatchError::Duplicate { .. })
    }
}

impl From<RateLimiterError> for DispatchError {
    fn from(err: RateLimiterError) -> Self {
        match err {
            RateLimiterError::RateLimitExceeded { retry_after } => {
                DispatchError::RateLimited { retry_after }
            }
        }
    }
}

impl From<CostTrackerError> for DispatchError {
    fn from(err: CostTrackerError) -> Self {
        match err {
            CostTrackerError::QuotaExceeded { remaining } => {
                DispatchError::QuotaExceeded { remaining }
            }
        }
    }
}

/// Reason a job failed after it was admitted and dispatched to a worker.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutionError {
    #[error("transient error after {attempts} attempt(s): {message}")]
    Transient { attempts: u32, message: String },

    #[error("permanent error: {message}")]
    Permanent { message: String },

    #[error("cancelled")]
    Cancelled,

    #[error("circuit breaker open for {name}")]
    BreakerOpen { name: String },

    #[error("dispatcher shut down before this job could run")]
    Shutdown,
}

impl From<CircuitBreakerError> for ExecutionError {
    fn from(err: CircuitBreakerError) -> Self {
        match err {
            CircuitBreakerError::Open { name } => ExecutionError::BreakerOpen { name },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_rate_limiter_error() {
        let err: DispatchError = RateLimiterError::RateLimitExceeded {
            retry_after: std::time::Duration::from_secs(3),
        }
        .into();
        assert!(err.is_rate_limited());
    }

    #[test]
    fn converts_cost_tracker_error() {
        let err: DispatchError = CostTrackerError::QuotaExceeded { remaining: 0.0 }.into();
        assert!(err.is_quota_exceeded());
    }
}
