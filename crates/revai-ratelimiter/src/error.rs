use revai_core::CoordinatorError;
use std::fmt;
use std::time::Duration;

/// Errors that can occur when checking the rate limiter.
#[derive(Debug, Clone)]
pub enum RateLimiterError {
    /// No token was available for this identity.
    RateLimitExceeded {
        /// Estimated time until the next token is available.
        retry_after: Duration,
    },
}

impl fmt::Display for RateLimiterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimiterError::RateLimitExceeded { retry_after } => {
                write!(f, "rate limit exceeded, retry after {:?}", retry_after)
            }
        }
    }
}

impl std::error::Error for RateLimiterError {}

impl<E> From<RateLimiterError> for CoordinatorError<E> {
    fn from(err: RateLimiterError) -> Self {
        match err {
            RateLimiterError::RateLimitExceeded { retry_after } => CoordinatorError::RateLimited {
                retry_after: Some(retry_after),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let error = RateLimiterError::RateLimitExceeded {
            retry_after: Duration::from_millis(20),
        };
        assert!(error.to_string().contains("rate limit exceeded"));
    }
}
