//! Common error type for the coordination core.
//!
//! [`CoordinatorError`] lets every admission/dispatch component return its
//! own rejection reasons without each caller writing `From` impls by hand.
//!
//! ```rust
//! use revai_core::CoordinatorError;
//!
//! #[derive(Debug)]
//! struct LlmError(String);
//!
//! impl std::fmt::Display for LlmError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "llm call failed: {}", self.0)
//!     }
//! }
//!
//! impl std::error::Error for LlmError {}
//!
//! type JobError = CoordinatorError<LlmError>;
//! ```

use std::fmt;
use std::time::Duration;

/// A common error type covering every rejection reason a job can encounter
/// while moving through admission and execution, plus the underlying
/// application error from the `LLMCaller`.
#[derive(Debug, Clone)]
pub enum CoordinatorError<E> {
    /// Rejected by the per-identity token bucket.
    RateLimited {
        /// How long until a token is expected to be available, if known.
        retry_after: Option<Duration>,
    },

    /// Rejected because the reservation would exceed the caller's remaining
    /// quota for the current period.
    QuotaExceeded {
        /// Quota remaining at the time of rejection.
        remaining: f64,
    },

    /// Circuit breaker is open; the call was never attempted.
    BreakerOpen {
        /// Circuit breaker name, if configured.
        name: Option<String>,
    },

    /// The dispatch queue is at capacity.
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// All retry attempts were exhausted.
    RetriesExhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// The underlying `LLMCaller` returned an error.
    Application(E),
}

impl<E> fmt::Display for CoordinatorError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinatorError::RateLimited { retry_after } => match retry_after {
                Some(d) => write!(f, "rate limited, retry after {:?}", d),
                None => write!(f, "rate limited"),
            },
            CoordinatorError::QuotaExceeded { remaining } => {
                write!(f, "quota exceeded ({:.4} remaining)", remaining)
            }
            CoordinatorError::BreakerOpen { name } => match name {
                Some(n) => write!(f, "circuit breaker '{}' is open", n),
                None => write!(f, "circuit breaker is open"),
            },
            CoordinatorError::QueueFull { capacity } => {
                write!(f, "dispatch queue full (capacity {})", capacity)
            }
            CoordinatorError::RetriesExhausted { attempts } => {
                write!(f, "retries exhausted after {} attempts", attempts)
            }
            CoordinatorError::Application(e) => write!(f, "application error: {}", e),
        }
    }
}

impl<E> std::error::Error for CoordinatorError<E> where E: std::error::Error {}

impl<E> CoordinatorError<E> {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, CoordinatorError::RateLimited { .. })
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, CoordinatorError::QuotaExceeded { .. })
    }

    pub fn is_breaker_open(&self) -> bool {
        matches!(self, CoordinatorError::BreakerOpen { .. })
    }

    pub fn is_queue_full(&self) -> bool {
        matches!(self, CoordinatorError::QueueFull { .. })
    }

    pub fn is_application(&self) -> bool {
        matches!(self, CoordinatorError::Application(_))
    }

    /// Extracts the application error, if this is an `Application` variant.
    pub fn application_error(self) -> Option<E> {
        match self {
            CoordinatorError::Application(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the application error using a function.
    pub fn map_application<F, T>(self, f: F) -> CoordinatorError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            CoordinatorError::RateLimited { retry_after } => {
                CoordinatorError::RateLimited { retry_after }
            }
            CoordinatorError::QuotaExceeded { remaining } => {
                CoordinatorError::QuotaExceeded { remaining }
            }
            CoordinatorError::BreakerOpen { name } => CoordinatorError::BreakerOpen { name },
            CoordinatorError::QueueFull { capacity } => CoordinatorError::QueueFull { capacity },
            CoordinatorError::RetriesExhausted { attempts } => {
                CoordinatorError::RetriesExhausted { attempts }
            }
            CoordinatorError::Application(e) => CoordinatorError::Application(f(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct TestError;

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test error")
        }
    }

    impl std::error::Error for TestError {}

    const _: () = {
        const fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<CoordinatorError<TestError>>();
    };

    #[test]
    fn displays_rate_limited() {
        let err: CoordinatorError<TestError> = CoordinatorError::RateLimited {
            retry_after: Some(Duration::from_millis(50)),
        };
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn application_error_round_trips() {
        let err: CoordinatorError<TestError> = CoordinatorError::Application(TestError);
        assert!(err.is_application());
        assert!(err.application_error().is_some());
    }

    #[test]
    fn map_application_preserves_other_variants() {
        let err: CoordinatorError<TestError> = CoordinatorError::QueueFull { capacity: 16 };
        let mapped = err.map_application(|_: TestError| 0u8);
        assert!(mapped.is_queue_full());
    }
}
