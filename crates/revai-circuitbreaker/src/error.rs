use revai_core::CoordinatorError;
use thiserror::Error;

/// Errors returned by [`crate::CircuitBreaker::try_acquire`].
#[derive(Debug, Error)]
pub enum CircuitBreakerError {
    /// The circuit is open (or a half-open probe is already in flight); the
    /// call was never attempted.
    #[error("circuit breaker '{name}' is open")]
    Open { name: String },
}

impl CircuitBreakerError {
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitBreakerError::Open { .. })
    }
}

impl<E> From<CircuitBreakerError> for CoordinatorError<E> {
    fn from(err: CircuitBreakerError) -> Self {
        match err {
            CircuitBreakerError::Open { name } => CoordinatorError::BreakerOpen {
                name: Some(name),
            },
        }
    }
}
