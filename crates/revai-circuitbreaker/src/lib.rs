//! Circuit breaker guarding calls to the LLM endpoint.
//!
//! Unlike the sliding-window-rate breakers common elsewhere, this one trips
//! on consecutive failures and recovers on consecutive successes, and
//! enforces that only one probe call is in flight while half-open.
//!
//! ## States
//! - **Closed**: calls proceed; consecutive failures are counted.
//! - **Open**: calls are rejected until `reset_timeout` elapses.
//! - **HalfOpen**: exactly one probe call is allowed through at a time.
//!
//! # Examples
//!
//! ```
//! use revai_circuitbreaker::CircuitBreakerConfigBuilder;
//!
//! let breaker = CircuitBreakerConfigBuilder::new()
//!     .failure_threshold(5)
//!     .success_threshold(2)
//!     .build();
//!
//! if breaker.try_acquire().is_ok() {
//!     // make the call, then report the outcome:
//!     breaker.record_success();
//! }
//! ```

mod circuit;
mod config;
mod error;
mod events;

pub use circuit::CircuitState;
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;

use circuit::Circuit;
use std::sync::Arc;

/// A consecutive-failure circuit breaker.
///
/// Cheap to clone; clones share the same underlying state.
#[derive(Clone)]
pub struct CircuitBreaker {
    circuit: Arc<Circuit>,
    config: Arc<CircuitBreakerConfig>,
}

impl CircuitBreaker {
    pub(crate) fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            circuit: Arc::new(Circuit::new()),
            config: Arc::new(config),
        }
    }

    /// Returns a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Checks whether a call may proceed right now.
    ///
    /// The caller must report the outcome via [`Self::record_success`] or
    /// [`Self::record_failure`] exactly once per successful acquisition, or
    /// the half-open probe slot is never released.
    pub fn try_acquire(&self) -> Result<(), CircuitBreakerError> {
        if self.circuit.try_acquire(&self.config) {
            Ok(())
        } else {
            Err(CircuitBreakerError::Open {
                name: self.config.name.clone(),
            })
        }
    }

    /// Records a successful call outcome.
    pub fn record_success(&self) {
        self.circuit.record_success(&self.config);
    }

    /// Records a failed call outcome.
    pub fn record_failure(&self) {
        self.circuit.record_failure(&self.config);
    }

    /// Returns the current state without blocking.
    pub fn state(&self) -> CircuitState {
        self.circuit.state_sync()
    }

    /// How long the circuit stays open before allowing a probe call, used by
    /// callers that schedule a retry timer off an open breaker.
    pub fn reset_timeout(&self) -> std::time::Duration {
        self.config.reset_timeout
    }

    /// Forces the circuit open, e.g. for an operator-triggered kill switch.
    pub fn force_open(&self) {
        self.circuit.force_open(&self.config);
    }

    /// Forces the circuit closed and clears its counters.
    pub fn force_closed(&self) {
        self.circuit.force_closed(&self.config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_when_open() {
        let breaker = CircuitBreakerConfigBuilder::new()
            .failure_threshold(1)
            .build();

        assert!(breaker.try_acquire().is_ok());
        breaker.record_failure();

        assert_eq!(breaker.state(), CircuitState::Open);
        let err = breaker.try_acquire().unwrap_err();
        assert!(err.is_open());
    }

    #[test]
    fn force_open_and_closed() {
        let breaker = CircuitBreakerConfigBuilder::new().build();
        assert_eq!(breaker.state(), CircuitState::Closed);

        breaker.force_open();
        assert_eq!(breaker.state(), CircuitState::Open);

        breaker.force_closed();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn event_listeners_observe_transitions() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc as StdArc;

        let transitions = StdArc::new(AtomicUsize::new(0));
        let t_clone = StdArc::clone(&transitions);

        let breaker = CircuitBreakerConfigBuilder::new()
            .failure_threshold(1)
            .on_state_transition(move |_, _| {
                t_clone.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        breaker.try_acquire().unwrap();
        breaker.record_failure();

        assert_eq!(transitions.load(Ordering::SeqCst), 1);
    }
}
