use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// The circuit breaker's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    /// Calls are let through; consecutive failures are tracked.
    Closed = 0,
    /// Calls are rejected until `reset_timeout` elapses.
    Open = 1,
    /// A single probe call is let through to test recovery.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
    /// Set while the single permitted half-open probe has not yet completed.
    half_open_probe_in_flight: bool,
}

/// The breaker's internal state machine.
///
/// All decisions (whether a call is permitted, and how an outcome affects
/// state) happen under a single mutex, which is what makes the half-open
/// "only one probe at a time" rule correct: two callers racing to acquire
/// the half-open slot can't both win.
pub(crate) struct Circuit {
    inner: Mutex<Inner>,
    state_atomic: AtomicU8,
}

impl Circuit {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
                half_open_probe_in_flight: false,
            }),
            state_atomic: AtomicU8::new(CircuitState::Closed as u8),
        }
    }

    /// Returns the current state without taking the lock.
    pub(crate) fn state_sync(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(Ordering::Acquire))
    }

    /// Decides whether a call may proceed, transitioning Open -> HalfOpen
    /// lazily if `reset_timeout` has elapsed.
    pub(crate) fn try_acquire(&self, config: &CircuitBreakerConfig) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|opened_at| opened_at.elapsed())
                    .unwrap_or_default();
                if elapsed >= config.reset_timeout {
                    self.transition(&mut inner, CircuitState::HalfOpen, config);
                    inner.half_open_probe_in_flight = true;
                    true
                } else {
                    self.emit_rejected(config);
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_probe_in_flight {
                    self.emit_rejected(config);
                    false
                } else {
                    inner.half_open_probe_in_flight = true;
                    true
                }
            }
        }
    }

    pub(crate) fn record_success(&self, config: &CircuitBreakerConfig) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.half_open_probe_in_flight = false;
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= config.success_threshold {
                    self.transition(&mut inner, CircuitState::Closed, config);
                }
            }
            CircuitState::Open => {}
        }
        self.emit_outcome(config, true, inner.state);
    }

    pub(crate) fn record_failure(&self, config: &CircuitBreakerConfig) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= config.failure_threshold {
                    self.transition(&mut inner, CircuitState::Open, config);
                }
            }
            CircuitState::HalfOpen => {
                inner.half_open_probe_in_flight = false;
                self.transition(&mut inner, CircuitState::Open, config);
            }
            CircuitState::Open => {}
        }
        self.emit_outcome(config, false, inner.state);
    }

    /// Forces the circuit open regardless of recorded counts.
    pub(crate) fn force_open(&self, config: &CircuitBreakerConfig) {
        let mut inner = self.inner.lock().unwrap();
        self.transition(&mut inner, CircuitState::Open, config);
    }

    /// Forces the circuit closed and clears counters.
    pub(crate) fn force_closed(&self, config: &CircuitBreakerConfig) {
        let mut inner = self.inner.lock().unwrap();
        self.transition(&mut inner, CircuitState::Closed, config);
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState, config: &CircuitBreakerConfig) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;
        self.state_atomic.store(to as u8, Ordering::Release);

        match to {
            CircuitState::Open => {
                inner.opened_at = Some(Instant::now());
                inner.consecutive_failures = 0;
                inner.consecutive_successes = 0;
                inner.half_open_probe_in_flight = false;
            }
            CircuitState::HalfOpen => {
                inner.consecutive_successes = 0;
            }
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
                inner.consecutive_successes = 0;
                inner.opened_at = None;
                inner.half_open_probe_in_flight = false;
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            breaker = %config.name,
            from = ?from,
            to = ?to,
            "circuit breaker state transition"
        );

        #[cfg(feature = "metrics")]
        metrics::counter!(
            "circuitbreaker_transitions_total",
            "breaker" => config.name.clone(),
            "to" => format!("{:?}", to)
        )
        .increment(1);

        let event = CircuitBreakerEvent::StateTransition {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            from_state: from,
            to_state: to,
        };
        config.event_listeners.emit(&event);
    }

    fn emit_rejected(&self, config: &CircuitBreakerConfig) {
        #[cfg(feature = "metrics")]
        metrics::counter!(
            "circuitbreaker_calls_total",
            "breaker" => config.name.clone(),
            "outcome" => "rejected"
        )
        .increment(1);

        let event = CircuitBreakerEvent::CallRejected {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
        };
        config.event_listeners.emit(&event);
    }

    fn emit_outcome(&self, config: &CircuitBreakerConfig, success: bool, state: CircuitState) {
        #[cfg(feature = "metrics")]
        metrics::counter!(
            "circuitbreaker_calls_total",
            "breaker" => config.name.clone(),
            "outcome" => if success { "success" } else { "failure" }
        )
        .increment(1);

        let event = if success {
            CircuitBreakerEvent::SuccessRecorded {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                state,
            }
        } else {
            CircuitBreakerEvent::FailureRecorded {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                state,
            }
        };
        config.event_listeners.emit(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CircuitBreakerConfigBuilder;
    use std::time::Duration;

    fn config(failure_threshold: u32, success_threshold: u32, reset_timeout: Duration) -> CircuitBreakerConfig {
        CircuitBreakerConfigBuilder::new()
            .failure_threshold(failure_threshold)
            .success_threshold(success_threshold)
            .reset_timeout(reset_timeout)
            .build_config()
    }

    #[test]
    fn opens_after_consecutive_failures() {
        let circuit = Circuit::new();
        let config = config(3, 1, Duration::from_secs(60));

        assert!(circuit.try_acquire(&config));
        circuit.record_failure(&config);
        assert_eq!(circuit.state_sync(), CircuitState::Closed);

        assert!(circuit.try_acquire(&config));
        circuit.record_failure(&config);
        assert!(circuit.try_acquire(&config));
        circuit.record_failure(&config);

        assert_eq!(circuit.state_sync(), CircuitState::Open);
        assert!(!circuit.try_acquire(&config));
    }

    #[test]
    fn success_resets_failure_count_while_closed() {
        let circuit = Circuit::new();
        let config = config(2, 1, Duration::from_secs(60));

        circuit.record_failure(&config);
        circuit.record_success(&config);
        circuit.record_failure(&config);
        assert_eq!(circuit.state_sync(), CircuitState::Closed);
    }

    #[test]
    fn half_open_allows_single_probe() {
        let circuit = Circuit::new();
        let config = config(1, 1, Duration::from_millis(10));

        assert!(circuit.try_acquire(&config));
        circuit.record_failure(&config);
        assert_eq!(circuit.state_sync(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(20));

        assert!(circuit.try_acquire(&config));
        assert_eq!(circuit.state_sync(), CircuitState::HalfOpen);
        // A second caller must not get a concurrent probe.
        assert!(!circuit.try_acquire(&config));
    }

    #[test]
    fn half_open_failure_reopens() {
        let circuit = Circuit::new();
        let config = config(1, 1, Duration::from_millis(10));

        circuit.try_acquire(&config);
        circuit.record_failure(&config);
        std::thread::sleep(Duration::from_millis(20));

        assert!(circuit.try_acquire(&config));
        circuit.record_failure(&config);
        assert_eq!(circuit.state_sync(), CircuitState::Open);
    }

    #[test]
    fn half_open_closes_after_consecutive_successes() {
        let circuit = Circuit::new();
        let config = config(1, 2, Duration::from_millis(10));

        circuit.try_acquire(&config);
        circuit.record_failure(&config);
        std::thread::sleep(Duration::from_millis(20));

        assert!(circuit.try_acquire(&config));
        circuit.record_success(&config);
        assert_eq!(circuit.state_sync(), CircuitState::HalfOpen);

        assert!(circuit.try_acquire(&config));
        circuit.record_success(&config);
        assert_eq!(circuit.state_sync(), CircuitState::Closed);
    }
}
