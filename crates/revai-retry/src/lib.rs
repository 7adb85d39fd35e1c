//! Exponential backoff retry policy for calls to the LLM endpoint.
//!
//! Retries are driven by the caller's own loop (or [`RetryPolicy::execute`]
//! for the common case): the policy only decides *whether* to retry and
//! *how long* to wait, it never owns the call itself.
//!
//! # Examples
//!
//! ```
//! use revai_retry::RetryConfigBuilder;
//!
//! # async fn example() -> Result<(), String> {
//! let policy = RetryConfigBuilder::<String>::new()
//!     .max_attempts(3)
//!     .retry_on(|e: &String| e != "fatal")
//!     .build();
//!
//! let mut calls = 0;
//! let result = policy
//!     .execute(|_attempt| {
//!         calls += 1;
//!         async move {
//!             if calls < 2 {
//!                 Err("transient".to_string())
//!             } else {
//!                 Ok(42)
//!             }
//!         }
//!     })
//!     .await;
//!
//! assert_eq!(result, Ok(42));
//! # Ok(())
//! # }
//! ```

mod backoff;
mod budget;
mod config;
mod events;

pub use backoff::ExponentialBackoff;
pub use budget::{AimdBudgetBuilder, RetryBudget, RetryBudgetBuilder, TokenBucketBuilder};
pub use config::{RetryConfig, RetryConfigBuilder};
pub use events::RetryEvent;

use std::future::Future;
use std::sync::Arc;

/// A standalone retry policy: decides whether and when to retry, and can
/// drive a retry loop directly via [`Self::execute`].
///
/// Cheap to clone; clones share the same configuration and retry budget.
#[derive(Clone)]
pub struct RetryPolicy<E> {
    config: Arc<RetryConfig<E>>,
}

impl<E> RetryPolicy<E> {
    pub(crate) fn new(config: RetryConfig<E>) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Returns a new configuration builder.
    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfigBuilder::new()
    }

    /// Decides whether attempt `attempt` should be retried after `error`.
    ///
    /// `attempt` is 1-based and counts the attempt that just failed.
    /// Checks, in order: the retry predicate, the attempt ceiling, and the
    /// retry budget (if any) — each emits its own event on rejection.
    pub fn should_retry(&self, attempt: u32, error: &E) -> bool {
        if !(self.config.retry_predicate)(error) {
            self.emit_non_retryable(attempt);
            return false;
        }
        if attempt >= self.config.max_attempts {
            self.emit_exhausted(attempt);
            return false;
        }
        if let Some(budget) = &self.config.budget {
            if !budget.try_withdraw() {
                self.emit_budget_exhausted(attempt);
                return false;
            }
        }
        true
    }

    /// Computes the delay to wait before attempt `attempt + 1`.
    pub fn next_backoff(&self, attempt: u32) -> std::time::Duration {
        self.config.backoff.delay_for_attempt(attempt)
    }

    /// Records that an operation finally succeeded after `attempts` tries.
    ///
    /// Deposits back into the retry budget, if configured, and emits
    /// [`RetryEvent::Success`].
    pub fn record_success(&self, attempts: u32) {
        if let Some(budget) = &self.config.budget {
            budget.deposit();
        }
        self.config.emit(events::RetryEvent::Success {
            pattern_name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            attempts,
        });
    }

    /// Runs `f` to completion, retrying on failure per this policy.
    ///
    /// `f` is called with the 1-based attempt number and must return a
    /// fresh future each time (it owns retry state via closure capture).
    pub async fn execute<F, Fut, T>(&self, mut f: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1u32;
        loop {
            match f(attempt).await {
                Ok(value) => {
                    self.record_success(attempt);
                    return Ok(value);
                }
                Err(err) => {
                    if self.should_retry(attempt, &err) {
                        let delay = self.next_backoff(attempt);
                        self.emit_retry(attempt, delay);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    } else {
                        return Err(err);
                    }
                }
            }
        }
    }

    fn emit_retry(&self, attempt: u32, delay: std::time::Duration) {
        #[cfg(feature = "tracing")]
        tracing::debug!(pattern = %self.config.name, attempt, ?delay, "retrying");
        #[cfg(feature = "metrics")]
        metrics::counter!("revai_retry_attempts_total", "pattern" => self.config.name.clone())
            .increment(1);
        self.config.emit(events::RetryEvent::Retry {
            pattern_name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            attempt,
            delay,
        });
    }

    fn emit_non_retryable(&self, attempt: u32) {
        #[cfg(feature = "tracing")]
        tracing::debug!(pattern = %self.config.name, attempt, "non-retryable error");
        self.config.emit(events::RetryEvent::NonRetryableError {
            pattern_name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            attempt,
        });
    }

    fn emit_exhausted(&self, attempts: u32) {
        #[cfg(feature = "tracing")]
        tracing::warn!(pattern = %self.config.name, attempts, "retries exhausted");
        #[cfg(feature = "metrics")]
        metrics::counter!("revai_retry_exhausted_total", "pattern" => self.config.name.clone())
            .increment(1);
        self.config.emit(events::RetryEvent::RetriesExhausted {
            pattern_name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            attempts,
        });
    }

    fn emit_budget_exhausted(&self, attempt: u32) {
        #[cfg(feature = "tracing")]
        tracing::warn!(pattern = %self.config.name, attempt, "retry budget exhausted");
        self.config.emit(events::RetryEvent::BudgetExhausted {
            pattern_name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            attempt,
        });
    }
}

impl<E> RetryConfig<E> {
    pub(crate) fn emit(&self, event: events::RetryEvent) {
        self.event_listeners.emit(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn execute_retries_until_success() {
        let policy = RetryConfigBuilder::<String>::new()
            .max_attempts(5)
            .backoff(ExponentialBackoff::new(
                std::time::Duration::from_millis(1),
                std::time::Duration::from_millis(5),
            ))
            .build();

        let calls = AtomicU32::new(0);
        let result = policy
            .execute(|_attempt| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("transient".to_string())
                    } else {
                        Ok::<_, String>("ok")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn execute_gives_up_after_max_attempts() {
        let policy = RetryConfigBuilder::<String>::new()
            .max_attempts(2)
            .backoff(ExponentialBackoff::new(
                std::time::Duration::from_millis(1),
                std::time::Duration::from_millis(5),
            ))
            .build();

        let calls = AtomicU32::new(0);
        let result = policy
            .execute(|_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err::<(), _>("still failing".to_string()) }
            })
            .await;

        assert_eq!(result, Err("still failing".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_errors_stop_immediately() {
        let policy = RetryConfigBuilder::<String>::new()
            .max_attempts(5)
            .retry_on(|e: &String| e != "fatal")
            .build();

        let calls = AtomicU32::new(0);
        let result = policy
            .execute(|_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err::<(), _>("fatal".to_string()) }
            })
            .await;

        assert_eq!(result, Err("fatal".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn should_retry_respects_budget() {
        use budget::RetryBudgetBuilder;

        let budget = RetryBudgetBuilder::new()
            .token_bucket()
            .max_tokens(1)
            .initial_tokens(1)
            .build();

        let policy = RetryConfigBuilder::<String>::new()
            .max_attempts(10)
            .budget(budget)
            .build();

        assert!(policy.should_retry(1, &"err".to_string()));
        assert!(!policy.should_retry(2, &"err".to_string()));
    }
}
