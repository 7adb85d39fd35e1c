use crate::backoff::ExponentialBackoff;
use crate::budget::RetryBudget;
use crate::events::RetryEvent;
use revai_core::{EventListeners, FnListener};
use std::sync::Arc;
use std::time::Duration;

pub(crate) type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Configuration for a [`crate::RetryPolicy<E>`] instance.
pub struct RetryConfig<E> {
    pub(crate) max_attempts: u32,
    pub(crate) backoff: ExponentialBackoff,
    pub(crate) retry_predicate: RetryPredicate<E>,
    pub(crate) budget: Option<Arc<dyn RetryBudget>>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder<E> {
    max_attempts: u32,
    backoff: ExponentialBackoff,
    retry_predicate: RetryPredicate<E>,
    budget: Option<Arc<dyn RetryBudget>>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl<E> RetryConfigBuilder<E> {
    /// Creates a new builder.
    ///
    /// Defaults: 3 attempts, 100ms initial / 10s max backoff with 20%
    /// jitter, every error is retryable, no retry budget.
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            backoff: ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(10)),
            retry_predicate: Arc::new(|_| true),
            budget: None,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the maximum number of attempts, including the first.
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Sets the backoff curve used between attempts.
    pub fn backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the predicate deciding which errors are retryable.
    ///
    /// Errors for which this returns `false` are surfaced immediately as
    /// [`RetryEvent::NonRetryableError`].
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Arc::new(predicate);
        self
    }

    /// Attaches a shared retry budget to bound total retry volume.
    pub fn budget(mut self, budget: Arc<dyn RetryBudget>) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Gives this policy a human-readable name for observability.
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Registers a callback invoked before each retry attempt.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback invoked when an operation finally succeeds.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked when retries are exhausted.
    pub fn on_retries_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::RetriesExhausted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Builds the retry policy.
    pub fn build(self) -> crate::RetryPolicy<E> {
        crate::RetryPolicy::new(RetryConfig {
            max_attempts: self.max_attempts,
            backoff: self.backoff,
            retry_predicate: self.retry_predicate,
            budget: self.budget,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}

impl<E> Default for RetryConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let _policy: crate::RetryPolicy<()> = RetryConfigBuilder::new().build();
    }

    #[test]
    fn builder_custom_values() {
        let _policy: crate::RetryPolicy<String> = RetryConfigBuilder::new()
            .max_attempts(5)
            .retry_on(|e: &String| e != "fatal")
            .name("llm-retry")
            .build();
    }
}
