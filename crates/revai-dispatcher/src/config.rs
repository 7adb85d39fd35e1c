use crate::events::DispatchEvent;
use crate::llm::LLMError;
use revai_circuitbreaker::CircuitBreakerConfigBuilder;
use revai_core::{EventListeners, FnListener};
use revai_costtracker::CostTrackerConfigBuilder;
use revai_ratelimiter::RateLimiterConfigBuilder;
use revai_retry::RetryConfigBuilder;

/// Dispatcher-wide settings that don't belong to any single sub-component:
/// its name for observability and the listeners for [`DispatchEvent`].
pub struct CoordinatorConfig {
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<DispatchEvent>,
}

/// A configuration invariant was violated at construction time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("worker pool size must be positive, got {0}")]
    NonPositiveWorkerCount(usize),
    #[error("queue capacity must be positive, got {0}")]
    NonPositiveQueueCapacity(usize),
    #[error("no pricing entry for provider {0:?}")]
    MissingPricing(String),
}

/// Process-wide configuration for a [`crate::Dispatcher`], composing every
/// component's own builder.
///
/// Immutable after [`Self::build`]; there is no runtime reconfiguration.
pub struct CoordinatorConfigBuilder {
    pub(crate) rate_limiter: RateLimiterConfigBuilder,
    pub(crate) circuit_breaker: CircuitBreakerConfigBuilder,
    pub(crate) retry: RetryConfigBuilder<LLMError>,
    pub(crate) cost_tracker: CostTrackerConfigBuilder,
    pub(crate) queue_capacity: usize,
    pub(crate) worker_count: usize,
    pub(crate) provider: String,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<DispatchEvent>,
}

impl CoordinatorConfigBuilder {
    /// Creates a new builder.
    ///
    /// Defaults: queue capacity 1000, 4 workers, provider `"local"` (free),
    /// retry predicate only retries [`LLMError::Transient`].
    pub fn new() -> Self {
        Self {
            rate_limiter: RateLimiterConfigBuilder::new(),
            circuit_breaker: CircuitBreakerConfigBuilder::new(),
            retry: RetryConfigBuilder::new().retry_on(|e: &LLMError| e.is_transient()),
            cost_tracker: CostTrackerConfigBuilder::new(),
            queue_capacity: 1000,
            worker_count: 4,
            provider: "local".to_string(),
            name: String::from("<unnamed>"),
            event_listeners: EventListeners::new(),
        }
    }

    /// Configures the rate limiter via its own builder.
    pub fn rate_limiter(
        mut self,
        f: impl FnOnce(RateLimiterConfigBuilder) -> RateLimiterConfigBuilder,
    ) -> Self {
        self.rate_limiter = f(self.rate_limiter);
        self
    }

    /// Configures the circuit breaker via its own builder.
    pub fn circuit_breaker(
        mut self,
        f: impl FnOnce(CircuitBreakerConfigBuilder) -> CircuitBreakerConfigBuilder,
    ) -> Self {
        self.circuit_breaker = f(self.circuit_breaker);
        self
    }

    /// Configures the retry policy via its own builder.
    ///
    /// The default retry predicate (retry only [`LLMError::Transient`]) is
    /// preserved unless overridden.
    pub fn retry(
        mut self,
        f: impl FnOnce(RetryConfigBuilder<LLMError>) -> RetryConfigBuilder<LLMError>,
    ) -> Self {
        self.retry = f(self.retry);
        self
    }

    /// Configures the cost tracker via its own builder.
    pub fn cost_tracker(
        mut self,
        f: impl FnOnce(CostTrackerConfigBuilder) -> CostTrackerConfigBuilder,
    ) -> Self {
        self.cost_tracker = f(self.cost_tracker);
        self
    }

    /// Sets the hard bound on queue backlog (`queue.maxDepth`).
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets the worker pool size (`queue.workers`).
    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Sets the LLM provider this dispatcher calls, used both to route
    /// calls and to look up pricing.
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Gives this dispatcher a human-readable name for observability.
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Registers a callback invoked whenever a job is admitted and enqueued.
    pub fn on_admitted<F>(mut self, f: F) -> Self
    where
        F: Fn(revai_core::JobId, usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let DispatchEvent::Admitted {
                job_id, queue_depth, ..
            } = event
            {
                f(*job_id, *queue_depth);
            }
        }));
        self
    }

    /// Registers a callback invoked whenever submission is rejected before
    /// the job reaches the queue.
    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(revai_core::JobId, &str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let DispatchEvent::Rejected { job_id, reason, .. } = event {
                f(*job_id, reason);
            }
        }));
        self
    }

    /// Registers a callback invoked whenever a job reaches a terminal state.
    pub fn on_completed<F>(mut self, f: F) -> Self
    where
        F: Fn(revai_core::JobId, bool) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let DispatchEvent::Completed { job_id, ok, .. } = event {
                f(*job_id, *ok);
            }
        }));
        self
    }

    /// Surfaces the internal-invariant failures of spec §7 as an error
    /// instead of a panic deep in a worker.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::NonPositiveWorkerCount(self.worker_count));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::NonPositiveQueueCapacity(self.queue_capacity));
        }
        if !self.cost_tracker.has_provider(&self.provider) {
            return Err(ConfigError::MissingPricing(self.provider.clone()));
        }
        Ok(())
    }

    /// Validates the configuration and builds the dispatcher, spawning its
    /// worker pool.
    pub fn build(
        self,
        llm: std::sync::Arc<dyn crate::llm::LLMCaller>,
    ) -> Result<crate::Dispatcher, ConfigError> {
        self.validate()?;
        let coordinator = CoordinatorConfig {
            name: self.name,
            event_listeners: self.event_listeners,
        };
        Ok(crate::Dispatcher::new(
            coordinator,
            self.queue_capacity,
            self.worker_count,
            self.provider,
            self.rate_limiter.build(),
            self.circuit_breaker.build(),
            self.retry.build(),
            self.cost_tracker.build(),
            llm,
        ))
    }
}

impl Default for CoordinatorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_with_local_provider() {
        assert!(CoordinatorConfigBuilder::new().validate().is_ok());
    }

    #[test]
    fn rejects_zero_workers() {
        let err = CoordinatorConfigBuilder::new()
            .worker_count(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::NonPositiveWorkerCount(0)));
    }

    #[test]
    fn rejects_unpriced_provider() {
        let err = CoordinatorConfigBuilder::new()
            .provider("openai")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingPricing(_)));
    }

    #[test]
    fn accepts_provider_once_priced() {
        let result = CoordinatorConfigBuilder::new()
            .provider("openai")
            .cost_tracker(|c| c.pricing("openai", 0.01, 0.03))
            .validate();
        assert!(result.is_ok());
    }
}
