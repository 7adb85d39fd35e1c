//! AI request coordination core.
//!
//! This crate is a thin façade over the six crates that make up the
//! coordination pipeline: [`revai_core`] for shared domain types,
//! [`revai_ratelimiter`] for per-identity admission control,
//! [`revai_costtracker`] for per-user budget enforcement,
//! [`revai_circuitbreaker`] and [`revai_retry`] for resilience around the
//! outbound LLM call, and [`revai_dispatcher`] tying them together into a
//! FIFO queue and worker pool.
//!
//! Most applications only need [`Dispatcher`] and [`CoordinatorConfigBuilder`];
//! the sub-component crates are public for callers that want to use, say,
//! the rate limiter standalone in front of a different pipeline.

pub use revai_circuitbreaker::{CircuitBreaker, CircuitBreakerConfigBuilder, CircuitState};
pub use revai_core::{CoordinatorError, Identity, Job, JobId, JobKind, JobResult, JobStatus};
pub use revai_costtracker::{CostTracker, CostTrackerConfigBuilder, ReservationId};
pub use revai_dispatcher::{
    llm, ConfigError, CoordinatorConfigBuilder, DispatchError, Dispatcher, ExecutionError,
};
pub use revai_ratelimiter::{RateLimiter, RateLimiterConfigBuilder};
pub use revai_retry::{RetryConfigBuilder, RetryPolicy};

#[cfg(test)]
mod tests {
    use super::*;
    use llm::{LLMCaller, LLMError, LLMRequest, LLMResponse};
    use std::sync::Arc;
    use std::time::Duration;

    struct Echo;

    #[async_trait::async_trait]
    impl LLMCaller for Echo {
        async fn call(&self, request: LLMRequest) -> Result<LLMResponse, LLMError> {
            Ok(LLMResponse {
                output: request.payload,
                input_tokens: 10,
                output_tokens: 5,
            })
        }
    }

    #[tokio::test]
    async fn end_to_end_job_completes() {
        let dispatcher = CoordinatorConfigBuilder::new()
            .build(Arc::new(Echo))
            .unwrap();

        let job = Job::new("alice", "10.0.0.1", JobKind::new("scan"), vec![1], 0.0);
        let job_id = dispatcher.submit(job).unwrap();

        for _ in 0..200 {
            if let Some(result) = dispatcher.result(job_id) {
                assert!(result.ok);
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job never completed");
    }
}
