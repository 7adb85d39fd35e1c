//! FIFO admission and dispatch for AI request coordination.
//!
//! [`Dispatcher`] ties the other crates together into the pipeline a
//! request actually travels: dedup, [`revai_ratelimiter::RateLimiter`],
//! [`revai_costtracker::CostTracker`] reservation, a bounded FIFO queue, and
//! a worker pool that calls out through [`revai_circuitbreaker::CircuitBreaker`]
//! and [`revai_retry::RetryPolicy`].
//!
//! # Examples
//!
//! ```
//! use revai_dispatcher::CoordinatorConfigBuilder;
//! use revai_dispatcher::llm::{LLMCaller, LLMRequest, LLMResponse, LLMError};
//! use revai_core::JobKind;
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! #[async_trait::async_trait]
//! impl LLMCaller for Echo {
//!     async fn call(&self, request: LLMRequest) -> Result<LLMResponse, LLMError> {
//!         Ok(LLMResponse { output: request.payload, input_tokens: 10, output_tokens: 5 })
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let dispatcher = CoordinatorConfigBuilder::new()
//!     .build(Arc::new(Echo))
//!     .unwrap();
//!
//! let job = revai_core::Job::new("alice", "10.0.0.1", JobKind::new("scan"), vec![], 0.0);
//! let job_id = dispatcher.submit(job).unwrap();
//!
//! // workers run on the tokio runtime; wait for the result to land.
//! loop {
//!     if let Some(result) = dispatcher.result(job_id) {
//!         assert!(result.ok);
//!         break;
//!     }
//!     tokio::time::sleep(std::time::Duration::from_millis(5)).await;
//! }
//! # }
//! ```

mod config;
mod error;
mod events;
pub mod llm;
mod queue;
mod worker;

pub use config::{ConfigError, CoordinatorConfig, CoordinatorConfigBuilder};
pub use error::{DispatchError, ExecutionError};
pub use events::DispatchEvent;

use llm::{LLMCaller, LLMError};
use queue::{EnqueueOutcome, Queue};
use revai_circuitbreaker::CircuitBreaker;
use revai_core::{Identity, Job, JobId, JobResult, JobStatus};
use revai_costtracker::{CostTracker, ReservationId};
use revai_ratelimiter::RateLimiter;
use revai_retry::RetryPolicy;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

pub(crate) struct State {
    pub(crate) config: Arc<CoordinatorConfig>,
    pub(crate) queue: Queue,
    pub(crate) rate_limiter: RateLimiter,
    pub(crate) breaker: CircuitBreaker,
    pub(crate) retry: RetryPolicy<LLMError>,
    pub(crate) cost_tracker: CostTracker,
    pub(crate) llm: Arc<dyn LLMCaller>,
    pub(crate) provider: String,
    pub(crate) in_flight: AtomicUsize,
    reservations: Mutex<HashMap<JobId, ReservationId>>,
    breaker_retried: Mutex<HashSet<JobId>>,
}

impl State {
    pub(crate) fn emit(&self, event: DispatchEvent) {
        self.config.event_listeners.emit(&event);
    }

    pub(crate) fn store_reservation(&self, job_id: JobId, reservation: ReservationId) {
        self.reservations.lock().unwrap().insert(job_id, reservation);
    }

    pub(crate) fn take_reservation(&self, job_id: JobId) -> Option<ReservationId> {
        self.reservations.lock().unwrap().remove(&job_id)
    }

    /// Marks `job_id` as having used its one post-open-breaker re-enqueue.
    /// Returns `true` the first time (caller may schedule the retry),
    /// `false` if it was already used.
    pub(crate) fn mark_breaker_retried(&self, job_id: JobId) -> bool {
        self.breaker_retried.lock().unwrap().insert(job_id)
    }
}

/// Admits, queues, and dispatches jobs through the coordination pipeline.
///
/// Cheap to clone; clones share the same queue, worker pool, and
/// sub-component state.
#[derive(Clone)]
pub struct Dispatcher {
    state: Arc<State>,
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: CoordinatorConfig,
        queue_capacity: usize,
        worker_count: usize,
        provider: String,
        rate_limiter: RateLimiter,
        breaker: CircuitBreaker,
        retry: RetryPolicy<LLMError>,
        cost_tracker: CostTracker,
        llm: Arc<dyn LLMCaller>,
    ) -> Self {
        let state = Arc::new(State {
            config: Arc::new(config),
            queue: Queue::new(queue_capacity),
            rate_limiter,
            breaker,
            retry,
            cost_tracker,
            llm,
            provider,
            in_flight: AtomicUsize::new(0),
            reservations: Mutex::new(HashMap::new()),
            breaker_retried: Mutex::new(HashSet::new()),
        });
        let workers = worker::spawn_workers(Arc::clone(&state), worker_count);
        Self {
            state,
            workers: Arc::new(Mutex::new(workers)),
        }
    }

    /// Returns a new configuration builder.
    pub fn builder() -> CoordinatorConfigBuilder {
        CoordinatorConfigBuilder::new()
    }

    /// Admits a job: checks for an in-flight duplicate, the caller's rate
    /// limit, and quota, in that order, then enqueues it.
    ///
    /// A rejection after the rate limit check (quota exceeded, queue full,
    /// a race against a concurrent duplicate, or shutdown) rolls back the
    /// rate-limit token and any quota reservation already taken, so the net
    /// effect is "nothing consumed on a rejected submission."
    pub fn submit(&self, job: Job) -> Result<JobId, DispatchError> {
        assert!(
            job.estimated_cost >= 0.0,
            "estimated_cost must be non-negative, got {}",
            job.estimated_cost
        );

        let job_id = job.id;

        if let Some(existing) = self.state.queue.active_duplicate(job_id) {
            self.reject(job_id, "duplicate");
            return Err(DispatchError::Duplicate {
                existing_job_id: existing,
            });
        }

        let identity = job.identity();
        if let Err(err) = self.state.rate_limiter.check(&identity) {
            self.reject(job_id, "rate_limited");
            return Err(err.into());
        }

        let reservation = match self
            .state
            .cost_tracker
            .check_quota(&job.user_id, job.estimated_cost)
        {
            Ok(reservation) => reservation,
            Err(err) => {
                self.state.rate_limiter.refund(&identity);
                self.reject(job_id, "quota_exceeded");
                return Err(err.into());
            }
        };

        match self.state.queue.enqueue(job) {
            EnqueueOutcome::Enqueued => {
                self.state.store_reservation(job_id, reservation);
                let queue_depth = self.state.queue.size();

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    pattern = %self.state.config.name,
                    job_id = %job_id,
                    queue_depth,
                    "job admitted"
                );
                #[cfg(feature = "metrics")]
                metrics::counter!(
                    "dispatcher_admitted_total",
                    "pattern" => self.state.config.name.clone()
                )
                .increment(1);

                self.state.emit(DispatchEvent::Admitted {
                    pattern_name: self.state.config.name.clone(),
                    timestamp: Instant::now(),
                    job_id,
                    queue_depth,
                });
                Ok(job_id)
            }
            EnqueueOutcome::Full => {
                self.rollback(&identity, reservation, job_id, "queue_full");
                Err(DispatchError::QueueFull {
                    capacity: self.state.queue.capacity(),
                })
            }
            EnqueueOutcome::Duplicate(existing) => {
                self.rollback(&identity, reservation, job_id, "duplicate");
                Err(DispatchError::Duplicate {
                    existing_job_id: existing,
                })
            }
            EnqueueOutcome::Closed => {
                self.rollback(&identity, reservation, job_id, "shutting_down");
                Err(DispatchError::InvalidRequest {
                    reason: "dispatcher is shutting down".to_string(),
                })
            }
        }
    }

    fn rollback(&self, identity: &Identity, reservation: ReservationId, job_id: JobId, reason: &str) {
        self.state.rate_limiter.refund(identity);
        self.state.cost_tracker.release(reservation);
        self.reject(job_id, reason);
    }

    fn reject(&self, job_id: JobId, reason: &str) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            pattern = %self.state.config.name,
            job_id = %job_id,
            reason,
            "job rejected"
        );
        #[cfg(feature = "metrics")]
        metrics::counter!(
            "dispatcher_rejected_total",
            "pattern" => self.state.config.name.clone(),
            "reason" => reason.to_string()
        )
        .increment(1);

        self.state.emit(DispatchEvent::Rejected {
            pattern_name: self.state.config.name.clone(),
            timestamp: Instant::now(),
            job_id,
            reason: reason.to_string(),
        });
    }

    /// Current lifecycle status of a submitted job, or `None` if unknown.
    pub fn status(&self, job_id: JobId) -> Option<JobStatus> {
        self.state.queue.status(job_id)
    }

    /// The terminal result of a job, once it has one.
    pub fn result(&self, job_id: JobId) -> Option<JobResult> {
        self.state.queue.result(job_id)
    }

    /// Current queue depth (jobs admitted but not yet picked up by a worker).
    pub fn size(&self) -> usize {
        self.state.queue.size()
    }

    /// Stops accepting new submissions and waits up to `deadline` for the
    /// queue to drain and all in-flight work to finish.
    ///
    /// Jobs still queued or in flight when `deadline` elapses are aborted
    /// and recorded as failed with a shutdown error.
    pub async fn shutdown(&self, deadline: Duration) {
        self.state.queue.close();

        let drained = tokio::time::timeout(deadline, self.wait_for_drain()).await;

        if drained.is_err() {
            for handle in self.workers.lock().unwrap().drain(..) {
                handle.abort();
            }
            for job in self.state.queue.drain_remaining().await {
                if let Some(reservation) = self.state.take_reservation(job.id) {
                    self.state.cost_tracker.release(reservation);
                }
                let message = ExecutionError::Shutdown.to_string();
                self.state
                    .queue
                    .set_status(job.id, JobStatus::Failed, Some(message.clone()));
                self.state.queue.record_result(JobResult {
                    job_id: job.id,
                    ok: false,
                    output: None,
                    err: Some(message),
                    actual_cost: 0.0,
                    completed_at: std::time::SystemTime::now(),
                    attempts: job.attempts,
                    wall_time: Duration::ZERO,
                });
            }
        }
    }

    async fn wait_for_drain(&self) {
        loop {
            if self.state.queue.size() == 0 && self.state.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
