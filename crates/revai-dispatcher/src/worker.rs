use crate::error::ExecutionError;
use crate::events::DispatchEvent;
use crate::llm::{LLMError, LLMRequest};
use crate::queue::EnqueueOutcome;
use crate::State;
use revai_core::{Job, JobId, JobResult, JobStatus};
use revai_costtracker::{UsageRecord, UsageStatus};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::task::JoinHandle;

pub(crate) fn spawn_workers(state: Arc<State>, count: usize) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|_| {
            let state = Arc::clone(&state);
            tokio::spawn(async move { worker_loop(state).await })
        })
        .collect()
}

async fn worker_loop(state: Arc<State>) {
    while let Some(job) = state.queue.dequeue().await {
        state.in_flight.fetch_add(1, Ordering::SeqCst);
        run_once(&state, job).await;
        state.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn run_once(state: &Arc<State>, mut job: Job) {
    job.attempts += 1;
    let attempt = job.attempts;
    let job_id = job.id;
    let started_at = SystemTime::now();
    let started_instant = Instant::now();

    #[cfg(feature = "tracing")]
    tracing::debug!(
        pattern = %state.config.name,
        job_id = %job_id,
        trace_id = %job.trace_id,
        attempt,
        "job execution started"
    );

    state.emit(DispatchEvent::Started {
        pattern_name: state.config.name.clone(),
        timestamp: Instant::now(),
        job_id,
        attempt,
    });

    if let Err(err) = state.breaker.try_acquire() {
        handle_breaker_open(state, job, err.into());
        return;
    }

    let request = LLMRequest {
        provider: state.provider.clone(),
        payload: job.payload.clone(),
    };

    match state.llm.call(request).await {
        Ok(response) => {
            state.breaker.record_success();
            let cost = state
                .cost_tracker
                .cost_for(&state.provider, response.input_tokens, response.output_tokens);

            if let Some(reservation) = state.take_reservation(job_id) {
                state.cost_tracker.commit(reservation, cost);
            }
            state.cost_tracker.record_usage(UsageRecord {
                user_id: job.user_id.clone(),
                job_id,
                provider: state.provider.clone(),
                input_tokens: response.input_tokens,
                output_tokens: response.output_tokens,
                cost,
                status: UsageStatus::Done,
                started_at,
                completed_at: SystemTime::now(),
                retry_count: attempt - 1,
                breaker_state: Some(format!("{:?}", state.breaker.state())),
            });

            state.queue.set_status(job_id, JobStatus::Done, None);
            state.queue.record_result(JobResult {
                job_id,
                ok: true,
                output: Some(response.output),
                err: None,
                actual_cost: cost,
                completed_at: SystemTime::now(),
                attempts: attempt,
                wall_time: started_instant.elapsed(),
            });
            emit_completed(state, job_id, true);
        }
        Err(err) => {
            state.breaker.record_failure();
            handle_call_error(state, job, err);
        }
    }
}

fn handle_call_error(state: &Arc<State>, job: Job, err: LLMError) {
    match err {
        LLMError::Cancelled => fail_job(state, job, ExecutionError::Cancelled),
        LLMError::Permanent(message) => {
            fail_job(state, job, ExecutionError::Permanent { message })
        }
        LLMError::Transient(message) => {
            let attempt = job.attempts;
            if state
                .retry
                .should_retry(attempt, &LLMError::Transient(message.clone()))
            {
                schedule_retry(state, job);
            } else {
                fail_job(
                    state,
                    job,
                    ExecutionError::Transient {
                        attempts: attempt,
                        message,
                    },
                );
            }
        }
    }
}

/// Spec requires retries to re-enter at the tail with increased attempts,
/// never to preserve their position. Sleeping in a spawned task (instead of
/// blocking the worker that just ran the attempt) frees that worker to pick
/// up other queued jobs immediately.
fn schedule_retry(state: &Arc<State>, job: Job) {
    let delay = state.retry.next_backoff(job.attempts);
    let state = Arc::clone(state);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        re_enqueue_or_fail(&state, job);
    });
}

/// Spec allows at most one re-enqueue per job after a circuit-breaker
/// rejection, timed to the breaker's own reset window.
fn handle_breaker_open(state: &Arc<State>, job: Job, err: ExecutionError) {
    if !state.mark_breaker_retried(job.id) {
        fail_job(state, job, err);
        return;
    }

    let delay = state.breaker.reset_timeout();
    let state = Arc::clone(state);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        re_enqueue_or_fail(&state, job);
    });
}

fn re_enqueue_or_fail(state: &Arc<State>, job: Job) {
    match state.queue.re_enqueue(job.clone()) {
        EnqueueOutcome::Enqueued => {}
        EnqueueOutcome::Closed | EnqueueOutcome::Full | EnqueueOutcome::Duplicate(_) => {
            fail_job(state, job, ExecutionError::Shutdown);
        }
    }
}

fn fail_job(state: &Arc<State>, job: Job, err: ExecutionError) {
    if let Some(reservation) = state.take_reservation(job.id) {
        state.cost_tracker.release(reservation);
    }

    let message = err.to_string();
    state
        .queue
        .set_status(job.id, JobStatus::Failed, Some(message.clone()));
    state.queue.record_result(JobResult {
        job_id: job.id,
        ok: false,
        output: None,
        err: Some(message),
        actual_cost: 0.0,
        completed_at: SystemTime::now(),
        attempts: job.attempts,
        wall_time: Duration::ZERO,
    });
    emit_completed(state, job.id, false);
}

fn emit_completed(state: &Arc<State>, job_id: JobId, ok: bool) {
    #[cfg(feature = "tracing")]
    if ok {
        tracing::info!(pattern = %state.config.name, job_id = %job_id, "job completed");
    } else {
        tracing::warn!(pattern = %state.config.name, job_id = %job_id, "job failed");
    }
    #[cfg(feature = "metrics")]
    metrics::counter!(
        "dispatcher_completed_total",
        "pattern" => state.config.name.clone(),
        "ok" => ok.to_string()
    )
    .increment(1);

    state.emit(DispatchEvent::Completed {
        pattern_name: state.config.name.clone(),
        timestamp: Instant::now(),
        job_id,
        ok,
    });
}
