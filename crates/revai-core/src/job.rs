//! Shared domain types for a single AI code-review request as it moves
//! through admission, dispatch, and execution.

use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Unique identifier for a [`Job`].
pub type JobId = Uuid;

/// The caller identity an admission decision is keyed on.
///
/// Authenticated requests are keyed by `User`; everything else falls back to
/// the client's IP address. The two identity spaces never share buckets or
/// quota accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    User(String),
    Ip(String),
}

/// Opaque job kind. The five reading modes (preview/skim/scan/detailed/
/// critical) are treated as labels whose only relevant property to this
/// core is the cost estimate carried alongside them in [`Job`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKind(pub String);

impl JobKind {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }
}

/// One unit of analysis work traversing the pipeline.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub user_id: String,
    pub ip: String,
    pub kind: JobKind,
    pub payload: Vec<u8>,
    /// Estimated cost in currency units, reserved against quota at admission.
    pub estimated_cost: f64,
    pub enqueued_at: SystemTime,
    pub attempts: u32,
    pub status: JobStatus,
    /// Summary of the most recent execution failure, cleared on success.
    pub last_error: Option<String>,
    /// Correlation id threaded through structured logging spans for this
    /// job's whole lifecycle, independent of `id` so a job can be re-created
    /// under the same trace if a caller ever needs to resubmit it.
    pub trace_id: Uuid,
}

impl Job {
    pub fn new(
        user_id: impl Into<String>,
        ip: impl Into<String>,
        kind: JobKind,
        payload: Vec<u8>,
        estimated_cost: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            ip: ip.into(),
            kind,
            payload,
            estimated_cost,
            enqueued_at: SystemTime::now(),
            attempts: 0,
            status: JobStatus::Queued,
            last_error: None,
            trace_id: Uuid::new_v4(),
        }
    }

    /// The identity an admission decision is keyed on: authenticated
    /// requests use `user_id`, anonymous ones fall back to `ip`.
    pub fn identity(&self) -> Identity {
        if self.user_id.is_empty() {
            Identity::Ip(self.ip.clone())
        } else {
            Identity::User(self.user_id.clone())
        }
    }
}

/// A job's position in its (monotonic, except for retry re-enqueue) state
/// machine. `Queued -> Running -> (Queued on retry) -> Running -> terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
    Rejected,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed | JobStatus::Rejected)
    }
}

/// Outcome of a terminal job, produced exactly once and immutable thereafter.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub job_id: JobId,
    pub ok: bool,
    pub output: Option<Vec<u8>>,
    pub err: Option<String>,
    pub actual_cost: f64,
    pub completed_at: SystemTime,
    pub attempts: u32,
    pub wall_time: Duration,
}
