use revai_core::JobId;
use std::time::SystemTime;

/// Immutable, append-only record of one terminal job's accounting.
#[derive(Debug, Clone)]
pub struct UsageRecord {
    pub user_id: String,
    pub job_id: JobId,
    pub provider: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Realized cost in currency units, as committed to the account.
    pub cost: f64,
    pub status: UsageStatus,
    pub started_at: SystemTime,
    pub completed_at: SystemTime,
    /// Number of attempts actually made before this terminal outcome.
    pub retry_count: u32,
    /// Circuit breaker state observed at call time, for diagnostics.
    pub breaker_state: Option<String>,
}

/// Outcome recorded alongside a [`UsageRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageStatus {
    Done,
    Failed,
}
