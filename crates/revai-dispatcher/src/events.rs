use revai_core::{CoordinatorEvent, JobId};
use std::time::Instant;

/// Dispatcher-level events: admission decisions, queue depth, and job
/// lifecycle transitions not already covered by a component's own events.
#[derive(Debug, Clone)]
pub enum DispatchEvent {
    /// A job was admitted and enqueued.
    Admitted {
        pattern_name: String,
        timestamp: Instant,
        job_id: JobId,
        queue_depth: usize,
    },
    /// A job was rejected before reaching the queue.
    Rejected {
        pattern_name: String,
        timestamp: Instant,
        job_id: JobId,
        reason: String,
    },
    /// A worker began executing a job.
    Started {
        pattern_name: String,
        timestamp: Instant,
        job_id: JobId,
        attempt: u32,
    },
    /// A job reached a terminal state.
    Completed {
        pattern_name: String,
        timestamp: Instant,
        job_id: JobId,
        ok: bool,
    },
}

impl CoordinatorEvent for DispatchEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DispatchEvent::Admitted { .. } => "admitted",
            DispatchEvent::Rejected { .. } => "rejected",
            DispatchEvent::Started { .. } => "started",
            DispatchEvent::Completed { .. } => "completed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            DispatchEvent::Admitted { timestamp, .. }
            | DispatchEvent::Rejected { timestamp, .. }
            | DispatchEvent::Started { timestamp, .. }
            | DispatchEvent::Completed { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            DispatchEvent::Admitted { pattern_name, .. }
            | DispatchEvent::Rejected { pattern_name, .. }
            | DispatchEvent::Started { pattern_name, .. }
            | DispatchEvent::Completed { pattern_name, .. } => pattern_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types() {
        let event = DispatchEvent::Admitted {
            pattern_name: "dispatcher".to_string(),
            timestamp: Instant::now(),
            job_id: JobId::new_v4(),
            queue_depth: 3,
        };
        assert_eq!(event.event_type(), "admitted");
    }
}
