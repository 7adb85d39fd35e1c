use revai_core::CoordinatorEvent;
use std::time::Instant;

/// Events emitted by the cost tracker.
#[derive(Debug, Clone)]
pub enum CostTrackerEvent {
    /// A reservation was made against a user's quota.
    QuotaReserved {
        pattern_name: String,
        timestamp: Instant,
        user_id: String,
        amount: f64,
    },
    /// A reservation request was rejected for exceeding the remaining quota.
    QuotaExceeded {
        pattern_name: String,
        timestamp: Instant,
        user_id: String,
        remaining: f64,
    },
    /// A reservation was committed to realized spend.
    Committed {
        pattern_name: String,
        timestamp: Instant,
        user_id: String,
        actual_cost: f64,
    },
    /// A reservation was released without being committed.
    Released {
        pattern_name: String,
        timestamp: Instant,
        user_id: String,
    },
}

impl CoordinatorEvent for CostTrackerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CostTrackerEvent::QuotaReserved { .. } => "quota_reserved",
            CostTrackerEvent::QuotaExceeded { .. } => "quota_exceeded",
            CostTrackerEvent::Committed { .. } => "committed",
            CostTrackerEvent::Released { .. } => "released",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CostTrackerEvent::QuotaReserved { timestamp, .. }
            | CostTrackerEvent::QuotaExceeded { timestamp, .. }
            | CostTrackerEvent::Committed { timestamp, .. }
            | CostTrackerEvent::Released { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CostTrackerEvent::QuotaReserved { pattern_name, .. }
            | CostTrackerEvent::QuotaExceeded { pattern_name, .. }
            | CostTrackerEvent::Committed { pattern_name, .. }
            | CostTrackerEvent::Released { pattern_name, .. } => pattern_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types() {
        let now = Instant::now();
        let reserved = CostTrackerEvent::QuotaReserved {
            pattern_name: "test".to_string(),
            timestamp: now,
            user_id: "alice".to_string(),
            amount: 0.1,
        };
        assert_eq!(reserved.event_type(), "quota_reserved");
        assert_eq!(reserved.pattern_name(), "test");
    }
}
