use revai_core::CoordinatorError;

/// Errors produced by [`crate::CostTracker`].
#[derive(Debug, thiserror::Error)]
pub enum CostTrackerError {
    /// Reserving `estimated_cost` would exceed the user's remaining budget.
    #[error("quota exceeded, {remaining} remaining")]
    QuotaExceeded { remaining: f64 },
}

impl CostTrackerError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, CostTrackerError::QuotaExceeded { .. })
    }
}

impl<E> From<CostTrackerError> for CoordinatorError<E> {
    fn from(err: CostTrackerError) -> Self {
        match err {
            CostTrackerError::QuotaExceeded { remaining } => {
                CoordinatorError::QuotaExceeded { remaining }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_coordinator_error() {
        let err: CoordinatorError<std::convert::Infallible> =
            CostTrackerError::QuotaExceeded { remaining: 0.25 }.into();
        assert!(err.is_quota_exceeded());
    }
}
