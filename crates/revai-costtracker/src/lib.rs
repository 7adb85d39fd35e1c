//! Per-user quota enforcement and usage accounting.
//!
//! Budget checks are two-phase: [`CostTracker::check_quota`] reserves an
//! estimated cost and returns an opaque [`ReservationId`]; the caller later
//! either [`CostTracker::commit`]s the reservation with the realized cost
//! or [`CostTracker::release`]s it if the job never ran. Keying by
//! reservation rather than job id means a retried job never double-reserves.
//!
//! # Examples
//!
//! ```
//! use revai_costtracker::CostTrackerConfigBuilder;
//!
//! let tracker = CostTrackerConfigBuilder::new()
//!     .default_limit(1.0)
//!     .pricing("openai", 0.01, 0.03)
//!     .build();
//!
//! let reservation = tracker.check_quota("alice", 0.10).unwrap();
//! tracker.commit(reservation, 0.08);
//! assert_eq!(tracker.user_cost("alice"), 0.08);
//! ```

mod account;
mod config;
mod error;
mod events;
mod pricing;
mod usage;

pub use account::QuotaAccount;
pub use config::{CostTrackerConfig, CostTrackerConfigBuilder};
pub use error::CostTrackerError;
pub use events::CostTrackerEvent;
pub use pricing::{from_micros, to_micros, MicroUnits, PricingTable};
pub use usage::{UsageRecord, UsageStatus};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use uuid::Uuid;

/// Opaque handle to a quota reservation, returned by [`CostTracker::check_quota`].
pub type ReservationId = Uuid;

struct Reservation {
    user_id: String,
    amount: MicroUnits,
    committed: bool,
}

/// Per-user budget enforcement and usage history.
///
/// Cheap to clone; clones share the same account map and usage log.
#[derive(Clone)]
pub struct CostTracker {
    config: Arc<CostTrackerConfig>,
    accounts: Arc<RwLock<HashMap<String, Arc<Mutex<QuotaAccount>>>>>,
    reservations: Arc<Mutex<HashMap<ReservationId, Reservation>>>,
    usage: Arc<Mutex<Vec<UsageRecord>>>,
}

impl CostTracker {
    pub(crate) fn new(config: CostTrackerConfig) -> Self {
        Self {
            config: Arc::new(config),
            accounts: Arc::new(RwLock::new(HashMap::new())),
            reservations: Arc::new(Mutex::new(HashMap::new())),
            usage: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns a new configuration builder.
    pub fn builder() -> CostTrackerConfigBuilder {
        CostTrackerConfigBuilder::new()
    }

    fn account_for(&self, user_id: &str) -> Arc<Mutex<QuotaAccount>> {
        if let Some(account) = self.accounts.read().unwrap().get(user_id) {
            return Arc::clone(account);
        }
        let mut accounts = self.accounts.write().unwrap();
        Arc::clone(accounts.entry(user_id.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(QuotaAccount::new(
                user_id,
                self.config.default_limit,
            )))
        }))
    }

    /// Reserves `estimated_cost` against `user_id`'s remaining budget.
    ///
    /// Returns a handle to commit or release later. Rolls the account's
    /// billing period forward first if it has elapsed.
    pub fn check_quota(
        &self,
        user_id: &str,
        estimated_cost: f64,
    ) -> Result<ReservationId, CostTrackerError> {
        let amount = to_micros(estimated_cost);
        let account_arc = self.account_for(user_id);
        let mut account = account_arc.lock().unwrap();
        account.maybe_reset_period(self.config.period);

        let remaining = account.remaining();
        if amount > remaining {
            let remaining_currency = from_micros(remaining);
            drop(account);
            self.emit_quota_exceeded(user_id, remaining_currency);
            return Err(CostTrackerError::QuotaExceeded {
                remaining: remaining_currency,
            });
        }

        account.reserved += amount;
        drop(account);

        let reservation_id = Uuid::new_v4();
        self.reservations.lock().unwrap().insert(
            reservation_id,
            Reservation {
                user_id: user_id.to_string(),
                amount,
                committed: false,
            },
        );
        self.emit_quota_reserved(user_id, estimated_cost);
        Ok(reservation_id)
    }

    /// Converts a reservation into realized spend.
    ///
    /// Idempotent: a reservation that has already been committed, or that
    /// is unknown (e.g. already released), is a no-op.
    pub fn commit(&self, reservation_id: ReservationId, actual_cost: f64) {
        let user_id = {
            let mut reservations = self.reservations.lock().unwrap();
            let Some(reservation) = reservations.get_mut(&reservation_id) else {
                return;
            };
            if reservation.committed {
                return;
            }
            reservation.committed = true;
            let account_arc = self.account_for(&reservation.user_id);
            let mut account = account_arc.lock().unwrap();
            account.reserved = (account.reserved - reservation.amount).max(0);
            account.spent += to_micros(actual_cost);
            reservation.user_id.clone()
        };
        self.emit_committed(&user_id, actual_cost);
    }

    /// Cancels a reservation that was never committed.
    ///
    /// Idempotent: releasing an already-released or already-committed
    /// reservation is a no-op.
    pub fn release(&self, reservation_id: ReservationId) {
        let reservation = {
            let mut reservations = self.reservations.lock().unwrap();
            match reservations.remove(&reservation_id) {
                Some(reservation) if !reservation.committed => reservation,
                _ => return,
            }
        };
        let account_arc = self.account_for(&reservation.user_id);
        let mut account = account_arc.lock().unwrap();
        account.reserved = (account.reserved - reservation.amount).max(0);
        drop(account);
        self.emit_released(&reservation.user_id);
    }

    /// Appends a usage record to the append-only history table.
    pub fn record_usage(&self, record: UsageRecord) {
        self.usage.lock().unwrap().push(record);
    }

    /// Computes the realized cost of a call in currency units from its
    /// token counts, using this tracker's pricing table.
    pub fn cost_for(&self, provider: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        from_micros(self.config.pricing.cost_micros(provider, input_tokens, output_tokens))
    }

    /// Total realized spend for `user_id` in the current period.
    pub fn user_cost(&self, user_id: &str) -> f64 {
        from_micros(self.account_for(user_id).lock().unwrap().spent)
    }

    /// Remaining budget for `user_id`, accounting for outstanding reservations.
    pub fn remaining(&self, user_id: &str) -> f64 {
        from_micros(self.account_for(user_id).lock().unwrap().remaining())
    }

    /// Usage history for `user_id`, in insertion order.
    pub fn history(&self, user_id: &str) -> Vec<UsageRecord> {
        self.usage
            .lock()
            .unwrap()
            .iter()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Administrative override of a user's budget limit.
    pub fn set_quota(&self, user_id: &str, limit: f64) {
        self.account_for(user_id).lock().unwrap().limit = to_micros(limit);
    }

    /// Administrative reset of a user's spend for the current period.
    pub fn reset_quota(&self, user_id: &str) {
        let account_arc = self.account_for(user_id);
        let mut account = account_arc.lock().unwrap();
        account.spent = 0;
        account.period_start = std::time::SystemTime::now();
    }

    fn emit_quota_reserved(&self, user_id: &str, amount: f64) {
        #[cfg(feature = "tracing")]
        tracing::debug!(pattern = %self.config.name, user_id, amount, "quota reserved");
        #[cfg(feature = "metrics")]
        metrics::counter!("revai_costtracker_reservations_total", "pattern" => self.config.name.clone())
            .increment(1);
        self.config.event_listeners.emit(&CostTrackerEvent::QuotaReserved {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            user_id: user_id.to_string(),
            amount,
        });
    }

    fn emit_quota_exceeded(&self, user_id: &str, remaining: f64) {
        #[cfg(feature = "tracing")]
        tracing::info!(pattern = %self.config.name, user_id, remaining, "quota exceeded");
        #[cfg(feature = "metrics")]
        metrics::counter!("revai_costtracker_quota_exceeded_total", "pattern" => self.config.name.clone())
            .increment(1);
        self.config.event_listeners.emit(&CostTrackerEvent::QuotaExceeded {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            user_id: user_id.to_string(),
            remaining,
        });
    }

    fn emit_committed(&self, user_id: &str, actual_cost: f64) {
        #[cfg(feature = "tracing")]
        tracing::debug!(pattern = %self.config.name, user_id, actual_cost, "reservation committed");
        self.config.event_listeners.emit(&CostTrackerEvent::Committed {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            user_id: user_id.to_string(),
            actual_cost,
        });
    }

    fn emit_released(&self, user_id: &str) {
        #[cfg(feature = "tracing")]
        tracing::debug!(pattern = %self.config.name, user_id, "reservation released");
        self.config.event_listeners.emit(&CostTrackerEvent::Released {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            user_id: user_id.to_string(),
        });
    }
}
