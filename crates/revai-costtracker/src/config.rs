use crate::events::CostTrackerEvent;
use crate::pricing::{to_micros, PricingTable};
use revai_core::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for a [`crate::CostTracker`] instance.
pub struct CostTrackerConfig {
    pub(crate) default_limit: i64,
    pub(crate) period: Duration,
    pub(crate) pricing: PricingTable,
    pub(crate) event_listeners: EventListeners<CostTrackerEvent>,
    pub(crate) name: String,
}

/// Builder for [`CostTrackerConfig`].
pub struct CostTrackerConfigBuilder {
    default_limit: f64,
    period: Duration,
    pricing: PricingTable,
    event_listeners: EventListeners<CostTrackerEvent>,
    name: String,
}

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

impl CostTrackerConfigBuilder {
    /// Creates a new builder.
    ///
    /// Defaults: $10.00 per-user monthly limit, 30-day period, only the
    /// `local` provider priced (at zero).
    pub fn new() -> Self {
        Self {
            default_limit: 10.0,
            period: Duration::from_secs(30 * 24 * 60 * 60),
            pricing: PricingTable::new(),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the per-user budget applied when an account is first seen.
    pub fn default_limit(mut self, limit: f64) -> Self {
        self.default_limit = limit;
        self
    }

    /// Sets the billing period length in days.
    pub fn period_days(mut self, days: u64) -> Self {
        self.period = DAY * days as u32;
        self
    }

    /// Registers per-1000-token pricing for a provider.
    pub fn pricing(
        mut self,
        provider: impl Into<String>,
        input_rate_per_1k: f64,
        output_rate_per_1k: f64,
    ) -> Self {
        self.pricing
            .set_rate(provider, input_rate_per_1k, output_rate_per_1k);
        self
    }

    /// Whether `provider` currently has a pricing entry.
    ///
    /// Lets a composing builder (e.g. the dispatcher's `CoordinatorConfig`)
    /// validate provider coverage before any job reaches this tracker.
    pub fn has_provider(&self, provider: &str) -> bool {
        self.pricing.has_provider(provider)
    }

    /// Gives this tracker a human-readable name for observability.
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Registers a callback invoked whenever a reservation is rejected.
    pub fn on_quota_exceeded<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, f64) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CostTrackerEvent::QuotaExceeded {
                user_id, remaining, ..
            } = event
            {
                f(user_id, *remaining);
            }
        }));
        self
    }

    /// Builds the cost tracker.
    pub fn build(self) -> crate::CostTracker {
        crate::CostTracker::new(CostTrackerConfig {
            default_limit: to_micros(self.default_limit),
            period: self.period,
            pricing: self.pricing,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}

impl Default for CostTrackerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let _tracker = CostTrackerConfigBuilder::new().build();
    }

    #[test]
    fn builder_custom_values() {
        let _tracker = CostTrackerConfigBuilder::new()
            .default_limit(25.0)
            .period_days(7)
            .pricing("openai", 0.01, 0.03)
            .name("billing")
            .build();
    }
}
