use crate::events::RateLimiterEvent;
use revai_core::events::{EventListeners, FnListener};
use revai_core::Identity;

/// Configuration for a [`crate::RateLimiter`] instance.
pub struct RateLimiterConfig {
    pub(crate) capacity: f64,
    pub(crate) refill_rate: f64,
    pub(crate) event_listeners: EventListeners<RateLimiterEvent>,
    pub(crate) name: String,
}

/// Builder for [`RateLimiterConfig`].
pub struct RateLimiterConfigBuilder {
    capacity: f64,
    refill_rate: f64,
    event_listeners: EventListeners<RateLimiterEvent>,
    name: String,
}

impl Default for RateLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - capacity: 50 tokens
    /// - refill_rate: 50 tokens/second
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            capacity: 50.0,
            refill_rate: 50.0,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the bucket's maximum burst size, in tokens.
    pub fn capacity(mut self, capacity: f64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the steady-state refill rate, in tokens per second.
    pub fn refill_rate(mut self, rate: f64) -> Self {
        self.refill_rate = rate;
        self
    }

    /// Sets the name for this rate limiter instance (used in events).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when a token is granted.
    pub fn on_permit_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(&Identity, f64) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::PermitAcquired {
                identity,
                remaining,
                ..
            } = event
            {
                f(identity, *remaining);
            }
        }));
        self
    }

    /// Registers a callback invoked when a check is rejected for lack of a token.
    pub fn on_permit_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&Identity) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::PermitRejected { identity, .. } = event {
                f(identity);
            }
        }));
        self
    }

    /// Builds the rate limiter.
    pub fn build(self) -> crate::RateLimiter {
        crate::RateLimiter::new(RateLimiterConfig {
            capacity: self.capacity,
            refill_rate: self.refill_rate,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let _limiter = RateLimiterConfigBuilder::new().build();
    }

    #[test]
    fn test_builder_custom_values() {
        let _limiter = RateLimiterConfigBuilder::new()
            .capacity(100.0)
            .refill_rate(10.0)
            .name("test-limiter")
            .build();
    }

    #[test]
    fn test_event_listeners() {
        let _limiter = RateLimiterConfigBuilder::new()
            .on_permit_acquired(|_, _| {})
            .on_permit_rejected(|_| {})
            .build();
    }
}
