use rand::Rng;
use std::time::Duration;

/// Exponential backoff with full jitter around the exponential curve.
///
/// `base = min(max_delay, initial_delay * multiplier^(attempt - 1))`
/// `delay = base * (1 + U(-jitter_fraction, +jitter_fraction))`
///
/// `attempt` is 1-based: the delay before the first retry uses `attempt = 1`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter_fraction: f64,
}

impl ExponentialBackoff {
    pub fn new(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier: 2.0,
            jitter_fraction: 0.2,
        }
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn jitter_fraction(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction;
        self
    }

    /// Computes the delay before retry number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = (attempt.max(1) - 1) as i32;
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let base = base.min(self.max_delay.as_secs_f64());

        let jitter = if self.jitter_fraction > 0.0 {
            rand::rng().random_range(-self.jitter_fraction..=self.jitter_fraction)
        } else {
            0.0
        };

        let delay = (base * (1.0 + jitter)).max(0.0);
        Duration::from_secs_f64(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_exponentially_without_jitter() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(10))
            .jitter_fraction(0.0);

        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn caps_at_max_delay() {
        let backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(5))
            .jitter_fraction(0.0);

        assert_eq!(backoff.delay_for_attempt(10), Duration::from_secs(5));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(10))
            .jitter_fraction(0.2);

        for _ in 0..100 {
            let delay = backoff.delay_for_attempt(1);
            assert!(delay >= Duration::from_millis(80));
            assert!(delay <= Duration::from_millis(120));
        }
    }
}
