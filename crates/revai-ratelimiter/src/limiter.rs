use std::time::{Duration, Instant};

/// Lazily-refilled token bucket for a single identity.
///
/// Refill happens on access rather than on a background timer: each call to
/// [`TokenBucket::try_acquire`] first tops the bucket up for the elapsed time
/// since the last access, then attempts to withdraw one token.
#[derive(Debug)]
pub(crate) struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub(crate) fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;
        if elapsed <= 0.0 {
            return;
        }
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
    }

    /// Attempts to withdraw one token. Returns `Ok(remaining)` on success or
    /// `Err(retry_after)` with an estimate of when a token will next be
    /// available.
    pub(crate) fn try_acquire(&mut self, now: Instant) -> Result<f64, Duration> {
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(self.tokens)
        } else {
            let deficit = 1.0 - self.tokens;
            let seconds = if self.refill_rate > 0.0 {
                deficit / self.refill_rate
            } else {
                f64::INFINITY
            };
            Err(Duration::from_secs_f64(seconds.max(0.0)))
        }
    }

    pub(crate) fn remaining(&mut self, now: Instant) -> f64 {
        self.refill(now);
        self.tokens
    }

    pub(crate) fn reset(&mut self) {
        self.tokens = self.capacity;
        self.last_refill = Instant::now();
    }

    /// Gives back one previously-withdrawn token, capped at `capacity`.
    ///
    /// Used to roll back a consumed token when a later admission step (e.g.
    /// quota or queue capacity) rejects a request after the rate limit has
    /// already been charged.
    pub(crate) fn refund(&mut self, now: Instant) {
        self.refill(now);
        self.tokens = (self.tokens + 1.0).min(self.capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_full() {
        let mut bucket = TokenBucket::new(5.0, 1.0);
        assert_eq!(bucket.remaining(Instant::now()), 5.0);
    }

    #[test]
    fn drains_to_empty_then_rejects() {
        let mut bucket = TokenBucket::new(2.0, 1.0);
        let now = Instant::now();
        assert!(bucket.try_acquire(now).is_ok());
        assert!(bucket.try_acquire(now).is_ok());
        assert!(bucket.try_acquire(now).is_err());
    }

    #[test]
    fn refills_over_time() {
        let mut bucket = TokenBucket::new(1.0, 10.0);
        let t0 = Instant::now();
        assert!(bucket.try_acquire(t0).is_ok());
        assert!(bucket.try_acquire(t0).is_err());

        let t1 = t0 + Duration::from_millis(200);
        assert!(bucket.try_acquire(t1).is_ok());
    }

    #[test]
    fn reset_restores_capacity() {
        let mut bucket = TokenBucket::new(1.0, 1.0);
        let now = Instant::now();
        assert!(bucket.try_acquire(now).is_ok());
        bucket.reset();
        assert_eq!(bucket.remaining(Instant::now()), 1.0);
    }

    #[test]
    fn refund_restores_one_token_without_exceeding_capacity() {
        let mut bucket = TokenBucket::new(2.0, 1.0);
        let now = Instant::now();
        assert!(bucket.try_acquire(now).is_ok());
        assert!(bucket.try_acquire(now).is_ok());
        assert_eq!(bucket.remaining(now), 0.0);

        bucket.refund(now);
        assert_eq!(bucket.remaining(now), 1.0);

        bucket.refund(now);
        bucket.refund(now);
        assert_eq!(bucket.remaining(now), 2.0);
    }
}
