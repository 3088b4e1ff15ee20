//! Capped exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Default number of attempts (first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Retry policy for one orchestrated call.
///
/// The wait before retry `n` (0-indexed attempt that just failed) is
/// `min(2^n * base_delay, max_delay) + jitter`, with jitter drawn uniformly
/// from `[0, max_jitter)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(32_000),
            max_jitter: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Attempts actually made; a policy of 0 still sends one request.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Exponential part of the delay, before jitter.
    pub fn exponential_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Full delay using the supplied random source.
    pub fn delay_with<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rng.random_range(0..jitter_ms))
        };
        self.exponential_delay(attempt) + jitter
    }

    /// Full delay using the thread-local generator.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::rng())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_delay_within_bounds_for_each_attempt() {
        let policy = RetryPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);

        for attempt in 0..5u32 {
            let floor = Duration::from_millis(2u64.pow(attempt) * 1000);
            let ceiling = floor + Duration::from_millis(1000);
            for _ in 0..200 {
                let delay = policy.delay_with(attempt, &mut rng);
                assert!(
                    delay >= floor && delay < ceiling,
                    "attempt {} delay {:?} outside [{:?}, {:?})",
                    attempt,
                    delay,
                    floor,
                    ceiling
                );
            }
        }
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.exponential_delay(0), Duration::from_secs(1));
        assert_eq!(policy.exponential_delay(3), Duration::from_secs(8));
        assert_eq!(policy.exponential_delay(5), Duration::from_secs(32));
        assert_eq!(policy.exponential_delay(6), Duration::from_secs(32));
        assert_eq!(policy.exponential_delay(40), Duration::from_secs(32));
    }

    #[test]
    fn test_zero_jitter_is_deterministic() {
        let policy = RetryPolicy {
            max_jitter: Duration::ZERO,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
    }

    #[test]
    fn test_zero_attempts_still_sends_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.attempts(), 1);
        assert_eq!(RetryPolicy::with_max_attempts(0).max_attempts, 1);
    }
}
