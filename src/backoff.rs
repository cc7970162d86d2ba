//! Exponential backoff with equal jitter.
//!
//! ```text
//! base(n)  = min(max_delay, base_delay * multiplier^(n-1))
//! delay(n) = base(n) * (0.5 + r * 0.5)    r ∈ [0, 1) when jitter is on
//!          = base(n)                      otherwise
//! ```
//!
//! Equal jitter keeps at least half of the computed wait (bounded tail latency)
//! while still spreading simultaneous retries apart.

use crate::policy::RetryPolicy;
use std::time::Duration;

/// Computes retry waits for one policy.
#[derive(Debug, Clone, Copy)]
pub struct BackoffCalculator<'a> {
    policy: &'a RetryPolicy,
}

impl<'a> BackoffCalculator<'a> {
    pub fn new(policy: &'a RetryPolicy) -> Self {
        Self { policy }
    }

    /// Deterministic part of the delay after failed attempt `attempt` (1-based).
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let base_ns = self.policy.base_delay.as_nanos() as f64;
        let cap_ns = self.policy.max_delay.as_nanos() as f64;

        let raw = base_ns
            * self
                .policy
                .backoff_multiplier
                .powi(exponent.min(i32::MAX as u32) as i32);
        let capped = if raw.is_finite() { raw.min(cap_ns) } else { cap_ns };

        Duration::from_nanos(capped.max(0.0) as u64)
    }

    /// Delay to sleep after failed attempt `attempt`, jitter drawn from the policy's random source.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if !self.policy.jitter {
            return base;
        }

        let r = self.policy.random.next_unit().clamp(0.0, 1.0);
        let factor = 0.5 + r * 0.5;
        let jittered = Duration::from_nanos((base.as_nanos() as f64 * factor) as u64);
        jittered.min(self.policy.max_delay)
    }
}

pub fn base_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    BackoffCalculator::new(policy).base_delay(attempt)
}

pub fn delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    BackoffCalculator::new(policy).delay(attempt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RandomSource;

    struct Fixed(f64);

    impl RandomSource for Fixed {
        fn next_unit(&self) -> f64 {
            self.0
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(2_000))
            .with_backoff_multiplier(2.0)
            .with_jitter(false)
    }

    #[test]
    fn grows_exponentially_then_caps() {
        let p = policy();
        let delays: Vec<u64> = (1..=7).map(|n| base_delay(n, &p).as_millis() as u64).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1600, 2000, 2000]);
    }

    #[test]
    fn monotonic_without_jitter() {
        let p = policy().with_backoff_multiplier(1.7);
        let mut prev = Duration::ZERO;
        for n in 1..=40 {
            let d = delay(n, &p);
            assert!(d >= prev, "attempt {} shrank: {:?} < {:?}", n, d, prev);
            assert!(d <= p.max_delay);
            prev = d;
        }
        assert_eq!(prev, p.max_delay);
    }

    #[test]
    fn jitter_stays_between_half_and_full_base() {
        let p = policy().with_jitter(true).with_random(Fixed(0.0));
        assert_eq!(delay(3, &p), Duration::from_millis(200));

        let p = policy().with_jitter(true).with_random(Fixed(0.999_999));
        let d = delay(3, &p);
        assert!(d <= Duration::from_millis(400));
        assert!(d >= Duration::from_millis(399));
    }

    #[test]
    fn jitter_never_exceeds_cap() {
        let p = policy()
            .with_jitter(true)
            .with_random(crate::policy::SeededRandom::new(7));
        for n in 1..=64 {
            let d = delay(n, &p);
            assert!(d <= p.max_delay);
        }
    }

    #[test]
    fn huge_attempts_do_not_overflow() {
        let p = policy().with_backoff_multiplier(10.0);
        assert_eq!(base_delay(u32::MAX, &p), p.max_delay);
        assert_eq!(base_delay(0, &p), Duration::from_millis(100));
    }

    #[test]
    fn sub_millisecond_delays_are_kept() {
        let p = policy()
            .with_base_delay(Duration::from_micros(250))
            .with_max_delay(Duration::from_millis(10));
        let calc = BackoffCalculator::new(&p);
        assert_eq!(calc.base_delay(1), Duration::from_micros(250));
        assert_eq!(calc.delay(3), Duration::from_millis(1));
    }

    #[test]
    fn out_of_range_random_is_clamped() {
        let p = policy().with_jitter(true).with_random(Fixed(7.5));
        assert!(delay(1, &p) <= Duration::from_millis(100));
        let p = policy().with_jitter(true).with_random(Fixed(-3.0));
        assert_eq!(delay(1, &p), Duration::from_millis(50));
    }
}
