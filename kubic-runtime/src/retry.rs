//! Retry policy and backoff schedule for watch reconnects.
use std::time::Duration;

use rand::Rng;

/// How many reconnect attempts a watch task may make.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Give up on the first failure
    Never,
    /// Allow up to this many consecutive failed attempts
    MaxAttempts(u32),
    /// Keep reconnecting until cancelled
    Forever,
}

/// How the delay between attempts grows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BackoffSchedule {
    /// The same delay before every attempt
    Fixed(Duration),
    /// Delay grows geometrically from the initial delay, capped at a maximum
    Exponential {
        /// Factor applied per attempt
        multiplier: f64,
        /// Upper bound on the computed delay
        max_delay: Duration,
    },
}

/// Reconnect behavior of a watch task.
///
/// The delay before attempt `n` (n >= 1; attempt 0 is the initial call) is
/// the schedule's base delay plus uniform noise within `jitter` of it,
/// clamped at zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryStrategy {
    /// Bound on consecutive failed attempts
    pub policy: RetryPolicy,
    /// Shape of the delay curve
    pub backoff: BackoffSchedule,
    /// Seed delay; the first exponential delay and the floor of the curve
    pub initial_delay: Duration,
    /// Fraction of the delay added as random noise, in `0.0..=1.0`
    pub jitter: f64,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        RetryStrategy {
            policy: RetryPolicy::MaxAttempts(10),
            backoff: BackoffSchedule::Fixed(Duration::from_secs(5)),
            initial_delay: Duration::from_secs(1),
            jitter: 0.2,
        }
    }
}

impl RetryStrategy {
    /// A strategy that never reconnects
    pub fn never() -> Self {
        RetryStrategy {
            policy: RetryPolicy::Never,
            ..RetryStrategy::default()
        }
    }

    /// A strategy that reconnects until cancelled
    pub fn forever() -> Self {
        RetryStrategy {
            policy: RetryPolicy::Forever,
            ..RetryStrategy::default()
        }
    }

    /// Whether the policy still permits the given attempt number
    pub fn allows(&self, attempt: u32) -> bool {
        match self.policy {
            RetryPolicy::Never => false,
            RetryPolicy::MaxAttempts(n) => attempt <= n,
            RetryPolicy::Forever => true,
        }
    }

    /// The base delay before attempt `n`, without jitter
    pub fn delay(&self, attempt: u32) -> Duration {
        match self.backoff {
            BackoffSchedule::Fixed(d) => d,
            BackoffSchedule::Exponential {
                multiplier,
                max_delay,
            } => {
                let exp = self.initial_delay.as_secs_f64()
                    * multiplier.powi(attempt.saturating_sub(1) as i32);
                Duration::from_secs_f64(exp.min(max_delay.as_secs_f64()))
            }
        }
    }

    /// The delay before attempt `n` with jitter applied
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let base = self.delay(attempt).as_secs_f64();
        let spread = base * self.jitter.clamp(0.0, 1.0);
        if spread <= 0.0 {
            return self.delay(attempt);
        }
        let noise = rand::thread_rng().gen_range(-spread..=spread);
        Duration::from_secs_f64((base + noise).max(0.0))
    }
}

#[cfg(test)]
mod test {
    use super::{BackoffSchedule, RetryPolicy, RetryStrategy};
    use std::time::Duration;

    fn exponential(multiplier: f64, max_secs: u64) -> RetryStrategy {
        RetryStrategy {
            policy: RetryPolicy::Forever,
            backoff: BackoffSchedule::Exponential {
                multiplier,
                max_delay: Duration::from_secs(max_secs),
            },
            initial_delay: Duration::from_secs(1),
            jitter: 0.0,
        }
    }

    #[test]
    fn default_strategy() {
        let s = RetryStrategy::default();
        assert_eq!(s.policy, RetryPolicy::MaxAttempts(10));
        assert_eq!(s.backoff, BackoffSchedule::Fixed(Duration::from_secs(5)));
        assert_eq!(s.initial_delay, Duration::from_secs(1));
        assert!((s.jitter - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn policy_bounds_attempts() {
        let s = RetryStrategy {
            policy: RetryPolicy::MaxAttempts(2),
            ..RetryStrategy::default()
        };
        assert!(s.allows(1));
        assert!(s.allows(2));
        assert!(!s.allows(3));
        assert!(!RetryStrategy::never().allows(1));
        assert!(RetryStrategy::forever().allows(1_000_000));
    }

    #[test]
    fn fixed_delay_is_constant() {
        let s = RetryStrategy::default();
        for attempt in 1..10 {
            assert_eq!(s.delay(attempt), Duration::from_secs(5));
        }
    }

    #[test]
    fn exponential_delays_grow_and_cap() {
        let s = exponential(2.0, 30);
        assert_eq!(s.delay(1), Duration::from_secs(1));
        assert_eq!(s.delay(2), Duration::from_secs(2));
        assert_eq!(s.delay(3), Duration::from_secs(4));
        assert_eq!(s.delay(6), Duration::from_secs(30)); // 32 capped
        assert_eq!(s.delay(20), Duration::from_secs(30));
    }

    #[test]
    fn zero_jitter_delays_are_monotonic() {
        let s = exponential(1.7, 60);
        let mut last = Duration::ZERO;
        for attempt in 1..=30 {
            let d = s.jittered_delay(attempt);
            assert!(d >= last, "delay shrank at attempt {attempt}");
            assert!(d <= Duration::from_secs(60));
            last = d;
        }
    }

    #[test]
    fn jitter_stays_within_fraction() {
        let s = RetryStrategy {
            jitter: 0.2,
            ..RetryStrategy::default()
        };
        for _ in 0..1000 {
            let d = s.jittered_delay(1).as_secs_f64();
            assert!((4.0..=6.0).contains(&d), "jittered delay {d} out of range");
        }
    }
}
