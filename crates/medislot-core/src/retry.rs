//! Sleep-and-retry policy for the outer search loop.
//!
//! An empty attempt with keep-going enabled is the only recoverable
//! condition in the whole engine; everything else propagates as an
//! error. During long sleeps the credential is refreshed periodically
//! so the session does not expire mid-wait.

use std::time::Duration;

use rand::Rng;

use crate::auth::TokenManager;
use crate::error::{CoreError, Result};

/// Sleep at most this long between credential freshness checks.
const SLEEP_SLICE: Duration = Duration::from_secs(30);

/// Retry configuration consumed by [`RetryScheduler`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retry on empty results instead of failing.
    pub keep_going: bool,
    /// Positive: fixed sleep in seconds. Negative: uniform random sleep
    /// in `[0, |interval|)` seconds, so a fleet of pollers does not hit
    /// the provider in lockstep.
    pub interval_secs: i64,
}

impl RetryPolicy {
    /// Sleep duration for the next retry.
    pub fn sleep_duration(&self) -> Duration {
        self.sleep_duration_with(&mut rand::thread_rng())
    }

    fn sleep_duration_with<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.interval_secs >= 0 {
            Duration::from_secs(self.interval_secs as u64)
        } else {
            let ceiling = -self.interval_secs as f64;
            Duration::from_secs_f64(rng.gen_range(0.0..ceiling))
        }
    }
}

/// Drives the retry loop around full search attempts.
pub struct RetryScheduler {
    policy: RetryPolicy,
    attempts: u32,
}

impl RetryScheduler {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Search attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Decide what follows an empty attempt: a sleep duration, or
    /// [`CoreError::Exhausted`] when retries are disabled.
    pub fn on_empty(&self) -> Result<Duration> {
        if !self.policy.keep_going {
            return Err(CoreError::Exhausted);
        }
        Ok(self.policy.sleep_duration())
    }

    /// Sleep `duration` in short slices, keeping the credential fresh so
    /// a multi-minute wait does not leave the session to expire.
    pub async fn wait(&self, duration: Duration, token: &mut TokenManager) -> Result<()> {
        let mut remaining = duration;
        while !remaining.is_zero() {
            let slice = remaining.min(SLEEP_SLICE);
            tokio::time::sleep(slice).await;
            remaining = remaining.saturating_sub(slice);
            token.ensure_fresh().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn positive_interval_is_exact() {
        let policy = RetryPolicy {
            keep_going: true,
            interval_secs: 10,
        };
        for _ in 0..5 {
            assert_eq!(policy.sleep_duration(), Duration::from_secs(10));
        }
    }

    #[test]
    fn negative_interval_is_bounded_jitter() {
        let policy = RetryPolicy {
            keep_going: true,
            interval_secs: -10,
        };
        for _ in 0..1000 {
            let duration = policy.sleep_duration();
            assert!(duration < Duration::from_secs(10), "got {duration:?}");
        }
    }

    #[test]
    fn jitter_spans_the_range() {
        let policy = RetryPolicy {
            keep_going: true,
            interval_secs: -10,
        };
        // StepRng walking the full u64 range exercises both ends
        let mut rng = StepRng::new(0, u64::MAX / 7);
        let samples: Vec<_> = (0..50).map(|_| policy.sleep_duration_with(&mut rng)).collect();
        assert!(samples.iter().any(|d| *d < Duration::from_secs(2)));
        assert!(samples.iter().any(|d| *d > Duration::from_secs(8)));
    }

    #[test]
    fn empty_without_keep_going_is_exhausted() {
        let scheduler = RetryScheduler::new(RetryPolicy {
            keep_going: false,
            interval_secs: 10,
        });
        assert!(matches!(
            scheduler.on_empty(),
            Err(CoreError::Exhausted)
        ));
    }

    #[test]
    fn empty_with_keep_going_yields_a_sleep() {
        let scheduler = RetryScheduler::new(RetryPolicy {
            keep_going: true,
            interval_secs: 3,
        });
        assert_eq!(scheduler.on_empty().unwrap(), Duration::from_secs(3));
    }
}
