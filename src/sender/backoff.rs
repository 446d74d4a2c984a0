//! Retry delay state machine used by the sender loop.

use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::config::BackoffPolicy;

const MIN_SLEEP_MS: u64 = 10;

/// Produces the delay before the next attempt of the in-flight item.
pub struct BackoffState {
    policy: BackoffPolicy,
    current: Option<Duration>,
    rng: StdRng,
}

impl BackoffState {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            current: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Forget accumulated growth after a successful delivery.
    pub fn record_success(&mut self) {
        self.current = None;
    }

    /// Delay before retrying after a failure.
    pub fn next_delay(&mut self, rate_limited: bool) -> Duration {
        match self.policy {
            BackoffPolicy::Constant {
                delay,
                rate_limited_delay,
            } => {
                if rate_limited {
                    rate_limited_delay
                } else {
                    delay
                }
            }
            BackoffPolicy::Exponential {
                base,
                cap,
                rate_limited_delay,
            } => {
                let current = match self.current {
                    Some(prev) => prev.saturating_mul(2).min(cap),
                    None => base.min(cap),
                };
                self.current = Some(current);
                let jittered = self.jitter(current);
                if rate_limited {
                    jittered.max(rate_limited_delay)
                } else {
                    jittered
                }
            }
        }
    }

    fn jitter(&mut self, max: Duration) -> Duration {
        let max_ms = max.as_millis().min(u128::from(u64::MAX)) as u64;
        let sleep_ms = match max_ms {
            0..=MIN_SLEEP_MS => max_ms,
            _ => self.rng.gen_range(MIN_SLEEP_MS..=max_ms),
        };
        Duration::from_millis(sleep_ms)
    }
}
