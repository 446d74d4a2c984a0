//! Configuration consumed by the sender loop.

use std::{fmt, sync::Arc, time::Duration};

use super::transport::TransportError;

/// Idle sleep between checks of an empty queue.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Delay before retrying after a generic transport failure.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::ZERO;
/// Delay before retrying after a rate-limit-class failure.
pub const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_secs(2);
/// Default connection timeout applied by [`UreqTransport`](super::UreqTransport).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default overall request timeout applied by [`UreqTransport`](super::UreqTransport).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Delay applied between attempts to deliver the same item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Fixed delays; the defaults retry immediately, or after two seconds
    /// when the host signals rate limiting.
    Constant {
        delay: Duration,
        rate_limited_delay: Duration,
    },
    /// Jittered doubling from `base` up to `cap`, reset after each delivery.
    Exponential {
        base: Duration,
        cap: Duration,
        rate_limited_delay: Duration,
    },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::Constant {
            delay: DEFAULT_RETRY_DELAY,
            rate_limited_delay: DEFAULT_RATE_LIMIT_DELAY,
        }
    }
}

/// Limits on how often one item is attempted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts before an item is handed to the dead-letter hook.
    /// `None` retries forever, stalling the queue behind a failing item.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn unlimited() -> Self {
        Self { max_attempts: None }
    }

    pub fn capped(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
        }
    }

    pub(crate) fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Callback receiving items abandoned after exhausting [`RetryPolicy`].
#[derive(Clone)]
pub struct DeadLetterHook(Arc<dyn Fn(&str, &TransportError) + Send + Sync>);

impl DeadLetterHook {
    pub fn new(hook: impl Fn(&str, &TransportError) + Send + Sync + 'static) -> Self {
        Self(Arc::new(hook))
    }

    pub(crate) fn call(&self, uri: &str, err: &TransportError) {
        (self.0)(uri, err);
    }
}

impl fmt::Debug for DeadLetterHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeadLetterHook")
    }
}

/// Configuration object describing how the sender loop behaves.
#[derive(Clone, Debug)]
pub struct SenderConfig {
    pub poll_interval: Duration,
    pub backoff: BackoffPolicy,
    pub retry: RetryPolicy,
    pub dead_letter: Option<DeadLetterHook>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            backoff: BackoffPolicy::default(),
            retry: RetryPolicy::default(),
            dead_letter: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl SenderConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_dead_letter(mut self, hook: DeadLetterHook) -> Self {
        self.dead_letter = Some(hook);
        self
    }
}
