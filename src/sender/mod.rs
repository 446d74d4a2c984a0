//! Background delivery of queued request URIs.
//!
//! [`spawn_sender`] starts a thread that drains a
//! [`DeliveryQueue`](crate::queue::DeliveryQueue) in FIFO order and transmits
//! each URI through a [`Transport`]. Failures never reach producers: they are
//! logged and the same item is retried according to the configured
//! [`BackoffPolicy`] and [`RetryPolicy`].
//!
//! # Retry Semantics
//!
//! - **Success**: log, discard the item, move to the next one.
//! - **Rate limited** (HTTP 429): wait the rate-limit delay (2 s by default)
//!   and retry the same item.
//! - **Any other transport error**: wait the retry delay (none by default)
//!   and retry the same item.
//! - **Retry cap reached** (only when configured): pass the item to the
//!   dead-letter hook and move on.
//!
//! # Status Codes
//!
//! Any HTTP response counts as delivered, including 4xx and 5xx statuses.
//! The single exception is 429 Too Many Requests, which [`UreqTransport`]
//! reports as [`TransportErrorKind::RateLimited`] so the loop backs off and
//! retries. No other status is inspected.

mod backoff;
mod config;
mod handle;
mod transport;
mod worker;

#[cfg(test)]
mod tests;

pub use backoff::BackoffState;
pub use config::{
    BackoffPolicy, DEFAULT_CONNECT_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_RATE_LIMIT_DELAY,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_DELAY, DeadLetterHook, RetryPolicy, SenderConfig,
};
pub use handle::{SenderHandle, spawn_sender};
pub use transport::{Transport, TransportError, TransportErrorKind, UreqTransport};
