//! Client-side delivery of measurements to a CHORDS host.
//!
//! Producers build request URIs from [`Measurement`] records and push them
//! onto a bounded [`DeliveryQueue`]; a background sender drains the queue in
//! order and retries each request until the host accepts it. The
//! [`ChordsClient`] façade ties these together.

pub mod client;
pub mod config;
pub mod measurement;
pub mod queue;
pub mod rate_limited_warner;
pub mod sender;
pub mod uri;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use client::{ChordsClient, ClientError};
pub use config::{ChordsConfig, ConfigError};
pub use measurement::{Auth, Credentials, Measurement, VarValue};
pub use queue::{DeliveryQueue, QueueError};
pub use sender::{
    BackoffPolicy, DeadLetterHook, RetryPolicy, SenderConfig, SenderHandle, Transport,
    TransportError, TransportErrorKind, UreqTransport, spawn_sender,
};
pub use uri::{BuildError, QueryEncoding, UriBuilder, build_uri};
