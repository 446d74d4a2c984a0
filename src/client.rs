//! Producer-facing façade over the delivery queue and sender loop.

use std::sync::Arc;

use thiserror::Error;

use crate::{
    config::{ChordsConfig, DEFAULT_MAX_QUEUE},
    measurement::{Credentials, Measurement},
    queue::{DeliveryQueue, QueueError},
    sender::{SenderConfig, SenderHandle, Transport, UreqTransport, spawn_sender},
    uri::{BuildError, QueryEncoding, UriBuilder},
};

/// Errors returned to producers.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Client forwarding measurements to one CHORDS host.
///
/// Producers call [`submit_measurement`](Self::submit_measurement) or
/// [`submit`](Self::submit); neither blocks on the network. Delivery happens
/// on the thread started by [`start`](Self::start).
///
/// ```no_run
/// use tochords::{ChordsClient, Credentials, Measurement};
///
/// let client = ChordsClient::new("chords_host.com", Credentials::skey("123456"));
/// let _sender = client.start();
/// let m = Measurement::new("1").with_at(1511456154).with_var("rh", 33);
/// client.submit_measurement(&m).ok();
/// println!("{} waiting", client.waiting());
/// ```
#[derive(Debug)]
pub struct ChordsClient {
    builder: UriBuilder,
    credentials: Credentials,
    queue: Arc<DeliveryQueue>,
    max_queue: usize,
    sender_config: SenderConfig,
}

impl ChordsClient {
    pub fn new(host: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            builder: UriBuilder::new(host),
            credentials,
            queue: Arc::new(DeliveryQueue::new()),
            max_queue: DEFAULT_MAX_QUEUE,
            sender_config: SenderConfig::default(),
        }
    }

    pub fn from_config(config: &ChordsConfig) -> Self {
        Self::new(config.chords_host.clone(), config.credentials())
            .with_max_queue(config.max_queue)
            .with_sender_config(config.sender_config())
    }

    pub fn with_max_queue(mut self, max_queue: usize) -> Self {
        self.max_queue = max_queue;
        self
    }

    pub fn with_sender_config(mut self, config: SenderConfig) -> Self {
        self.sender_config = config;
        self
    }

    pub fn with_encoding(mut self, encoding: QueryEncoding) -> Self {
        self.builder = self.builder.with_encoding(encoding);
        self
    }

    /// Share an existing queue, e.g. one also fed by other clients.
    pub fn with_queue(mut self, queue: Arc<DeliveryQueue>) -> Self {
        self.queue = queue;
        self
    }

    pub fn queue(&self) -> &Arc<DeliveryQueue> {
        &self.queue
    }

    pub fn max_queue(&self) -> usize {
        self.max_queue
    }

    /// Build the request URI for `measurement`.
    ///
    /// Credentials carried by the measurement take priority; otherwise the
    /// client's configured credentials are applied.
    pub fn build_uri(&self, measurement: &Measurement) -> Result<String, BuildError> {
        if measurement.credentials.is_usable() {
            return self.builder.build(measurement);
        }
        let authed = Measurement {
            credentials: self.credentials.clone(),
            ..measurement.clone()
        };
        self.builder.build(&authed)
    }

    /// Queue an already built URI.
    pub fn submit(&self, uri: impl Into<String>) -> Result<(), QueueError> {
        self.queue.submit(uri, self.max_queue)
    }

    /// Build and queue `measurement`.
    pub fn submit_measurement(&self, measurement: &Measurement) -> Result<(), ClientError> {
        let uri = self.build_uri(measurement)?;
        self.submit(uri)?;
        Ok(())
    }

    /// Number of URIs waiting to be sent.
    pub fn waiting(&self) -> usize {
        self.queue.waiting()
    }

    /// Start delivering over HTTP.
    ///
    /// Call once per client: every call starts another sender competing for
    /// the same queue. The sender stops when the returned handle is dropped.
    #[must_use = "dropping the handle stops the sender"]
    pub fn start(&self) -> SenderHandle {
        self.start_with(UreqTransport::from_config(&self.sender_config))
    }

    /// Start delivering through a custom transport.
    #[must_use = "dropping the handle stops the sender"]
    pub fn start_with<T: Transport>(&self, transport: T) -> SenderHandle {
        spawn_sender(
            Arc::clone(&self.queue),
            transport,
            self.sender_config.clone(),
        )
    }
}
