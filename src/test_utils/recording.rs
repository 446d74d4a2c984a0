//! In-memory transports that record what the sender attempted.

use std::collections::VecDeque;

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::sender::{Transport, TransportError, TransportErrorKind};

/// Capacity of the attempt log; attempts beyond it are not recorded.
const ATTEMPT_LOG_CAPACITY: usize = 256;

/// Transport replaying scripted outcomes, then succeeding forever.
pub struct ScriptedTransport {
    script: VecDeque<Result<(), TransportError>>,
    attempts: Sender<String>,
}

impl ScriptedTransport {
    /// Script outcomes for the first attempts; the receiver yields every
    /// attempted URI in order.
    pub fn new(
        script: impl IntoIterator<Item = Result<(), TransportError>>,
    ) -> (Self, Receiver<String>) {
        let (tx, rx) = bounded(ATTEMPT_LOG_CAPACITY);
        let transport = Self {
            script: script.into_iter().collect(),
            attempts: tx,
        };
        (transport, rx)
    }

    /// Transport that delivers every request.
    pub fn succeeding() -> (Self, Receiver<String>) {
        Self::new(std::iter::empty())
    }
}

impl Transport for ScriptedTransport {
    fn get(&mut self, uri: &str) -> Result<(), TransportError> {
        let _ = self.attempts.try_send(uri.to_owned());
        self.script.pop_front().unwrap_or(Ok(()))
    }
}

/// Transport that fails every request with the given kind.
pub fn failing(kind: TransportErrorKind) -> (impl Transport, Receiver<String>) {
    let (tx, rx) = bounded(ATTEMPT_LOG_CAPACITY);
    let transport = move |uri: &str| -> Result<(), TransportError> {
        let _ = tx.try_send(uri.to_owned());
        Err(TransportError::new(kind, "connection refused"))
    };
    (transport, rx)
}

/// Shorthand for a scripted failure.
pub fn fail(kind: TransportErrorKind) -> Result<(), TransportError> {
    Err(TransportError::new(kind, "scripted failure"))
}
