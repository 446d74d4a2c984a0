//! Network transport used by the sender loop.
//!
//! The loop only needs to know whether a GET for a URI went through. The
//! [`Transport`] trait keeps that decision pluggable; [`UreqTransport`] is
//! the HTTP implementation used in production.

use std::{
    fmt,
    io::{self, Read},
    time::Duration,
};

use thiserror::Error;
use ureq::{Agent, AgentBuilder};

use super::config::SenderConfig;

/// Upper bound on response bytes read before the connection is released.
const MAX_DRAIN_BYTES: u64 = 64 * 1024;

/// Broad category of a failed transmission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Host name resolution failed.
    Dns,
    /// The TCP connection could not be established.
    Connect,
    /// Socket read or write failed, including timeouts.
    Io,
    /// The URI could not be parsed or used.
    InvalidUrl,
    /// The host answered with a malformed or unusable HTTP exchange.
    Protocol,
    /// The host asked the client to slow down.
    RateLimited,
    Other,
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dns => "dns",
            Self::Connect => "connect",
            Self::Io => "io",
            Self::InvalidUrl => "invalid-url",
            Self::Protocol => "protocol",
            Self::RateLimited => "rate-limited",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure transmitting a single request.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether the retry should wait for the rate-limit delay.
    pub fn is_rate_limited(&self) -> bool {
        self.kind == TransportErrorKind::RateLimited
    }
}

impl From<&ureq::Transport> for TransportError {
    fn from(err: &ureq::Transport) -> Self {
        use ureq::ErrorKind;

        let kind = match err.kind() {
            ErrorKind::Dns => TransportErrorKind::Dns,
            ErrorKind::ConnectionFailed => TransportErrorKind::Connect,
            ErrorKind::Io => TransportErrorKind::Io,
            ErrorKind::InvalidUrl | ErrorKind::UnknownScheme => TransportErrorKind::InvalidUrl,
            ErrorKind::TooManyRedirects | ErrorKind::BadStatus | ErrorKind::BadHeader => {
                TransportErrorKind::Protocol
            }
            _ => TransportErrorKind::Other,
        };
        Self::new(kind, err.to_string())
    }
}

/// Performs one blocking GET per queued URI.
///
/// Implementations must return `Ok(())` once the request reached the host.
/// Any `Err` makes the sender retry the same URI.
pub trait Transport: Send + 'static {
    fn get(&mut self, uri: &str) -> Result<(), TransportError>;
}

impl<F> Transport for F
where
    F: FnMut(&str) -> Result<(), TransportError> + Send + 'static,
{
    fn get(&mut self, uri: &str) -> Result<(), TransportError> {
        self(uri)
    }
}

/// HTTP transport backed by a pooled `ureq::Agent`.
///
/// The response body is discarded. Status codes are not treated as failures,
/// with the exception of 429 which is reported as
/// [`TransportErrorKind::RateLimited`] so the sender slows down.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Self {
        let agent = AgentBuilder::new()
            .timeout_connect(connect_timeout)
            .timeout(request_timeout)
            .build();
        Self { agent }
    }

    pub fn from_config(config: &SenderConfig) -> Self {
        Self::new(config.connect_timeout, config.request_timeout)
    }
}

impl Transport for UreqTransport {
    fn get(&mut self, uri: &str) -> Result<(), TransportError> {
        match self.agent.get(uri).call() {
            Ok(response) => {
                drain(response);
                Ok(())
            }
            Err(ureq::Error::Status(429, _)) => Err(TransportError::new(
                TransportErrorKind::RateLimited,
                "host returned 429 Too Many Requests",
            )),
            Err(ureq::Error::Status(_, response)) => {
                drain(response);
                Ok(())
            }
            Err(ureq::Error::Transport(err)) => Err(TransportError::from(&err)),
        }
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

/// Read a bounded amount of the body so the agent can reuse the connection.
fn drain(response: ureq::Response) {
    let mut reader = response.into_reader().take(MAX_DRAIN_BYTES);
    let _ = io::copy(&mut reader, &mut io::sink());
}
