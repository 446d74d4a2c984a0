//! Construction of CHORDS `url_create` request URIs.
//!
//! [`build_uri`] turns a [`Measurement`](crate::measurement::Measurement)
//! into the string stored on the delivery queue. Query parameters are always
//! emitted in the same order:
//!
//! 1. `instrument_id`
//! 2. variables other than `at` and `test`, in insertion order
//! 3. `at`, rendered as `YYYY-MM-DDTHH:MM:SSZ`
//! 4. authentication: `email` + `api_key`, or the legacy `key`
//! 5. the bare `test` flag
//!
//! By default names and values are concatenated literally, so callers must
//! not pass values containing `&`, `=`, `#`, spaces or other characters
//! with meaning inside a query string. [`QueryEncoding::Percent`] lifts that
//! restriction by percent-encoding every name and value.

mod builder;
mod timetag;
mod url_encoding;


use thiserror::Error;

pub use builder::{QueryEncoding, UriBuilder, build_uri};
pub use timetag::format_timetag;

/// Path of the CHORDS endpoint accepting GET submissions.
pub const URL_CREATE_PATH: &str = "/measurements/url_create";

/// Malformed measurement submissions rejected before queueing.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    /// A required field was absent or empty.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    /// A field held a value that cannot be rendered into a query string.
    #[error("unsupported value for `{0}`")]
    UnsupportedValue(String),
    /// The `at` variable could not be converted to a UTC timetag.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// The submission was not valid JSON.
    #[error("invalid measurement JSON: {0}")]
    Json(String),
}
