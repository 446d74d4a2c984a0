use std::fmt::{Display, Write as _};

use crate::measurement::{AT_VAR, Auth, Measurement, TEST_VAR};

use super::{BuildError, URL_CREATE_PATH, timetag::render_at, url_encoding::push_encoded};

/// How names and values are written into the query string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueryEncoding {
    /// Concatenate names and values verbatim.
    #[default]
    Literal,
    /// Percent-encode every name and value.
    Percent,
}

/// Builds `url_create` URIs for a single CHORDS host.
#[derive(Clone, Debug)]
pub struct UriBuilder {
    host: String,
    encoding: QueryEncoding,
}

impl UriBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            encoding: QueryEncoding::default(),
        }
    }

    pub fn with_encoding(mut self, encoding: QueryEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Render `measurement` as a request URI.
    ///
    /// # Errors
    ///
    /// * [`BuildError::MissingField`] - the host or instrument id is empty
    /// * [`BuildError::InvalidTimestamp`] - `at` cannot be rendered in UTC
    pub fn build(&self, measurement: &Measurement) -> Result<String, BuildError> {
        if self.host.is_empty() {
            return Err(BuildError::MissingField("host"));
        }
        if measurement.instrument_id.is_empty() {
            return Err(BuildError::MissingField("instrument_id"));
        }

        let mut query = Query::new(&self.host, self.encoding);
        query.pair("instrument_id", &measurement.instrument_id);
        for (name, value) in &measurement.variables {
            if name != AT_VAR && name != TEST_VAR {
                query.pair(name, value);
            }
        }
        if let Some(at) = measurement.var(AT_VAR) {
            query.pair(AT_VAR, render_at(at)?);
        }
        match measurement.credentials.method() {
            Auth::EmailKey { email, key } => {
                query.pair("email", email);
                query.pair("api_key", key);
            }
            Auth::Skey(skey) => query.pair("key", skey),
            Auth::None => {}
        }
        if measurement.is_test() {
            query.flag(TEST_VAR);
        }
        Ok(query.finish())
    }
}

/// Build a URI for `host` with literal query concatenation.
///
/// ```
/// use tochords::{Credentials, Measurement, build_uri};
///
/// let m = Measurement::new("1")
///     .with_var("rh", 33)
///     .with_credentials(Credentials::skey("123456"));
/// assert_eq!(
///     build_uri("chords_host.com", &m).unwrap(),
///     "http://chords_host.com/measurements/url_create?instrument_id=1&rh=33&key=123456",
/// );
/// ```
pub fn build_uri(host: &str, measurement: &Measurement) -> Result<String, BuildError> {
    UriBuilder::new(host).build(measurement)
}

struct Query {
    uri: String,
    encoding: QueryEncoding,
    started: bool,
}

impl Query {
    fn new(host: &str, encoding: QueryEncoding) -> Self {
        Self {
            uri: format!("http://{host}{URL_CREATE_PATH}"),
            encoding,
            started: false,
        }
    }

    fn separator(&mut self) {
        self.uri.push(if self.started { '&' } else { '?' });
        self.started = true;
    }

    fn push(&mut self, component: &str) {
        match self.encoding {
            QueryEncoding::Literal => self.uri.push_str(component),
            QueryEncoding::Percent => push_encoded(&mut self.uri, component),
        }
    }

    fn pair(&mut self, name: &str, value: impl Display) {
        self.separator();
        self.push(name);
        self.uri.push('=');
        match self.encoding {
            // Writing into a String cannot fail.
            QueryEncoding::Literal => {
                let _ = write!(self.uri, "{value}");
            }
            QueryEncoding::Percent => self.push(&value.to_string()),
        }
    }

    fn flag(&mut self, name: &str) {
        self.separator();
        self.push(name);
    }

    fn finish(self) -> String {
        self.uri
    }
}
