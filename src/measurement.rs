//! Structured measurement records accepted by the URI builder.
//!
//! A [`Measurement`] names the reporting instrument, carries an ordered list
//! of variables and the credentials used to authenticate against the CHORDS
//! host. Two variable names are reserved: `at` holds the timestamp and `test`
//! marks the record as test data. Both are rendered by the builder in fixed
//! positions instead of the generic `name=value` pass.

use std::fmt;

use serde_json::{Map, Value};

use crate::uri::BuildError;

/// Reserved variable holding the measurement timestamp.
pub const AT_VAR: &str = "at";
/// Reserved variable marking the measurement as test data.
pub const TEST_VAR: &str = "test";

/// Scalar value attached to a measurement variable.
#[derive(Clone, Debug, PartialEq)]
pub enum VarValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl VarValue {
    /// Whether the value counts as set when used as the `test` flag.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Int(v) => *v != 0,
            Self::Float(v) => *v != 0.0,
            Self::Text(v) => !v.is_empty(),
            Self::Bool(v) => *v,
        }
    }

    fn from_json(name: &str, value: &Value) -> Result<Self, BuildError> {
        match value {
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::String(s) => Ok(Self::Text(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .ok_or_else(|| BuildError::UnsupportedValue(name.to_owned())),
            Value::Null | Value::Array(_) | Value::Object(_) => {
                Err(BuildError::UnsupportedValue(name.to_owned()))
            }
        }
    }
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write_float(f, *v),
            Self::Text(v) => f.write_str(v),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Render floats so integral readings keep their decimal point (`770.0`).
fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        f.write_str("nan")
    } else if v.is_infinite() {
        f.write_str(if v > 0.0 { "inf" } else { "-inf" })
    } else if v.fract() == 0.0 && v.abs() < 1e16 {
        write!(f, "{v:.1}")
    } else {
        write!(f, "{v}")
    }
}

impl From<i64> for VarValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for VarValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for VarValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for VarValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for VarValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for VarValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Authentication method resolved from [`Credentials`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Auth<'a> {
    /// Preferred email/API key pair.
    EmailKey { email: &'a str, key: &'a str },
    /// Legacy shared secret.
    Skey(&'a str),
    None,
}

/// Credentials presented to the CHORDS host.
///
/// Empty strings are treated the same as absent values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_email: Option<String>,
    pub api_key: Option<String>,
    pub skey: Option<String>,
}

impl Credentials {
    /// Credentials using the email/API key pair.
    pub fn email_key(email: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            api_email: Some(email.into()),
            api_key: Some(key.into()),
            skey: None,
        }
    }

    /// Credentials using the legacy shared secret.
    pub fn skey(skey: impl Into<String>) -> Self {
        Self {
            skey: Some(skey.into()),
            ..Self::default()
        }
    }

    /// Resolve the single method applied to a request.
    ///
    /// The email/key pair wins whenever both halves are non-empty.
    pub fn method(&self) -> Auth<'_> {
        fn non_empty(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.is_empty())
        }
        if let (Some(email), Some(key)) = (non_empty(&self.api_email), non_empty(&self.api_key)) {
            return Auth::EmailKey { email, key };
        }
        match non_empty(&self.skey) {
            Some(skey) => Auth::Skey(skey),
            None => Auth::None,
        }
    }

    /// Whether any authentication method would be applied.
    pub fn is_usable(&self) -> bool {
        self.method() != Auth::None
    }
}

/// Measurement submission turned into a request by [`crate::uri::build_uri`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Measurement {
    pub instrument_id: String,
    pub variables: Vec<(String, VarValue)>,
    pub credentials: Credentials,
    pub test: bool,
}

impl Measurement {
    pub fn new(instrument_id: impl Into<String>) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            ..Self::default()
        }
    }

    /// Set a variable, replacing an existing entry of the same name in place.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<VarValue>) -> Self {
        self.set_var(name, value);
        self
    }

    /// Set the timestamp as Unix seconds.
    pub fn with_at(self, unix_secs: i64) -> Self {
        self.with_var(AT_VAR, unix_secs)
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_test(mut self, test: bool) -> Self {
        self.test = test;
        self
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<VarValue>) {
        let name = name.into();
        let value = value.into();
        match self.variables.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.variables.push((name, value)),
        }
    }

    pub fn var(&self, name: &str) -> Option<&VarValue> {
        self.variables
            .iter()
            .find_map(|(n, v)| (n == name).then_some(v))
    }

    /// Whether the bare `test` flag should be appended.
    pub fn is_test(&self) -> bool {
        self.test || self.var(TEST_VAR).is_some_and(VarValue::is_truthy)
    }

    /// Parse the JSON record shape used by CHORDS collection scripts.
    ///
    /// ```json
    /// {"inst_id": "1", "skey": "123456", "vars": {"at": 1511456154, "rh": 33}}
    /// ```
    ///
    /// `instrument_id` is accepted as an alias for `inst_id`. The order of
    /// `vars` is preserved.
    pub fn from_json(json: &str) -> Result<Self, BuildError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| BuildError::Json(e.to_string()))?;
        let Value::Object(obj) = value else {
            return Err(BuildError::Json("expected a JSON object".into()));
        };
        Self::from_json_object(&obj)
    }

    fn from_json_object(obj: &Map<String, Value>) -> Result<Self, BuildError> {
        let instrument_id = match obj.get("inst_id").or_else(|| obj.get("instrument_id")) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => return Err(BuildError::UnsupportedValue("inst_id".into())),
            None => return Err(BuildError::MissingField("inst_id")),
        };
        let Some(vars) = obj.get("vars") else {
            return Err(BuildError::MissingField("vars"));
        };
        let Value::Object(vars) = vars else {
            return Err(BuildError::UnsupportedValue("vars".into()));
        };
        let variables = vars
            .iter()
            .map(|(name, value)| Ok((name.clone(), VarValue::from_json(name, value)?)))
            .collect::<Result<Vec<_>, BuildError>>()?;
        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_owned);
        let test = match obj.get(TEST_VAR) {
            None | Some(Value::Null) => false,
            Some(flag) => VarValue::from_json(TEST_VAR, flag)?.is_truthy(),
        };
        Ok(Self {
            instrument_id,
            variables,
            credentials: Credentials {
                api_email: text("api_email"),
                api_key: text("api_key"),
                skey: text("skey"),
            },
            test,
        })
    }
}
