//! Raw request parameters as received from the HTTP layer.

use indexmap::IndexMap;
use serde::Serialize;

use crate::query::to_snake_case;

/// Reserved parameter that is accepted on every endpoint. When present, failures
/// are reported with a 200 status.
pub const SUPPRESS_STATUS_PARAM: &str = "suppressResponseHttpStatusCode";

/// A single raw parameter value: a string, or a list for repeated keys (`a[]=x&a[]=y`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Single(String),
    Many(Vec<String>),
}

impl ParamValue {
    /// The value if it is a plain string.
    pub fn as_single(&self) -> Option<&str> {
        match self {
            ParamValue::Single(s) => Some(s),
            ParamValue::Many(_) => None,
        }
    }

    /// Comma-joined form (list elements joined, strings unchanged).
    pub fn joined(&self) -> String {
        match self {
            ParamValue::Single(s) => s.clone(),
            ParamValue::Many(values) => values.join(","),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Single(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Single(s)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::Many(values)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        ParamValue::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// Flat mapping of parameter name to value, in the order received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    values: IndexMap<String, ParamValue>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, replacing any previous value under the same name.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the reserved status-suppression parameter was sent (in any casing).
    pub fn suppresses_status(&self) -> bool {
        self.values
            .keys()
            .any(|key| is_suppress_status_param(key))
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for RequestParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = RequestParams::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

pub(crate) fn is_suppress_status_param(key: &str) -> bool {
    to_snake_case(key) == to_snake_case(SUPPRESS_STATUS_PARAM)
}
