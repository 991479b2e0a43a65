//! Error types for RESTQL operations.

use indexmap::IndexMap;
use serde::Serialize;

use crate::method::Method;
use crate::schema::Capability;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Method not allowed on {method} request.")]
    MethodNotAllowed { capability: Capability, method: Method },

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid param {0}.")]
    UnknownParameter(String),

    #[error("Some fields are not applicable.")]
    FieldsNotApplicable,

    #[error("Order by is not applicable.")]
    OrderNotApplicable,

    #[error("Invalid value for {param}: {reason}")]
    InvalidValue { param: String, reason: String },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for an [`Error::InvalidValue`].
    pub fn invalid_value(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidValue {
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the request parameters themselves.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::UnknownParameter(_)
                | Error::FieldsNotApplicable
                | Error::OrderNotApplicable
                | Error::InvalidValue { .. }
        )
    }

    /// HTTP status code a response formatter should use for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::UnknownParameter(_)
            | Error::FieldsNotApplicable
            | Error::OrderNotApplicable
            | Error::InvalidValue { .. } => 422,
            Error::MethodNotAllowed { .. } | Error::UnsupportedMethod(_) => 405,
            Error::NotFound(_) => 404,
            Error::Io(_)
            | Error::DuckDb(_)
            | Error::Config(_)
            | Error::Storage(_)
            | Error::InvalidSchema(_) => 500,
        }
    }

    /// The parameter name (or error code) the failure is reported under.
    pub fn key(&self) -> &str {
        match self {
            Error::UnknownParameter(param) => param,
            Error::InvalidValue { param, .. } => param,
            Error::FieldsNotApplicable => "fields",
            Error::OrderNotApplicable => "order",
            Error::MethodNotAllowed { .. } | Error::UnsupportedMethod(_) => "method",
            Error::NotFound(_) => "not_found",
            Error::InvalidSchema(_) => "schema",
            Error::Io(_) | Error::DuckDb(_) | Error::Config(_) | Error::Storage(_) => "internal",
        }
    }

    /// Convert into the failure description handed to the response formatter.
    pub fn failure(&self) -> Failure {
        let mut errors = IndexMap::new();
        errors.insert(self.key().to_string(), vec![self.to_string()]);
        Failure {
            status: self.status_code(),
            errors,
        }
    }
}

/// Normalized failure description: `{fieldOrCode: [message]}` plus a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub status: u16,
    pub errors: IndexMap<String, Vec<String>>,
}

impl Failure {
    /// The first message, which is what gets reported to clients.
    pub fn message(&self) -> Option<&str> {
        self.errors
            .values()
            .next()
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    /// Force a 200 status when the client asked for status suppression.
    pub fn suppressed(mut self, suppress: bool) -> Self {
        if suppress {
            self.status = 200;
        }
        self
    }
}
