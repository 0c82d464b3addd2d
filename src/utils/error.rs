//! The `error` module defines the error type shared by every part of the crate.
//!
//! Argument problems are always reported synchronously as `IllegalArgument`.
//! Transport failures surface as `Connection`. Timeouts are never errors:
//! operations that can time out return `Ok(None)` instead.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GmsecError>;

#[derive(Debug, Error)]
pub enum GmsecError {
    /// The caller passed an empty, malformed or out-of-range argument.
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    /// The transport could not be reached or refused an operation.
    #[error("connection error: {0}")]
    Connection(String),

    /// The operation is not valid in the object's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("type conversion error: {0}")]
    TypeConversion(String),

    #[error("parse error: {0}")]
    Parse(String),

    /// Schema compliance failure raised where a `Status` can't be returned.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    WebSocket(#[from] tungstenite::Error),

    #[error(transparent)]
    Storage(#[from] sled::Error),
}

impl GmsecError {
    pub fn illegal_argument(msg: impl Into<String>) -> Self {
        Self::IllegalArgument(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

impl From<quick_xml::Error> for GmsecError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for GmsecError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Parse(err.to_string())
    }
}
