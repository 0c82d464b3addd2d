//! The `utils` module provides the pieces shared across the crate: the
//! error type, `Status` values, logging initialisation, time formatting
//! and the XML/JSON helpers used by the decoders.

pub mod error;
pub mod json;
pub mod logging;
pub mod status;
pub mod time;
pub mod xml;

pub use error::{GmsecError, Result};
pub use status::{Status, StatusClass, StatusCode};

#[cfg(test)]
mod tests;
