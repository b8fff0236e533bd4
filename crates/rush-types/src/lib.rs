//! `rush-types` – shared vocabulary of the rush workspace.
//!
//! # Modules
//!
//! - [`value`] – [`ParamValue`][value::ParamValue], the dynamically typed
//!   parameter value, and the [`FromParamValue`][value::FromParamValue]
//!   conversion contract.
//!
//! The crate root also defines [`ParamError`], the error type used by every
//! other crate in the workspace.

pub mod value;

pub use value::{FromParamValue, ParamValue};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading, storing or converting parameters.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamError {
    /// The requested key is not present in the store.
    #[error("Key {0} not found")]
    KeyNotFound(String),

    /// A value could not be converted to the requested type.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// The parameter registry failed to answer a query.
    #[error("Registry Error: {0}")]
    Registry(String),

    /// A parameter name was rejected (e.g. it is not absolute).
    #[error("Invalid parameter name: {0}")]
    InvalidName(String),

    /// A parameter document could not be parsed.
    #[error("Parse Error: {0}")]
    Parse(String),
}

impl ParamError {
    /// Shorthand for a [`ParamError::TypeMismatch`].
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_error_display() {
        let err = ParamError::KeyNotFound("missing".to_string());
        assert_eq!(err.to_string(), "Key missing not found");

        let err = ParamError::mismatch("integer", "string");
        assert!(err.to_string().contains("expected integer"));
        assert!(err.to_string().contains("found string"));
    }

    #[test]
    fn param_error_serialization_roundtrip() {
        let err = ParamError::Registry("master unreachable".to_string());
        let json = serde_json::to_string(&err).unwrap();
        let back: ParamError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
