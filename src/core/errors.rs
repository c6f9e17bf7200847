//! Error types for the reducer.
//!
//! A single `thiserror`-derived enum covers the taxonomy from the error
//! handling design: most variants are fatal and propagate to the driver,
//! `InterfaceUnavailable` is always absorbed locally by the import-inline
//! step, and `Cancelled` short-circuits a run while preserving whatever
//! `RequestInfo` was last accepted.

use std::io;

use thiserror::Error;

/// Result type used throughout the reducer core.
pub type Result<T> = std::result::Result<T, ReduceError>;

/// Errors raised by the request model, oracle, and reducers.
#[derive(Error, Debug)]
pub enum ReduceError {
    /// Input envelope lacks a required key (source file) or could not be decoded.
    #[error("malformed request: {message}")]
    MalformedRequest {
        /// Human-readable description of what was missing or inconsistent.
        message: String,
    },

    /// UTF-8 or JSON encoding/decoding failed while building or serializing a request.
    #[error("encoding error: {message}")]
    EncodingError {
        /// Description of the encoding failure.
        message: String,
    },

    /// The initial `RequestInfo` does not reproduce under the oracle.
    #[error("request does not reproduce the failure")]
    NotReproducing,

    /// Front-end mode: the merged multi-file input does not reproduce.
    #[error("merged source does not reproduce the failure")]
    MergeDidNotReproduce,

    /// Module-interface extraction failed. Always absorbed by the caller.
    #[error("module interface unavailable: {message}")]
    InterfaceUnavailable {
        /// Why the interface could not be extracted.
        message: String,
    },

    /// The subject process could not be spawned, or scratch I/O failed.
    #[error("oracle transient failure: {message}")]
    OracleTransient {
        /// Description of the spawn or I/O failure.
        message: String,
        /// Underlying I/O error, when one exists.
        #[source]
        source: Option<io::Error>,
    },

    /// Cooperative cancellation was observed between pipeline steps.
    #[error("reduction cancelled")]
    Cancelled,
}

impl ReduceError {
    /// Construct a `MalformedRequest` error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: message.into(),
        }
    }

    /// Construct an `EncodingError`.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Construct an `InterfaceUnavailable` error.
    pub fn interface_unavailable(message: impl Into<String>) -> Self {
        Self::InterfaceUnavailable {
            message: message.into(),
        }
    }

    /// Construct an `OracleTransient` error wrapping an I/O source.
    pub fn oracle_transient(message: impl Into<String>, source: io::Error) -> Self {
        Self::OracleTransient {
            message: message.into(),
            source: Some(source),
        }
    }

    /// True for errors the import-inline step should absorb rather than propagate.
    pub fn is_locally_absorbed(&self) -> bool {
        matches!(self, Self::InterfaceUnavailable { .. })
    }
}

impl From<io::Error> for ReduceError {
    fn from(err: io::Error) -> Self {
        Self::OracleTransient {
            message: "scratch I/O failed".to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for ReduceError {
    fn from(err: serde_json::Error) -> Self {
        Self::EncodingError {
            message: format!("JSON encoding failed: {err}"),
        }
    }
}

impl From<std::str::Utf8Error> for ReduceError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::EncodingError {
            message: format!("UTF-8 decoding failed: {err}"),
        }
    }
}

impl From<std::string::FromUtf8Error> for ReduceError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::EncodingError {
            message: format!("UTF-8 decoding failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_request_carries_message() {
        let err = ReduceError::malformed("no source file key");
        assert!(matches!(err, ReduceError::MalformedRequest { .. }));
        assert!(err.to_string().contains("no source file key"));
    }

    #[test]
    fn interface_unavailable_is_absorbed_others_are_not() {
        assert!(ReduceError::interface_unavailable("no such module").is_locally_absorbed());
        assert!(!ReduceError::NotReproducing.is_locally_absorbed());
        assert!(!ReduceError::Cancelled.is_locally_absorbed());
    }
}
