//! Error types for fleetpulse.
//!
//! This module defines all error types used throughout the fleetpulse crate.
//! Nothing here is fatal to the process: a malformed frame affects only
//! itself, and a rejected ingest leaves the buffer untouched.

use std::net::SocketAddr;

use thiserror::Error;

/// The main error type for fleetpulse operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Frame Errors ===
    /// A payload was not well-formed hex of the expected length.
    #[error("malformed frame payload '{payload}': {reason}")]
    MalformedFrame {
        /// The offending payload text.
        payload: String,
        /// Why it could not be decoded.
        reason: String,
    },

    /// A required ingest field was missing or invalid.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Name of the offending field, as it appears on the wire.
        field: &'static str,
        /// Description of the validation failure.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Transport Errors ===
    /// Failed to bind the HTTP listener.
    #[error("failed to bind {addr}: {source}")]
    ServerBind {
        /// Address we tried to bind.
        addr: SocketAddr,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// HTTP transport to a remote ingestion boundary failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A remote ingestion boundary refused a frame.
    #[error("ingestion rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status code returned.
        status: u16,
        /// Response body, if any.
        body: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for fleetpulse operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a malformed frame error.
    #[must_use]
    pub fn malformed_frame(payload: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            payload: payload.into(),
            reason: reason.into(),
        }
    }

    /// Create a validation error for an ingest field.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a bad payload.
    #[must_use]
    pub fn is_malformed_frame(&self) -> bool {
        matches!(self, Self::MalformedFrame { .. })
    }

    /// Check if this error was caused by the caller's input rather than by us.
    ///
    /// The HTTP surface maps these to `400 Bad Request`.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MalformedFrame { .. } | Self::Validation { .. })
    }
}
