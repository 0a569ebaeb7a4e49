//! Error types for peopledesk.
//!
//! This module defines all error types used throughout the peopledesk crate.
//! Network-facing variants keep the classification the UI needs (timeout vs.
//! network failure vs. HTTP status) so callers can react without parsing text.

use thiserror::Error;

/// HTTP status the server uses to report a duplicate identifier.
pub const CONFLICT_STATUS: u16 = 409;

/// The main error type for peopledesk operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Transport Errors ===
    /// No response arrived before the request deadline.
    #[error("request timed out: {operation}")]
    Timeout {
        /// Description of the request that timed out.
        operation: String,
    },

    /// The request could not be completed (DNS, connection reset, ...).
    #[error("network error: {message}")]
    Network {
        /// Description of what went wrong.
        message: String,
    },

    // === API Errors ===
    /// The server rejected a create because the identifier already exists.
    #[error("{message}")]
    Conflict {
        /// Machine-checkable code (the HTTP status).
        code: u16,
        /// Server-provided message, or a fallback.
        message: String,
    },

    /// Any other non-success HTTP status.
    #[error("{message}")]
    Http {
        /// HTTP status code returned by the server.
        status: u16,
        /// Server-provided message, or a fallback.
        message: String,
    },

    // === Client Errors ===
    /// Local form validation failed; no request was issued.
    #[error("{message}")]
    Validation {
        /// Combined description of every violated rule.
        message: String,
    },

    /// A form operation was requested while no form is open.
    #[error("no form is open")]
    NoForm,

    /// An operation for this identifier is already in flight.
    #[error("an operation for DNI {dni} is already in progress")]
    Busy {
        /// The identifier that is locked.
        dni: String,
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

    // === I/O Errors ===
    /// Terminal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for peopledesk operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a timeout error for the given operation.
    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a conflict error carrying the 409 code.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            code: CONFLICT_STATUS,
            message: message.into(),
        }
    }

    /// Create a generic HTTP failure.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a client-side validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Check if this error is a request timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if this error is a duplicate-identifier conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Check if this error was produced locally before any request.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// The machine-checkable code of this error, if it has one.
    ///
    /// Conflicts report their code, HTTP failures their status.
    #[must_use]
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Conflict { code, .. } => Some(*code),
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
