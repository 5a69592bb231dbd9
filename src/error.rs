// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for netscope
//!
//! Only configuration errors ever reach an embedder. Everything raised while a
//! host callback is in flight is logged and dropped at the interceptor boundary.

use std::fmt;

use thiserror::Error;

/// Result type alias for netscope operations
pub type Result<T> = std::result::Result<T, Error>;

/// Transport a correlation id belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Http,
    WebSocket,
    Sse,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Http => write!(f, "http"),
            Transport::WebSocket => write!(f, "websocket"),
            Transport::Sse => write!(f, "sse"),
        }
    }
}

/// Main error type for netscope
#[derive(Error, Debug)]
pub enum Error {
    /// Illegal feature combination or invalid setting
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A raw callback arrived for an id the registry does not hold
    #[error("No {transport} record for id {id} (evicted or never seen)")]
    CorrelationMiss { transport: Transport, id: String },

    /// Body requested after eviction or for an unreadable handle
    #[error("Response body unavailable for {request_id}: {reason}")]
    BodyUnavailable { request_id: String, reason: String },

    /// Native error/abort reported by the host
    #[error("Transport failure on {id}: {reason}")]
    TransportFailure { id: String, reason: String },

    /// Bridge channel error
    #[error("Bridge error: {0}")]
    Bridge(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error (config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a correlation miss
    pub fn correlation_miss(transport: Transport, id: impl fmt::Display) -> Self {
        Error::CorrelationMiss {
            transport,
            id: id.to_string(),
        }
    }

    /// Create a body-unavailable error
    pub fn body_unavailable(request_id: impl fmt::Display, reason: impl Into<String>) -> Self {
        Error::BodyUnavailable {
            request_id: request_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a transport failure
    pub fn transport_failure(id: impl fmt::Display, reason: impl Into<String>) -> Self {
        Error::TransportFailure {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a bridge error
    pub fn bridge<S: Into<String>>(msg: S) -> Self {
        Error::Bridge(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// Check if this is a correlation miss
    pub fn is_correlation_miss(&self) -> bool {
        matches!(self, Error::CorrelationMiss { .. })
    }

    /// Expected-in-normal-operation faults that only cost an event
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::CorrelationMiss { .. }
                | Error::BodyUnavailable { .. }
                | Error::TransportFailure { .. }
                | Error::Bridge(_)
        )
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error() {
        let err = Error::configuration("SSE interception requires HTTP interception");

        assert!(err.is_configuration());
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("requires HTTP"));
    }

    #[test]
    fn test_correlation_miss() {
        let err = Error::correlation_miss(Transport::WebSocket, 7);

        assert!(err.is_correlation_miss());
        assert!(err.is_recoverable());
        assert_eq!(
            err.to_string(),
            "No websocket record for id 7 (evicted or never seen)"
        );
    }
}
