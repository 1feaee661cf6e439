//! # Error Types Module
//!
//! This module defines the error types shared by every outbound integration
//! (send API, document store, geocoding, flights, vision, SMS, GIFs) and by
//! configuration loading.

use thiserror::Error;

/// Errors raised while talking to an external service
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    /// The service answered with a non-success status code
    #[error("{service} returned status {status}: {detail}")]
    Status {
        service: &'static str,
        status: u16,
        detail: String,
    },
    /// Connection, TLS or protocol failure before a response arrived
    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },
    /// The call did not complete within the configured operation timeout
    #[error("{service} timed out after {secs}s")]
    Timeout { service: &'static str, secs: u64 },
    /// The circuit breaker for the service is open
    #[error("{service} is temporarily unavailable")]
    CircuitOpen { service: &'static str },
    /// A conditional write presented a stale revision, or the document already exists
    #[error("revision conflict on {collection}/{id}")]
    Conflict { collection: String, id: String },
    /// The requested resource does not exist
    #[error("{what} not found")]
    NotFound { what: String },
    /// The response body did not have the expected shape
    #[error("unexpected response from {service}: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

impl RelayError {
    /// Map a reqwest error onto the taxonomy, keeping timeouts distinct
    pub fn from_reqwest(service: &'static str, err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            RelayError::Timeout {
                service,
                secs: timeout_secs,
            }
        } else if err.is_decode() {
            RelayError::Decode {
                service,
                message: err.to_string(),
            }
        } else {
            RelayError::Transport {
                service,
                message: err.to_string(),
            }
        }
    }

    pub fn decode(service: &'static str, message: impl Into<String>) -> Self {
        RelayError::Decode {
            service,
            message: message.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RelayError::Conflict { .. })
    }

    /// Whether this failure should count against the service's circuit breaker
    pub fn is_service_fault(&self) -> bool {
        match self {
            RelayError::Status { status, .. } => *status >= 500,
            RelayError::Transport { .. } | RelayError::Timeout { .. } => true,
            _ => false,
        }
    }
}

/// Errors raised while loading [`crate::config::BotConfig`]
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}
