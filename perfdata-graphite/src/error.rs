//! Error types for the Graphite client.

use thiserror::Error;

/// Errors that can occur while answering a perfdata request.
///
/// Transport and configuration failures are terminal for a request.
/// Malformed rows or discovery entries are not errors at all; they are
/// skipped where they are parsed.
#[derive(Debug, Error)]
pub enum GraphiteError {
    /// The client could not be built from the supplied settings.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The backend could not be reached (refused, DNS, TLS handshake).
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The backend answered with a non-success status.
    #[error("Graphite API returned status {status}: {reason}")]
    Protocol { status: u16, reason: String },

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Any other HTTP client failure.
    #[error("HTTP request failed: {0}")]
    Http(String),
}

/// Coarse classification of a [`GraphiteError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Connection,
    Protocol,
    Parse,
    Other,
}

impl GraphiteError {
    /// Which class of failure this is.
    pub fn category(&self) -> ErrorCategory {
        match self {
            GraphiteError::Config(_) => ErrorCategory::Configuration,
            GraphiteError::Connection(_) | GraphiteError::Timeout => ErrorCategory::Connection,
            GraphiteError::Protocol { .. } | GraphiteError::Auth(_) => ErrorCategory::Protocol,
            GraphiteError::Parse(_) => ErrorCategory::Parse,
            GraphiteError::Http(_) => ErrorCategory::Other,
        }
    }

    pub(crate) fn from_status(status: reqwest::StatusCode) -> Self {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return GraphiteError::Auth("Invalid credentials".to_string());
        }
        GraphiteError::Protocol {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }
}

impl From<reqwest::Error> for GraphiteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GraphiteError::Timeout
        } else if err.is_connect() {
            GraphiteError::Connection(err.to_string())
        } else if err.is_builder() {
            GraphiteError::Config(err.to_string())
        } else if let Some(status) = err.status() {
            GraphiteError::from_status(status)
        } else {
            GraphiteError::Http(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let err = GraphiteError::from_status(reqwest::StatusCode::UNAUTHORIZED);
        assert!(matches!(err, GraphiteError::Auth(_)));
        assert_eq!(err.category(), ErrorCategory::Protocol);

        let err = GraphiteError::from_status(reqwest::StatusCode::BAD_GATEWAY);
        assert_eq!(
            err.to_string(),
            "Graphite API returned status 502: Bad Gateway"
        );
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            GraphiteError::Config("x".into()).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(GraphiteError::Timeout.category(), ErrorCategory::Connection);
        assert_eq!(
            GraphiteError::Parse("x".into()).category(),
            ErrorCategory::Parse
        );
        assert_eq!(GraphiteError::Http("x".into()).category(), ErrorCategory::Other);
    }
}
