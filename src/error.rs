//! Error types for the Elasticsearch logger
//!
//! Configuration errors are fatal at startup. Everything raised while publishing
//! is handed to an [`ErrorReporter`] and never reaches the client.

use std::time::Duration;

use thiserror::Error;

/// Main error type for logger operations
#[derive(Error, Debug)]
pub enum LogError {
    /// A required configuration value was not provided
    #[error("Missing configuration: {0} is not set")]
    MissingConfig(&'static str),

    /// A configuration value is structurally invalid (bad URL, bad index name, ...)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The transaction record could not be encoded as JSON
    #[error("Failed to serialize log record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Elasticsearch could not be reached or the request could not be sent
    #[error("Failed to send log to Elasticsearch: {0}")]
    Transport(#[from] reqwest::Error),

    /// The caller-supplied deadline expired before Elasticsearch answered
    #[error("Timed out after {0:?} sending log to Elasticsearch")]
    Timeout(Duration),

    /// Elasticsearch answered but refused the document
    #[error("Elasticsearch rejected log: HTTP {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

impl LogError {
    /// True when the backend was never reached (or did not answer in time)
    pub fn is_transport(&self) -> bool {
        matches!(self, LogError::Transport(_) | LogError::Timeout(_))
    }

    /// True when the backend answered with a non-success status
    pub fn is_rejection(&self) -> bool {
        matches!(self, LogError::Rejected { .. })
    }
}

/// One-way channel for publish failures.
///
/// Implementations must not block for long: they run on the request's worker
/// once the response has been delivered.
pub trait ErrorReporter: Send + Sync + 'static {
    fn report(&self, error: LogError);
}

/// Default reporter: emits a `warn` event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: LogError) {
        tracing::warn!(
            error = %error,
            transport = error.is_transport(),
            rejected = error.is_rejection(),
            "failed to publish transaction record"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LogError::MissingConfig("ELASTIC_LOGGER_URL");
        assert_eq!(
            err.to_string(),
            "Missing configuration: ELASTIC_LOGGER_URL is not set"
        );

        let err = LogError::Rejected {
            status: reqwest::StatusCode::BAD_REQUEST,
            body: "mapper_parsing_exception".to_string(),
        };
        assert!(err.to_string().contains("rejected"));
        assert!(err.to_string().contains("400"));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<()>("invalid").unwrap_err();
        let log_err: LogError = json_err.into();
        assert!(matches!(log_err, LogError::Serialization(_)));
        assert!(!log_err.is_transport());
        assert!(!log_err.is_rejection());
    }

    #[test]
    fn test_error_classification() {
        assert!(LogError::Timeout(Duration::from_millis(5)).is_transport());
        let rejected = LogError::Rejected {
            status: reqwest::StatusCode::UNPROCESSABLE_ENTITY,
            body: String::new(),
        };
        assert!(rejected.is_rejection());
        assert!(!rejected.is_transport());
    }

    #[test]
    fn test_tracing_reporter_does_not_panic() {
        TracingReporter.report(LogError::InvalidConfig("bad".to_string()));
    }
}
