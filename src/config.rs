//! Configuration management for the Elasticsearch logger
//!
//! Configuration is fixed at startup and shared read-only by every worker.
//! Unlike a fail-soft SDK, a missing or malformed value is an error: the
//! middleware must not be installed without a usable publisher.

use std::time::Duration;

use crate::error::LogError;

/// Environment variable holding the Elasticsearch base URL
pub const ENV_URL: &str = "ELASTIC_LOGGER_URL";
/// Environment variable holding the target index
pub const ENV_INDEX: &str = "ELASTIC_LOGGER_INDEX";
/// Environment variable holding the logical service name
pub const ENV_SERVICE: &str = "ELASTIC_LOGGER_SERVICE";
/// Optional environment variable bounding each publish, in milliseconds
pub const ENV_TIMEOUT_MS: &str = "ELASTIC_LOGGER_TIMEOUT_MS";

/// Configuration for the logger
///
/// Loaded from environment variables:
/// - `ELASTIC_LOGGER_URL`: base URL of the Elasticsearch cluster (e.g. http://localhost:9200)
/// - `ELASTIC_LOGGER_INDEX`: index that receives one document per request
/// - `ELASTIC_LOGGER_SERVICE`: service name stamped on every record
/// - `ELASTIC_LOGGER_TIMEOUT_MS`: optional deadline for each publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the Elasticsearch cluster
    pub elastic_url: String,

    /// Target index name
    pub index: String,

    /// Logical service name written into each record
    pub service_name: String,

    /// Deadline for a single publish; `None` leaves it unbounded
    pub publish_timeout: Option<Duration>,
}

impl Config {
    /// Create configuration with explicit values
    pub fn new(
        elastic_url: impl Into<String>,
        index: impl Into<String>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            elastic_url: elastic_url.into(),
            index: index.into(),
            service_name: service_name.into(),
            publish_timeout: None,
        }
    }

    /// Bound every publish by `timeout`
    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = Some(timeout);
        self
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, LogError> {
        let elastic_url = required(ENV_URL)?;
        let index = required(ENV_INDEX)?;
        let service_name = required(ENV_SERVICE)?;

        let publish_timeout = match std::env::var(ENV_TIMEOUT_MS) {
            Ok(raw) => Some(parse_timeout_ms(&raw)?),
            Err(_) => None,
        };

        tracing::debug!(
            url = %elastic_url,
            index = %index,
            service = %service_name,
            ?publish_timeout,
            "loaded logger configuration from environment"
        );

        Ok(Self {
            elastic_url,
            index,
            service_name,
            publish_timeout,
        })
    }
}

fn required(name: &'static str) -> Result<String, LogError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(LogError::MissingConfig(name)),
    }
}

fn parse_timeout_ms(raw: &str) -> Result<Duration, LogError> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(LogError::InvalidConfig(format!(
            "{ENV_TIMEOUT_MS} must be a positive number of milliseconds, got {raw:?}"
        ))),
    }
}
