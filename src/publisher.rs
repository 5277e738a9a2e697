//! Publisher: indexes transaction records into Elasticsearch
//!
//! One `POST {url}/{index}/_doc` per record. No retries, no batching: a failed
//! submission is returned to the caller as a [`LogError`].

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use url::Url;

use crate::config::Config;
use crate::error::LogError;
use crate::record::TransactionRecord;

/// Client-side handle on the target index.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct Publisher {
    client: Client,
    endpoint: Url,
    index: String,
    service_name: String,
}

impl Publisher {
    /// Build a publisher from validated configuration
    ///
    /// Only the shape of the configuration is checked; the cluster is not contacted.
    pub fn new(config: &Config) -> Result<Self, LogError> {
        let base = parse_base_url(&config.elastic_url)?;
        validate_index(&config.index)?;
        if config.service_name.trim().is_empty() {
            return Err(LogError::InvalidConfig(
                "service name must not be empty".to_string(),
            ));
        }

        let mut endpoint = base;
        endpoint
            .path_segments_mut()
            .map_err(|_| {
                LogError::InvalidConfig(format!(
                    "{} cannot be used as a base URL",
                    config.elastic_url
                ))
            })?
            .pop_if_empty()
            .push(&config.index)
            .push("_doc");

        let client = Client::builder()
            .build()
            .map_err(|e| LogError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            index: config.index.clone(),
            service_name: config.service_name.clone(),
        })
    }

    /// Service name stamped on every record
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Target index
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Document endpoint records are posted to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Serialize `record` and submit it once.
    ///
    /// `deadline` bounds the whole exchange with Elasticsearch; `None` waits
    /// for as long as the connection stays open. Returns `Ok(())` only when
    /// the cluster answers with a success status.
    pub async fn publish(
        &self,
        record: TransactionRecord,
        deadline: Option<Duration>,
    ) -> Result<(), LogError> {
        let payload = serde_json::to_vec(&record)?;

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        if let Some(deadline) = deadline {
            request = request.timeout(deadline);
        }

        let response = request.send().await.map_err(|e| match deadline {
            Some(deadline) if e.is_timeout() => LogError::Timeout(deadline),
            _ => LogError::Transport(e),
        })?;

        let status = response.status();
        if !status.is_success() {
            // Reading the body consumes and releases the response.
            let body = response.text().await.unwrap_or_default();
            return Err(LogError::Rejected { status, body });
        }
        drop(response);

        tracing::debug!(index = %self.index, %status, "transaction record indexed");
        Ok(())
    }
}

fn parse_base_url(raw: &str) -> Result<Url, LogError> {
    let url = Url::parse(raw)
        .map_err(|e| LogError::InvalidConfig(format!("invalid Elasticsearch URL {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(LogError::InvalidConfig(format!(
            "unsupported scheme {scheme:?} in Elasticsearch URL"
        ))),
    }
}

/// Elasticsearch index naming rules
fn validate_index(index: &str) -> Result<(), LogError> {
    const FORBIDDEN: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ',', '#', ' '];

    let invalid = |reason: &str| Err(LogError::InvalidConfig(format!("index {index:?} {reason}")));

    if index.is_empty() {
        return invalid("must not be empty");
    }
    if index == "." || index == ".." {
        return invalid("is reserved");
    }
    if index.starts_with(['-', '_', '+']) {
        return invalid("must not start with '-', '_' or '+'");
    }
    if index.contains(FORBIDDEN) {
        return invalid("contains a forbidden character");
    }
    if index.chars().any(char::is_uppercase) {
        return invalid("must be lowercase");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CapturedExchange;
    use actix_web::http::StatusCode;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: &str) -> Config {
        Config::new(url, "http-logs", "checkout")
    }

    fn record(status: StatusCode) -> TransactionRecord {
        TransactionRecord::assemble(
            "checkout",
            CapturedExchange {
                host: "shop.example.com".to_string(),
                status,
                ..CapturedExchange::default()
            },
        )
    }

    #[test]
    fn test_endpoint_layout() {
        let publisher = Publisher::new(&config("http://localhost:9200")).unwrap();
        assert_eq!(
            publisher.endpoint().as_str(),
            "http://localhost:9200/http-logs/_doc"
        );

        let publisher = Publisher::new(&config("https://es.internal/cluster-a/")).unwrap();
        assert_eq!(
            publisher.endpoint().as_str(),
            "https://es.internal/cluster-a/http-logs/_doc"
        );
        assert_eq!(publisher.service_name(), "checkout");
        assert_eq!(publisher.index(), "http-logs");
    }

    #[test]
    fn test_malformed_url_rejected() {
        let err = Publisher::new(&config("not a url")).unwrap_err();
        assert!(matches!(err, LogError::InvalidConfig(_)));

        let err = Publisher::new(&config("ftp://localhost:9200")).unwrap_err();
        assert!(matches!(err, LogError::InvalidConfig(_)));
    }

    #[test]
    fn test_index_rules() {
        assert!(validate_index("http-logs-2024").is_ok());
        assert!(validate_index("").is_err());
        assert!(validate_index("..").is_err());
        assert!(validate_index("_internal").is_err());
        assert!(validate_index("Logs").is_err());
        assert!(validate_index("a/b").is_err());
        assert!(validate_index("a b").is_err());
    }

    #[test]
    fn test_empty_service_rejected() {
        let err = Publisher::new(&Config::new("http://localhost:9200", "logs", "")).unwrap_err();
        assert!(matches!(err, LogError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_publish_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/http-logs/_doc"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(serde_json::json!({
                "service_name": "checkout",
                "hostname": "shop.example.com",
                "http_status": "200"
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"result": "created"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let publisher = Publisher::new(&config(&server.uri())).unwrap();
        publisher.publish(record(StatusCode::OK), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/http-logs/_doc"))
            .respond_with(ResponseTemplate::new(400).set_body_string("mapper_parsing_exception"))
            .mount(&server)
            .await;

        let publisher = Publisher::new(&config(&server.uri())).unwrap();
        let err = publisher
            .publish(record(StatusCode::OK), None)
            .await
            .unwrap_err();

        assert!(err.is_rejection());
        match err {
            LogError::Rejected { status, body } => {
                assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
                assert_eq!(body, "mapper_parsing_exception");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_publish_unreachable_fails_repeatedly() {
        let publisher = Publisher::new(&config("http://127.0.0.1:1")).unwrap();

        let first = publisher.publish(record(StatusCode::OK), None).await;
        assert!(matches!(first, Err(LogError::Transport(_))));

        let second = publisher.publish(record(StatusCode::NOT_FOUND), None).await;
        assert!(matches!(second, Err(LogError::Transport(_))));
    }

    #[tokio::test]
    async fn test_publish_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let publisher = Publisher::new(&config(&server.uri())).unwrap();
        let err = publisher
            .publish(record(StatusCode::OK), Some(Duration::from_millis(100)))
            .await
            .unwrap_err();

        assert!(matches!(err, LogError::Timeout(d) if d == Duration::from_millis(100)));
        assert!(err.is_transport());
    }
}
