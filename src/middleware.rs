//! Actix-Web middleware that indexes every exchange into Elasticsearch
//!
//! Per request:
//! 1. snapshot the request body and put an equivalent payload back
//! 2. run the inner service
//! 3. stamp `X-Processing-Time` on the response head
//! 4. wrap the body in a [`CaptureBody`] and return the response
//! 5. once the body has been delivered, assemble one [`TransactionRecord`]
//!    and publish it; failures go to the [`ErrorReporter`]
//!
//! Nothing in steps 3-5 can change the status or body the client receives.

use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderMap, HeaderName, HeaderValue};
use actix_web::Error;
use futures::future::{ok, LocalBoxFuture, Ready};

use crate::config::Config;
use crate::error::{ErrorReporter, LogError, TracingReporter};
use crate::publisher::Publisher;
use crate::record::{CapturedExchange, TransactionRecord};
use crate::request_body_capture::snapshot_request_body;
use crate::response_body_capture::{CaptureBody, CapturedResponse};
use crate::utils::{declared_host, format_duration, summarize_headers};

/// Response header carrying the handler's processing time
pub const PROCESSING_TIME_HEADER: &str = "x-processing-time";

/// Elasticsearch logging middleware for Actix-Web
///
/// ```rust,no_run
/// use actix_web::App;
/// use elastic_logger_actix::{Config, ElasticLoggerMiddleware, Publisher};
///
/// let publisher = Publisher::new(&Config::new("http://localhost:9200", "http-logs", "shop"))
///     .expect("invalid logger configuration");
/// let app = App::new().wrap(ElasticLoggerMiddleware::new(publisher));
/// ```
#[derive(Clone)]
pub struct ElasticLoggerMiddleware {
    shared: Arc<Shared>,
}

struct Shared {
    publisher: Publisher,
    reporter: Arc<dyn ErrorReporter>,
    publish_timeout: Option<Duration>,
}

impl ElasticLoggerMiddleware {
    /// Log through `publisher`, reporting failures with [`TracingReporter`]
    pub fn new(publisher: Publisher) -> Self {
        Self {
            shared: Arc::new(Shared {
                publisher,
                reporter: Arc::new(TracingReporter),
                publish_timeout: None,
            }),
        }
    }

    /// Build from configuration; fails if the configuration is unusable
    pub fn with_config(config: &Config) -> Result<Self, LogError> {
        let publisher = Publisher::new(config)?;
        let mut middleware = Self::new(publisher);
        if let Some(timeout) = config.publish_timeout {
            middleware = middleware.publish_timeout(timeout);
        }
        Ok(middleware)
    }

    /// Build from `ELASTIC_LOGGER_*` environment variables
    pub fn from_env() -> Result<Self, LogError> {
        Self::with_config(&Config::from_env()?)
    }

    /// Send publish failures to `reporter` instead of `tracing`
    pub fn reporter(self, reporter: impl ErrorReporter) -> Self {
        self.rebuild(|shared| shared.reporter = Arc::new(reporter))
    }

    /// Bound each publish by `timeout`
    pub fn publish_timeout(self, timeout: Duration) -> Self {
        self.rebuild(|shared| shared.publish_timeout = Some(timeout))
    }

    fn rebuild(self, apply: impl FnOnce(&mut Shared)) -> Self {
        let mut shared = match Arc::try_unwrap(self.shared) {
            Ok(shared) => shared,
            Err(shared) => Shared {
                publisher: shared.publisher.clone(),
                reporter: Arc::clone(&shared.reporter),
                publish_timeout: shared.publish_timeout,
            },
        };
        apply(&mut shared);
        Self {
            shared: Arc::new(shared),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ElasticLoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = ElasticLoggerMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ElasticLoggerMiddlewareService {
            service: Rc::new(service),
            shared: Arc::clone(&self.shared),
        })
    }
}

/// Per-worker service produced by [`ElasticLoggerMiddleware`]
pub struct ElasticLoggerMiddlewareService<S> {
    service: Rc<S>,
    shared: Arc<Shared>,
}

impl<S, B> Service<ServiceRequest> for ElasticLoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let shared = Arc::clone(&self.shared);

        Box::pin(async move {
            let started = Instant::now();
            let host = declared_host(req.headers(), req.uri());
            let header_summary = summarize_headers(req.headers());

            let snapshot = snapshot_request_body(&mut req).await;
            if let Some(read_error) = &snapshot.read_error {
                tracing::warn!(
                    error = %read_error,
                    captured = snapshot.body.len(),
                    "request body read failed; logging the bytes received"
                );
            }
            let request_body = snapshot.body;

            match service.call(req).await {
                Ok(res) => {
                    let mut res = res.map_into_boxed_body();
                    attach_processing_time(res.headers_mut(), started.elapsed());

                    let status = res.status();
                    let (request, response) = res.into_parts();
                    let (response, body) = response.into_parts();
                    let (sink, captured) = CaptureBody::new(body);
                    let res = ServiceResponse::new(request, response.set_body(BoxBody::new(sink)));

                    let exchange = CapturedExchange {
                        host,
                        status,
                        header_summary,
                        request_body,
                        ..CapturedExchange::default()
                    };
                    actix_web::rt::spawn(publish_when_delivered(shared, exchange, captured));

                    Ok(res)
                }
                Err(err) => {
                    // The server renders `err` itself; log what it will send.
                    let status = err.as_response_error().status_code();
                    let rendered = err
                        .error_response()
                        .into_body()
                        .try_into_bytes()
                        .unwrap_or_default();

                    let exchange = CapturedExchange {
                        host,
                        status,
                        header_summary,
                        request_body,
                        ..CapturedExchange::default()
                    };
                    actix_web::rt::spawn(publish_when_delivered(
                        shared,
                        exchange,
                        CapturedResponse::ready(rendered),
                    ));

                    Err(err)
                }
            }
        })
    }
}

/// Wait for the response body, then publish exactly one record
async fn publish_when_delivered(
    shared: Arc<Shared>,
    mut exchange: CapturedExchange,
    captured: CapturedResponse,
) {
    exchange.response_body = captured.collect().await;
    let record = TransactionRecord::assemble(shared.publisher.service_name(), exchange);

    if let Err(err) = shared
        .publisher
        .publish(record, shared.publish_timeout)
        .await
    {
        shared.reporter.report(err);
    }
}

/// Best effort: an unrepresentable value is skipped
fn attach_processing_time(headers: &mut HeaderMap, elapsed: Duration) {
    match HeaderValue::from_str(&format_duration(elapsed)) {
        Ok(value) => {
            headers.insert(HeaderName::from_static(PROCESSING_TIME_HEADER), value);
        }
        Err(e) => tracing::debug!(error = %e, "could not attach processing time"),
    }
}
