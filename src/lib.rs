//! # Elastic Logger for Actix-Web
//!
//! Request/response logging middleware that indexes one document per HTTP
//! exchange into Elasticsearch.
//!
//! - **Passive**: the request body is read and put back byte-for-byte, and the
//!   response body is duplicated as it streams, never altered
//! - **One record per request**: however many chunks the handler writes
//! - **Non-fatal**: publish failures go to an error reporter and never touch
//!   the response the client received
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use actix_web::{web, App, HttpResponse, HttpServer};
//! use elastic_logger_actix::{Config, ElasticLoggerMiddleware};
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     let config = Config::new("http://localhost:9200", "http-logs", "checkout");
//!     let logger = ElasticLoggerMiddleware::with_config(&config)
//!         .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
//!
//!     HttpServer::new(move || {
//!         App::new()
//!             .wrap(logger.clone())
//!             .route("/", web::get().to(|| async { HttpResponse::Ok().body("Hello!") }))
//!     })
//!     .bind("0.0.0.0:8080")?
//!     .run()
//!     .await
//! }
//! ```
//!
//! ## Document shape
//!
//! ```json
//! {
//!   "service_name": "checkout",
//!   "hostname": "shop.example.com",
//!   "timestamp": "20240115",
//!   "http_status": "200",
//!   "header": "accept: */*\nuser-agent: curl/8.0",
//!   "request": "",
//!   "response": "Hello!"
//! }
//! ```
//!
//! ## Architecture
//!
//! - `middleware`: Actix-Web middleware orchestrating each request
//! - `request_body_capture`: request body snapshot that leaves the payload intact
//! - `response_body_capture`: pass-through body that duplicates every chunk
//! - `record`: the indexed document
//! - `publisher`: Elasticsearch client wrapper
//! - `config`: explicit and environment-based configuration
//! - `error`: error type and the error reporting channel
//! - `utils`: timestamps, header flattening, duration formatting

pub mod config;
pub mod error;
pub mod middleware;
pub mod publisher;
pub mod record;
pub mod request_body_capture;
pub mod response_body_capture;
pub mod utils;

pub use config::Config;
pub use error::{ErrorReporter, LogError, TracingReporter};
pub use middleware::{ElasticLoggerMiddleware, PROCESSING_TIME_HEADER};
pub use publisher::Publisher;
pub use record::TransactionRecord;

/// Convenience prelude for importing common types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{ErrorReporter, LogError};
    pub use crate::middleware::ElasticLoggerMiddleware;
    pub use crate::publisher::Publisher;
}
