//! Transaction record: the document indexed for each request
//!
//! One record is assembled per request once the response has been delivered.
//! Fields are private; a record never changes after assembly.

use actix_web::http::StatusCode;
use actix_web::web::Bytes;
use serde::{Deserialize, Serialize};

use crate::utils::current_date;

/// Everything the interceptor observed about one exchange
#[derive(Debug, Clone, Default)]
pub struct CapturedExchange {
    /// Host the client declared
    pub host: String,

    /// Final status code written by the handler
    pub status: StatusCode,

    /// Flattened request headers
    pub header_summary: String,

    /// Request body as the handler saw it
    pub request_body: Bytes,

    /// Response body as the client received it
    pub response_body: Bytes,
}

/// Document shape stored in Elasticsearch
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    service_name: String,
    hostname: String,
    timestamp: String,
    http_status: String,
    header: String,
    request: String,
    response: String,
}

impl TransactionRecord {
    /// Assemble a record stamped with today's date
    pub fn assemble(service_name: &str, exchange: CapturedExchange) -> Self {
        Self {
            service_name: service_name.to_string(),
            hostname: exchange.host,
            timestamp: current_date(),
            http_status: exchange.status.as_u16().to_string(),
            header: exchange.header_summary,
            request: String::from_utf8_lossy(&exchange.request_body).into_owned(),
            response: String::from_utf8_lossy(&exchange.response_body).into_owned(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn http_status(&self) -> &str {
        &self.http_status
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn request(&self) -> &str {
        &self.request
    }

    pub fn response(&self) -> &str {
        &self.response
    }
}
