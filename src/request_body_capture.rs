//! Request body snapshot
//!
//! Reads the inbound payload fully, then re-installs an equivalent payload so
//! handlers see exactly what the client sent, including a read failure.

use std::pin::Pin;

use actix_web::dev::{Payload, ServiceRequest};
use actix_web::error::PayloadError;
use actix_web::web::{Bytes, BytesMut};
use actix_web::HttpMessage;
use futures::stream::{self, Stream, StreamExt};

/// What was read from the request payload
#[derive(Debug, Default)]
pub struct RequestSnapshot {
    /// Bytes read before the payload ended or failed
    pub body: Bytes,

    /// Rendered payload error, if reading stopped early
    pub read_error: Option<String>,
}

/// Drain the request payload and put an equivalent one back.
///
/// On a read error the handler gets the bytes read so far followed by the
/// same error, so it fails the way it would have without the snapshot.
pub async fn snapshot_request_body(req: &mut ServiceRequest) -> RequestSnapshot {
    let mut payload = req.take_payload();
    let mut buffer = BytesMut::new();
    let mut failure = None;

    while let Some(chunk) = payload.next().await {
        match chunk {
            Ok(chunk) => buffer.extend_from_slice(&chunk),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    let body = buffer.freeze();
    match failure {
        None => {
            req.set_payload(Payload::from(body.clone()));
            RequestSnapshot {
                body,
                read_error: None,
            }
        }
        Some(e) => {
            let read_error = Some(e.to_string());
            let replay: Vec<Result<Bytes, PayloadError>> = if body.is_empty() {
                vec![Err(e)]
            } else {
                vec![Ok(body.clone()), Err(e)]
            };
            req.set_payload(Payload::Stream {
                payload: Box::pin(stream::iter(replay))
                    as Pin<Box<dyn Stream<Item = Result<Bytes, PayloadError>>>>,
            });
            RequestSnapshot { body, read_error }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    async fn drain(req: &mut ServiceRequest) -> (Bytes, bool) {
        let mut payload = req.take_payload();
        let mut seen = BytesMut::new();
        while let Some(chunk) = payload.next().await {
            match chunk {
                Ok(chunk) => seen.extend_from_slice(&chunk),
                Err(_) => return (seen.freeze(), true),
            }
        }
        (seen.freeze(), false)
    }

    #[actix_rt::test]
    async fn test_snapshot_leaves_body_readable() {
        let mut req = TestRequest::post()
            .uri("/orders")
            .set_payload("{\"qty\":3}")
            .to_srv_request();

        let snapshot = snapshot_request_body(&mut req).await;
        assert_eq!(&snapshot.body[..], b"{\"qty\":3}");
        assert!(snapshot.read_error.is_none());

        let again = snapshot_request_body(&mut req).await;
        assert_eq!(again.body, snapshot.body);
    }

    #[actix_rt::test]
    async fn test_snapshot_empty_body() {
        let mut req = TestRequest::get().uri("/health").to_srv_request();

        let snapshot = snapshot_request_body(&mut req).await;
        assert!(snapshot.body.is_empty());
        assert!(snapshot.read_error.is_none());
    }

    #[actix_rt::test]
    async fn test_snapshot_binary_body() {
        let raw: &[u8] = &[0x00, 0xff, 0x10, 0x80];
        let mut req = TestRequest::put()
            .uri("/blob")
            .set_payload(raw.to_vec())
            .to_srv_request();

        let snapshot = snapshot_request_body(&mut req).await;
        assert_eq!(&snapshot.body[..], raw);
    }

    #[actix_rt::test]
    async fn test_snapshot_replays_partial_body_and_error() {
        let mut req = TestRequest::post().uri("/upload").to_srv_request();
        let chunks: Vec<Result<Bytes, PayloadError>> = vec![
            Ok(Bytes::from_static(b"part")),
            Err(PayloadError::Incomplete(None)),
        ];
        req.set_payload(Payload::Stream {
            payload: Box::pin(stream::iter(chunks)),
        });

        let snapshot = snapshot_request_body(&mut req).await;
        assert_eq!(&snapshot.body[..], b"part");
        assert!(snapshot.read_error.is_some());

        let (seen, failed) = drain(&mut req).await;
        assert_eq!(&seen[..], b"part");
        assert!(failed);
    }
}
