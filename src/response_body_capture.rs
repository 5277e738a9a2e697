//! Response body capture
//!
//! [`CaptureBody`] wraps the outgoing body and copies each chunk into a buffer
//! as the server pulls it, passing the chunk through untouched. When the body
//! ends, errors, or is dropped, the buffer is handed to the paired
//! [`CapturedResponse`] exactly once.

use std::pin::Pin;
use std::task::{Context, Poll};

use actix_web::body::{BodySize, BoxBody, MessageBody};
use actix_web::web::{Bytes, BytesMut};
use tokio::sync::oneshot;

/// Pass-through body that duplicates every chunk it yields
pub struct CaptureBody {
    body: BoxBody,
    captured: BytesMut,
    on_complete: Option<oneshot::Sender<Bytes>>,
}

/// Bytes the client received, available once the body has finished
pub struct CapturedResponse(Inner);

enum Inner {
    Pending(oneshot::Receiver<Bytes>),
    Ready(Bytes),
}

impl CaptureBody {
    pub fn new(body: BoxBody) -> (Self, CapturedResponse) {
        let (tx, rx) = oneshot::channel();
        let sink = Self {
            body,
            captured: BytesMut::new(),
            on_complete: Some(tx),
        };
        (sink, CapturedResponse(Inner::Pending(rx)))
    }

    fn complete(&mut self) {
        if let Some(tx) = self.on_complete.take() {
            let _ = tx.send(self.captured.split().freeze());
        }
    }
}

impl MessageBody for CaptureBody {
    type Error = <BoxBody as MessageBody>::Error;

    fn size(&self) -> BodySize {
        self.body.size()
    }

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        let this = self.get_mut();

        match Pin::new(&mut this.body).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.captured.extend_from_slice(&chunk);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.complete();
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.complete();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for CaptureBody {
    fn drop(&mut self) {
        // client went away or the server never polled the body
        self.complete();
    }
}

impl CapturedResponse {
    /// Already-known body, for responses that never went through a [`CaptureBody`]
    pub fn ready(body: Bytes) -> Self {
        Self(Inner::Ready(body))
    }

    /// Wait for the body to finish and return everything it yielded
    pub async fn collect(self) -> Bytes {
        match self.0 {
            Inner::Pending(rx) => rx.await.unwrap_or_default(),
            Inner::Ready(body) => body,
        }
    }
}
