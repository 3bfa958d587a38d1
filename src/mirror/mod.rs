//! A service that echoes request bodies back as responses.
//!
//! The response mirrors the request's `Content-Type` (charset included) and
//! `Content-Length`, and its body is a byte-for-byte copy of the request body.
//! Paired with [`DecompressionLayer`](crate::DecompressionLayer) it shows
//! whether a decoded body survives the trip intact.

mod body;
mod future;
mod observer;

pub use body::MirrorBody;
pub use future::MirrorFuture;
pub use observer::{CopyObserver, NoopObserver, TracingObserver};

use crate::error::BoxError;
use http::{HeaderMap, Request, Response, StatusCode, header, response};
use http_body::Body;
use http_body_util::BodyExt;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

/// A Tower service that mirrors the request body into the response.
#[derive(Clone)]
pub struct MirrorService {
    buffer_size: usize,
    observer: Arc<dyn CopyObserver>,
}

impl MirrorService {
    /// Creates a mirror service.
    ///
    /// A `buffer_size` of zero reads the entire body into memory before
    /// responding. Any other value copies the body through a reusable buffer
    /// of that many bytes while the response is written.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Sets the observer notified of copy progress.
    pub fn observer<O: CopyObserver + 'static>(mut self, observer: O) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Returns the configured copy buffer size.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

impl fmt::Debug for MirrorService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MirrorService")
            .field("buffer_size", &self.buffer_size)
            .finish_non_exhaustive()
    }
}

impl<B> Service<Request<B>> for MirrorService
where
    B: Body,
    B::Error: Into<BoxError>,
{
    type Response = Response<MirrorBody<B>>;
    type Error = Infallible;
    type Future = MirrorFuture<B>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        tracing::info!(
            method = %req.method(),
            uri = %req.uri(),
            buffer_size = self.buffer_size,
            "mirroring request"
        );

        let (parts, body) = req.into_parts();
        let head = mirrored_head(&parts.headers);

        if self.buffer_size == 0 {
            MirrorFuture::collecting(body.collect(), head, self.observer.clone())
        } else {
            let body = MirrorBody::streamed(body, self.buffer_size, self.observer.clone());
            MirrorFuture::ready(Response::from_parts(head, body))
        }
    }
}

/// Builds the response head from the request headers.
fn mirrored_head(request_headers: &HeaderMap) -> response::Parts {
    let (mut head, ()) = Response::new(()).into_parts();
    head.status = StatusCode::OK;

    for name in [header::CONTENT_TYPE, header::CONTENT_LENGTH] {
        if let Some(value) = request_headers.get(&name) {
            head.headers.insert(name, value.clone());
        }
    }

    head
}
