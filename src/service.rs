use crate::body::DecompressionBody;
use crate::codec::Codec;
use crate::hook::{PostDecode, StripContentLength};
use http::{Request, header};
use std::task::{Context, Poll};
use tower::Service;

/// A Tower service that decompresses HTTP request bodies.
#[derive(Debug, Clone)]
pub struct DecompressionService<S, H = StripContentLength> {
    inner: S,
    hook: H,
}

impl<S, H> DecompressionService<S, H> {
    /// Creates a new decompression service wrapping the given inner service.
    pub fn new(inner: S, hook: H) -> Self {
        Self { inner, hook }
    }

    /// Returns a reference to the inner service.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns a mutable reference to the inner service.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consumes this service, returning the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, H, ReqBody> Service<Request<ReqBody>> for DecompressionService<S, H>
where
    S: Service<Request<DecompressionBody<ReqBody>>>,
    H: PostDecode,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let req = decode_request(req, &self.hook);
        self.inner.call(req)
    }
}

/// Wraps the request body with a decoder if the declared encoding is supported,
/// then runs the post-decode hook.
fn decode_request<B, H: PostDecode>(req: Request<B>, hook: &H) -> Request<DecompressionBody<B>> {
    let (mut parts, body) = req.into_parts();

    let encoding_before = parts.headers.get(header::CONTENT_ENCODING).cloned();
    let codec = encoding_before
        .as_ref()
        .and_then(|v| v.to_str().ok())
        .and_then(Codec::from_content_encoding);

    let body = if let Some(codec) = codec {
        // The body handed on is no longer encoded
        parts.headers.remove(header::CONTENT_ENCODING);
        DecompressionBody::decoded(body, codec)
    } else {
        DecompressionBody::passthrough(body)
    };

    hook.post_decode(&mut parts.headers, encoding_before.as_ref());

    Request::from_parts(parts, body)
}
