use crate::hook::{PostDecode, StripContentLength};
use crate::service::DecompressionService;
use tower::Layer;

/// A Tower layer that decompresses HTTP request bodies.
///
/// This layer wraps services and transparently decodes request bodies sent
/// with a supported `Content-Encoding`, then runs a [`PostDecode`] hook on the
/// request headers.
#[derive(Debug, Clone)]
pub struct DecompressionLayer<H = StripContentLength> {
    hook: H,
}

impl DecompressionLayer {
    /// Creates a new decompression layer with default settings.
    ///
    /// By default a stale `Content-Length` is removed from decoded requests.
    pub fn new() -> Self {
        Self {
            hook: StripContentLength,
        }
    }
}

impl<H> DecompressionLayer<H> {
    /// Sets the hook that runs after the decoding step.
    pub fn post_decode<T: PostDecode>(self, hook: T) -> DecompressionLayer<T> {
        DecompressionLayer { hook }
    }
}

impl Default for DecompressionLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, H: Clone> Layer<S> for DecompressionLayer<H> {
    type Service = DecompressionService<S, H>;

    fn layer(&self, inner: S) -> Self::Service {
        DecompressionService::new(inner, self.hook.clone())
    }
}
