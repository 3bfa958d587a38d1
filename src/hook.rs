use http::header::{self, HeaderMap, HeaderValue};

/// A hook run on the request headers right after the decoding step.
///
/// `encoding_before` is the `Content-Encoding` value the request arrived with.
/// If it is `Some` and the header is now absent, the body is being decoded and
/// any length header still describes the compressed payload.
pub trait PostDecode {
    /// Adjusts the request headers after decoding was set up.
    fn post_decode(&self, headers: &mut HeaderMap, encoding_before: Option<&HeaderValue>);
}

/// Removes `Content-Length` once a request body is being decoded.
///
/// Consumers that size a read buffer from `Content-Length` would otherwise stop
/// at the compressed size and truncate the decoded body. The header is removed
/// rather than recomputed, since the decoded size is unknown until the whole
/// body has been read.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripContentLength;

impl PostDecode for StripContentLength {
    fn post_decode(&self, headers: &mut HeaderMap, encoding_before: Option<&HeaderValue>) {
        if encoding_before.is_none() || headers.contains_key(header::CONTENT_ENCODING) {
            return;
        }

        if let Some(length) = headers.remove(header::CONTENT_LENGTH) {
            tracing::debug!(
                compressed_length = ?length,
                encoding = ?encoding_before,
                "removed stale content-length from decoded request"
            );
        }
    }
}

/// Leaves the headers untouched, so a decoded request keeps the compressed
/// `Content-Length`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepContentLength;

impl PostDecode for KeepContentLength {
    fn post_decode(&self, _headers: &mut HeaderMap, _encoding_before: Option<&HeaderValue>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers<I>(entries: I) -> HeaderMap
    where
        I: IntoIterator<Item = (&'static str, &'static str)>,
    {
        let mut headers = HeaderMap::new();
        for (name, value) in entries {
            headers.insert(name, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn test_strip_when_encoding_cleared() {
        let mut map = headers([("content-length", "42"), ("content-type", "text/plain")]);
        let before = HeaderValue::from_static("gzip");

        StripContentLength.post_decode(&mut map, Some(&before));

        assert!(map.get(header::CONTENT_LENGTH).is_none());
        assert_eq!(map.get(header::CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn test_keep_when_no_encoding_declared() {
        let mut map = headers([("content-length", "42")]);

        StripContentLength.post_decode(&mut map, None);

        assert_eq!(map.get(header::CONTENT_LENGTH).unwrap(), "42");
    }

    #[test]
    fn test_keep_when_encoding_not_decoded() {
        // Unsupported codings leave Content-Encoding in place
        let mut map = headers([("content-length", "42"), ("content-encoding", "br")]);
        let before = HeaderValue::from_static("br");

        StripContentLength.post_decode(&mut map, Some(&before));

        assert_eq!(map.get(header::CONTENT_LENGTH).unwrap(), "42");
    }

    #[test]
    fn test_strip_without_length_header() {
        let mut map = HeaderMap::new();
        let before = HeaderValue::from_static("deflate");

        StripContentLength.post_decode(&mut map, Some(&before));

        assert!(map.is_empty());
    }

    #[test]
    fn test_keep_content_length_is_noop() {
        let mut map = headers([("content-length", "42")]);
        let before = HeaderValue::from_static("gzip");

        KeepContentLength.post_decode(&mut map, Some(&before));

        assert_eq!(map.get(header::CONTENT_LENGTH).unwrap(), "42");
    }
}
