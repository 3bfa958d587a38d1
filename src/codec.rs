use compression_codecs::DecodeV2;
#[cfg(feature = "gzip")]
use compression_codecs::gzip::GzipDecoder;
#[cfg(feature = "deflate")]
use compression_codecs::zlib::ZlibDecoder;

/// Supported request content codings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Gzip compression.
    #[cfg(feature = "gzip")]
    Gzip,
    /// Deflate compression (zlib-wrapped, as HTTP defines it).
    #[cfg(feature = "deflate")]
    Deflate,
}

impl Codec {
    /// Returns the Content-Encoding header value for this codec.
    pub fn content_encoding(&self) -> &'static str {
        match *self {
            #[cfg(feature = "gzip")]
            Codec::Gzip => "gzip",
            #[cfg(feature = "deflate")]
            Codec::Deflate => "deflate",
        }
    }

    /// Creates a new decoder for this codec.
    pub fn decoder(&self) -> Box<dyn DecodeV2 + Send> {
        match *self {
            #[cfg(feature = "gzip")]
            Codec::Gzip => Box::new(GzipDecoder::new()),
            #[cfg(feature = "deflate")]
            Codec::Deflate => Box::new(ZlibDecoder::new()),
        }
    }

    /// Parses a Content-Encoding header value.
    ///
    /// Only a single coding is understood. `identity`, an empty value, lists of
    /// codings and unknown codings all return `None`, meaning the body is left
    /// as it is.
    pub fn from_content_encoding(header: &str) -> Option<Codec> {
        let encoding = header.trim();
        if encoding.contains(',') {
            return None;
        }

        #[cfg(feature = "gzip")]
        if encoding.eq_ignore_ascii_case("gzip") || encoding.eq_ignore_ascii_case("x-gzip") {
            return Some(Codec::Gzip);
        }

        #[cfg(feature = "deflate")]
        if encoding.eq_ignore_ascii_case("deflate") {
            return Some(Codec::Deflate);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(all(feature = "gzip", feature = "deflate"))]
    fn test_content_encoding() {
        assert_eq!(Codec::Gzip.content_encoding(), "gzip");
        assert_eq!(Codec::Deflate.content_encoding(), "deflate");
    }

    #[test]
    #[cfg(all(feature = "gzip", feature = "deflate"))]
    fn test_from_content_encoding_simple() {
        assert_eq!(Codec::from_content_encoding("gzip"), Some(Codec::Gzip));
        assert_eq!(Codec::from_content_encoding("x-gzip"), Some(Codec::Gzip));
        assert_eq!(Codec::from_content_encoding("deflate"), Some(Codec::Deflate));
    }

    #[test]
    #[cfg(feature = "gzip")]
    fn test_from_content_encoding_case_and_whitespace() {
        assert_eq!(Codec::from_content_encoding(" GZip "), Some(Codec::Gzip));
    }

    #[test]
    fn test_from_content_encoding_identity() {
        assert_eq!(Codec::from_content_encoding(""), None);
        assert_eq!(Codec::from_content_encoding("identity"), None);
    }

    #[test]
    fn test_from_content_encoding_unsupported() {
        assert_eq!(Codec::from_content_encoding("br"), None);
        assert_eq!(Codec::from_content_encoding("compress"), None);
        assert_eq!(Codec::from_content_encoding("gzip, br"), None);
    }
}
