use http::StatusCode;
use std::io;
use thiserror::Error;

/// Boxed error type accepted from inner bodies and services.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced while decoding or mirroring a request body.
#[derive(Debug, Error)]
pub enum Error {
    /// The compressed request body could not be decoded.
    #[error("failed to decode {encoding} request body: {source}")]
    Decode {
        /// The `Content-Encoding` the body was declared with.
        encoding: &'static str,
        /// The decoder's failure.
        #[source]
        source: io::Error,
    },

    /// The inner body failed to yield a frame.
    #[error("failed to read request body: {0}")]
    Body(#[source] BoxError),

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Converts an error coming out of a body layer.
    ///
    /// Errors produced by this crate are recovered from the box, so a decode
    /// failure stays a decode failure after crossing another body wrapper.
    pub fn from_body(err: impl Into<BoxError>) -> Self {
        match err.into().downcast::<Error>() {
            Ok(err) => *err,
            Err(err) => Error::Body(err),
        }
    }

    /// Returns the response status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Decode { .. } => StatusCode::BAD_REQUEST,
            Error::Body(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
