//! HTTP request decompression middleware for Tower.
//!
//! This crate provides a Tower layer that transparently decodes HTTP request
//! bodies sent with `Content-Encoding: gzip` or `deflate`, and a mirror service
//! that echoes the decoded body back, which together check that a decoded body
//! reaches the application intact.
//!
//! # Example
//!
//! ```ignore
//! use http_request_decompression::{DecompressionLayer, MirrorService};
//! use tower::ServiceBuilder;
//!
//! let service = ServiceBuilder::new()
//!     .layer(DecompressionLayer::new())
//!     .service(MirrorService::new(8192));
//! ```
//!
//! # Decoding Rules
//!
//! The middleware will **not** decode requests when:
//! - No `Content-Encoding` header is present, or it is empty or `identity`
//! - `Content-Encoding` names an unsupported coding or a list of codings
//!
//! # Request Modifications
//!
//! When decoding is applied:
//! - `Content-Encoding` header is removed
//! - the [`PostDecode`] hook runs; the default [`StripContentLength`] removes
//!   `Content-Length`, which still describes the compressed body
//!
//! Consumers that size their reads from `Content-Length` would otherwise stop
//! at the compressed size and truncate the decoded body.

#![deny(missing_docs)]

mod body;
mod codec;
mod error;
mod hook;
mod layer;
pub mod mirror;
pub mod server;
mod service;

#[cfg(test)]
mod test_support;

pub use body::DecompressionBody;
pub use codec::Codec;
pub use error::{BoxError, Error};
pub use hook::{KeepContentLength, PostDecode, StripContentLength};
pub use layer::DecompressionLayer;
pub use mirror::{CopyObserver, MirrorBody, MirrorService, NoopObserver, TracingObserver};
pub use server::{MirrorServer, ServerConfig};
pub use service::DecompressionService;
