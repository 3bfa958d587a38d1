//! Shared utilities for the end-to-end tests.

use flate2::Compression as Level;
use flate2::write::{GzEncoder, ZlibEncoder};
use http_request_decompression::{MirrorServer, ServerConfig};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::io::Write;
use std::net::{Ipv4Addr, SocketAddr};

/// How a test client compresses its request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Deflate,
    None,
}

impl Compression {
    pub const ALL: [Compression; 3] = [Compression::Gzip, Compression::Deflate, Compression::None];

    /// The Content-Encoding header to send. Uncompressed bodies declare an
    /// empty encoding.
    pub fn header_value(self) -> &'static str {
        match self {
            Compression::Gzip => "gzip",
            Compression::Deflate => "deflate",
            Compression::None => "",
        }
    }

    pub fn compress(self, payload: &str) -> Vec<u8> {
        match self {
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Level::default());
                encoder.write_all(payload.as_bytes()).unwrap();
                encoder.finish().unwrap()
            }
            Compression::Deflate => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Level::default());
                encoder.write_all(payload.as_bytes()).unwrap();
                encoder.finish().unwrap()
            }
            Compression::None => payload.as_bytes().to_vec(),
        }
    }
}

pub fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Starts a mirror server on a free loopback port.
pub async fn start_server(config: ServerConfig) -> MirrorServer {
    MirrorServer::bind(config.addr(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))))
        .await
        .unwrap()
}

/// Posts `body` to the server, declaring `compression` as its encoding.
pub async fn post(
    client: &reqwest::Client,
    server: &MirrorServer,
    compression: Compression,
    body: Vec<u8>,
) -> reqwest::Result<reqwest::Response> {
    client
        .post(server.uri().to_string())
        .header("content-type", "text/plain; charset=utf-8")
        .header("content-encoding", compression.header_value())
        .body(body)
        .send()
        .await
}
