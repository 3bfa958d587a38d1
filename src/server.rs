//! A small HTTP server mirroring decoded request bodies.
//!
//! The server composes [`DecompressionLayer`] in front of [`MirrorService`] and
//! serves every accepted connection with hyper, over HTTP/1.1 or h2c.

use crate::error::{BoxError, Error};
use crate::hook::KeepContentLength;
use crate::layer::DecompressionLayer;
use crate::mirror::{MirrorService, TracingObserver};
use http::{Request, Response, Uri};
use http_body::Body;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, oneshot};
use tokio::task::JoinHandle;
use tower::{Service, ServiceBuilder};

/// Default bound on concurrently served connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 100;

/// Configuration of a [`MirrorServer`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    addr: SocketAddr,
    buffer_size: usize,
    max_connections: usize,
    strip_stale_content_length: bool,
}

impl ServerConfig {
    /// Creates a configuration listening on all interfaces on an ephemeral port.
    pub fn new() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            buffer_size: 0,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            strip_stale_content_length: true,
        }
    }

    /// Sets the address to listen on.
    pub fn addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Sets the port to listen on, keeping the host.
    pub fn port(mut self, port: u16) -> Self {
        self.addr.set_port(port);
        self
    }

    /// Sets the mirror's copy buffer size, zero meaning a bulk read.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Sets the maximum number of connections served at once.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max.max(1);
        self
    }

    /// Sets whether a stale `Content-Length` is removed from decoded requests.
    ///
    /// Disabling this reproduces the truncation of decoded bodies.
    pub fn strip_stale_content_length(mut self, enabled: bool) -> Self {
        self.strip_stale_content_length = enabled;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A running mirror server.
///
/// The accept loop stops when the server is shut down or dropped.
/// Connections already being served run to completion.
#[derive(Debug)]
pub struct MirrorServer {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MirrorServer {
    /// Binds the listener and starts accepting connections.
    pub async fn bind(config: ServerConfig) -> Result<Self, Error> {
        let listener = TcpListener::bind(config.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            address = %local_addr,
            buffer_size = config.buffer_size,
            max_connections = config.max_connections,
            strip_stale_content_length = config.strip_stale_content_length,
            "mirror server listening"
        );

        let mirror = MirrorService::new(config.buffer_size).observer(TracingObserver);
        let limit = Arc::new(Semaphore::new(config.max_connections));
        let (shutdown, shutdown_rx) = oneshot::channel();

        let task = if config.strip_stale_content_length {
            let service = ServiceBuilder::new()
                .layer(DecompressionLayer::new())
                .service(mirror);
            tokio::spawn(accept_loop(listener, service, limit, shutdown_rx))
        } else {
            let service = ServiceBuilder::new()
                .layer(DecompressionLayer::new().post_decode(KeepContentLength))
                .service(mirror);
            tokio::spawn(accept_loop(listener, service, limit, shutdown_rx))
        };

        Ok(Self {
            local_addr,
            shutdown: Some(shutdown),
            task: Some(task),
        })
    }

    /// Returns the address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the port the server is bound to.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns a URI clients can reach the server at.
    ///
    /// An unspecified bind address is replaced by the loopback address.
    pub fn uri(&self) -> Uri {
        let addr = match self.local_addr {
            SocketAddr::V4(addr) if addr.ip().is_unspecified() => {
                SocketAddr::from((Ipv4Addr::LOCALHOST, addr.port()))
            }
            SocketAddr::V6(addr) if addr.ip().is_unspecified() => {
                SocketAddr::from((Ipv6Addr::LOCALHOST, addr.port()))
            }
            addr => addr,
        };

        Uri::builder()
            .scheme("http")
            .authority(addr.to_string())
            .path_and_query("/")
            .build()
            .expect("socket address is a valid URI authority")
    }

    /// Stops accepting connections and waits for the accept loop to exit.
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "accept loop ended abnormally");
            }
        }
    }
}

impl Drop for MirrorServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn accept_loop<S, ResBody>(
    listener: TcpListener,
    service: S,
    limit: Arc<Semaphore>,
    mut shutdown: oneshot::Receiver<()>,
) where
    S: Service<Request<Incoming>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    ResBody: Body + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Into<BoxError>,
{
    loop {
        // Wait for a free slot before accepting
        let permit = tokio::select! {
            _ = &mut shutdown => break,
            permit = limit.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let (stream, peer) = tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to accept connection");
                    continue;
                }
            },
        };

        tracing::debug!(
            peer_addr = %peer,
            available_permits = limit.available_permits(),
            "connection accepted"
        );

        let service = TowerToHyperService::new(service.clone());
        tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(peer_addr = %peer, error = %e, "connection closed with error");
            }
        });
    }

    tracing::info!("mirror server stopped accepting connections");
}
