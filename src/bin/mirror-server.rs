//! Serves the mirror endpoint behind the request decompression layer.
//!
//! ```text
//! mirror-server --port 8080 --buffer-size 8192
//! curl --data-binary @body.gz -H 'Content-Encoding: gzip' http://localhost:8080/
//! ```

use clap::Parser;
use http_request_decompression::server::DEFAULT_MAX_CONNECTIONS;
use http_request_decompression::{MirrorServer, ServerConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(version, about = "Echo HTTP request bodies after decompressing them")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    host: IpAddr,

    /// Port to listen on, 0 picks a free one.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Copy buffer size in bytes, 0 reads each body into memory at once.
    #[arg(long, default_value_t = 0)]
    buffer_size: usize,

    /// Runtime worker threads.
    #[arg(long, default_value_t = 10)]
    workers: usize,

    /// Connections served at once.
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    max_connections: usize,

    /// Keep the compressed Content-Length on decoded requests.
    #[arg(long)]
    keep_stale_content_length: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "http_request_decompression=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(args.workers.max(1))
        .thread_name("mirror-worker")
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let config = ServerConfig::new()
            .addr(SocketAddr::new(args.host, args.port))
            .buffer_size(args.buffer_size)
            .max_connections(args.max_connections)
            .strip_stale_content_length(!args.keep_stale_content_length);

        let server = MirrorServer::bind(config).await?;
        tracing::info!(uri = %server.uri(), "ready");

        tokio::signal::ctrl_c().await?;
        tracing::info!("shutting down");
        server.shutdown().await;

        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
