use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use coop_relay::{RelayError, RelayServer, ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "coop-relay-server", about = "Room-based packet relay for co-op games")]
struct Cli {
    /// IP address to listen on (IPv4 or IPv6).
    #[arg(long, env = "RELAY_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// TCP port to listen on.
    #[arg(long, env = "RELAY_PORT", default_value_t = 8080)]
    port: u16,

    /// Seconds a single write may take before the client is dropped.
    #[arg(long, env = "RELAY_SEND_TIMEOUT_SECS", default_value_t = 30)]
    send_timeout_secs: u64,

    /// Bytes read from a socket per receive.
    #[arg(long, env = "RELAY_READ_BUFFER_SIZE", default_value_t = 1024)]
    read_buffer_size: usize,

    /// Log filter, in `RUST_LOG` syntax.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log: String,
}

impl Cli {
    fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            send_timeout: Duration::from_secs(self.send_timeout_secs),
            read_buffer_size: self.read_buffer_size,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let server = RelayServer::builder()
        .bind(cli.bind_addr().to_string())
        .config(cli.server_config())
        .build()
        .await?;
    tracing::info!(
        addr = %server.local_addr()?,
        send_timeout = ?server.config().send_timeout,
        read_buffer_size = server.config().read_buffer_size,
        "listening"
    );

    server.run().await
}
