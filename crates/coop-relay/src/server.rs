//! `RelayServer` builder and accept loop.
//!
//! This is the entry point for running a relay. It ties the layers
//! together: transport → framing → router → rooms → writers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use coop_relay_protocol::{ClientId, JsonCodec};
use coop_relay_transport::{TcpTransport, Transport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{RelayError, Registry, ServerConfig};

/// Shared server state passed to each connection handler task.
///
/// Clients and rooms live behind one lock so membership changes and
/// room creation are atomic with respect to every other connection.
pub(crate) struct ServerState {
    pub(crate) registry: Mutex<Registry>,
    pub(crate) codec: JsonCodec,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a relay server.
///
/// # Example
///
/// ```rust,no_run
/// use coop_relay::prelude::*;
///
/// # async fn run() -> Result<(), RelayError> {
/// let server = RelayServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RelayServerBuilder {
    bind_addr: String,
    config: ServerConfig,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Replaces the whole server configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets how long a single write may take.
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.config.send_timeout = timeout;
        self
    }

    /// Sets how many bytes each socket read may return.
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Binds the listener and builds the server.
    pub async fn build(self) -> Result<RelayServer, RelayError> {
        let transport = TcpTransport::bind(&self.bind_addr)
            .await?
            .with_read_buffer_size(self.config.read_buffer_size);

        let state = Arc::new(ServerState {
            registry: Mutex::new(Registry::new()),
            codec: JsonCodec,
            config: self.config,
        });

        Ok(RelayServer { transport, state })
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound relay server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RelayServer {
    transport: TcpTransport,
    state: Arc<ServerState>,
}

impl RelayServer {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.transport.local_addr()?)
    }

    /// The configuration this server runs with.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Returns a handle for inspecting the server while it runs.
    pub fn handle(&self) -> RelayHandle {
        RelayHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Runs the accept loop.
    ///
    /// Spawns a handler task for every accepted connection. A failed
    /// accept is logged and the loop carries on; it only ends when the
    /// process does.
    pub async fn run(mut self) -> Result<(), RelayError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "relay server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Read-only view of a running server's clients and rooms.
///
/// Cheap to clone. Every call takes the registry lock briefly.
#[derive(Clone)]
pub struct RelayHandle {
    state: Arc<ServerState>,
}

impl RelayHandle {
    /// Number of connected clients.
    pub async fn client_count(&self) -> usize {
        self.state.registry.lock().await.clients().len()
    }

    /// Number of rooms created so far.
    pub async fn room_count(&self) -> usize {
        self.state.registry.lock().await.rooms().room_count()
    }

    /// Members of the room called `name`, in join order.
    pub async fn room_members(&self, name: &str) -> Option<Vec<ClientId>> {
        self.state
            .registry
            .lock()
            .await
            .room_by_name(name)
            .map(|room| room.member_ids())
    }

    /// Clients waiting for a save state in the room called `name`.
    pub async fn pending_save_state_requests(&self, name: &str) -> Option<Vec<ClientId>> {
        self.state
            .registry
            .lock()
            .await
            .room_by_name(name)
            .map(|room| room.pending_ids())
    }
}
