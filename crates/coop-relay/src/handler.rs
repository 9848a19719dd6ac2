//! Per-connection handler: receive loop, writer task, and cleanup.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]:
//!   1. Register the client and spawn its writer task
//!   2. Loop: read a chunk → split into frames → decode → route
//!   3. Stop on EOF, a read error, or a failed write
//!   4. Deregister the client (via [`ClientGuard`])

use std::sync::Arc;
use std::time::Duration;

use coop_relay_protocol::{ClientId, FrameBuffer, Packet, decode_frame};
use coop_relay_session::{OutboundReceiver, outbound_channel};
use coop_relay_transport::{Connection, TcpConnection, TransportError};
use tokio::sync::oneshot;

use crate::router::route;
use crate::server::ServerState;
use crate::RelayError;

/// Drop guard that deregisters a client when its handler exits.
///
/// This runs even if the handler panics. `Drop` is synchronous, so the
/// async lock is taken in a fire-and-forget task.
struct ClientGuard {
    client_id: ClientId,
    state: Arc<ServerState>,
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        let client_id = self.client_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut registry = state.registry.lock().await;
            match registry.deregister(client_id) {
                Ok(_) => tracing::info!(%client_id, "client disconnected"),
                Err(e) => tracing::debug!(%client_id, error = %e, "deregister failed"),
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: TcpConnection,
    state: Arc<ServerState>,
) -> Result<(), RelayError> {
    let conn = Arc::new(conn);
    let client_id = ClientId(conn.id().into_inner());
    let peer_addr = conn.peer_addr();

    let (sender, outbound) = outbound_channel(client_id);
    state.registry.lock().await.register(sender, Some(peer_addr))?;
    let _guard = ClientGuard {
        client_id,
        state: Arc::clone(&state),
    };
    tracing::info!(%client_id, %peer_addr, "client connected");

    let send_timeout = state.config.send_timeout;
    let (failed_tx, mut failed_rx) = oneshot::channel();
    let writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        client_id,
        outbound,
        send_timeout,
        failed_tx,
    ));

    let mut frames = FrameBuffer::with_capacity(state.config.read_buffer_size);
    let mut writer_alive = true;
    let result = loop {
        tokio::select! {
            received = conn.recv() => match received {
                Ok(Some(data)) => {
                    frames.extend(&data);
                    while let Some(frame) = frames.next_frame() {
                        handle_frame(&state, client_id, &frame).await;
                    }
                }
                Ok(None) => {
                    tracing::debug!(
                        %client_id,
                        discarded = frames.pending_len(),
                        "connection closed by peer"
                    );
                    break Ok(());
                }
                Err(e) => {
                    tracing::debug!(%client_id, error = %e, "recv error");
                    break Err(RelayError::Transport(e));
                }
            },
            failure = &mut failed_rx, if writer_alive => match failure {
                Ok(e) => break Err(RelayError::Transport(e)),
                Err(_) => writer_alive = false,
            },
        }
    };

    writer.abort();
    let _ = writer.await;
    match tokio::time::timeout(send_timeout, conn.close()).await {
        Ok(Err(e)) => tracing::debug!(%client_id, error = %e, "close failed"),
        Err(_) => tracing::debug!(%client_id, "close timed out"),
        Ok(Ok(())) => {}
    }

    // _guard drops here → client deregistered.
    result
}

/// Decodes one frame and routes it. Bad frames are logged and dropped.
async fn handle_frame(state: &ServerState, client_id: ClientId, frame: &[u8]) {
    let packet: Packet = match decode_frame(&state.codec, frame) {
        Ok(packet) => packet,
        Err(e) => {
            tracing::debug!(
                %client_id,
                error = %e,
                len = frame.len(),
                "discarding undecodable frame"
            );
            return;
        }
    };
    tracing::debug!(%client_id, packet_type = packet.type_name(), "packet received");

    let mut registry = state.registry.lock().await;
    if let Err(e) = route(&mut registry, &state.codec, client_id, packet) {
        tracing::debug!(%client_id, error = %e, "routing failed");
    }
}

/// Drains a client's outbound channel onto its socket, one frame at a
/// time. Reports the first failed or timed-out write and stops.
async fn write_loop(
    conn: Arc<TcpConnection>,
    client_id: ClientId,
    mut outbound: OutboundReceiver,
    send_timeout: Duration,
    failed: oneshot::Sender<TransportError>,
) {
    while let Some(frame) = outbound.recv().await {
        let result = match tokio::time::timeout(send_timeout, conn.send(&frame)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::SendTimedOut(send_timeout)),
        };
        if let Err(e) = result {
            tracing::warn!(%client_id, error = %e, "send failed, disconnecting client");
            let _ = failed.send(e);
            return;
        }
    }
}
