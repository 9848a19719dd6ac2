//! Server configuration.

use std::time::Duration;

use coop_relay_transport::DEFAULT_READ_BUFFER_SIZE;
use serde::{Deserialize, Serialize};

/// Tunables for a relay server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// How long a single write to a client may take before the client is
    /// disconnected.
    pub send_timeout: Duration,

    /// How many bytes each socket read may return.
    pub read_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(30),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}
