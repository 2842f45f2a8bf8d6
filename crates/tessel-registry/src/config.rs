//! Registry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where the registry listens and how long it waits.
///
/// Addresses use port 0 by default so every process picks a free
/// ephemeral port. An unspecified host (`0.0.0.0`) is advertised to
/// peers as loopback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Bind address of the directory (used on rank 0 only).
    pub directory_addr: String,
    /// Bind address of this process's object server.
    pub object_addr: String,
    /// Bound on every directory request, remote call, and bootstrap
    /// wait, in milliseconds.
    pub timeout_ms: u64,
}

impl RegistryConfig {
    /// [`timeout_ms`](Self::timeout_ms) as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            directory_addr: "127.0.0.1:0".into(),
            object_addr: "127.0.0.1:0".into(),
            timeout_ms: 5_000,
        }
    }
}
