//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt Registry, Zugangspruefung und Limits als Arc-Referenz, die sicher
//! zwischen allen Verbindungs-Tasks geteilt wird.

use std::sync::Arc;

use autotest_protocol::wire::DEFAULT_MAX_FRAME_SIZE;

use crate::registry::{TaskRegistry, Zugangspruefung};

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Anzeigename des Servers (nur fuer Logs)
    pub server_name: String,
    /// Maximale gleichzeitige Verbindungen
    pub max_verbindungen: usize,
    /// Maximale Frame-Groesse in Bytes
    pub max_frame_bytes: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            server_name: "Cloud-Autotest Server".to_string(),
            max_verbindungen: 256,
            max_frame_bytes: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Geteilter Zustand aller Verbindungen
pub struct SignalingState {
    pub config: SignalingConfig,
    pub registry: TaskRegistry,
    pub zugang: Arc<dyn Zugangspruefung>,
}

impl SignalingState {
    pub fn neu(
        config: SignalingConfig,
        registry: TaskRegistry,
        zugang: Arc<dyn Zugangspruefung>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry,
            zugang,
        })
    }
}
