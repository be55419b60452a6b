//! Sitzungsrollen einer Verbindung
//!
//! Nach erfolgreichem `hello` wird genau eine Rolle an die Verbindung
//! gebunden. Jede Rolle registriert ihre eigenen Handler.

pub mod admin_handler;
pub mod api_handler;
pub mod runner_handler;

use std::sync::Arc;

pub use admin_handler::AdminSession;
pub use api_handler::TaskApi;
pub use runner_handler::{RundenPhase, TaskRunner};

/// Die an eine Verbindung gebundene Rolle
#[derive(Debug, Clone)]
pub enum SessionRolle {
    Runner(Arc<TaskRunner>),
    Api(Arc<TaskApi>),
    Admin(Arc<AdminSession>),
}

/// Rollen-Marker aus `hello.workerType`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollenArt {
    Tester,
    Api,
    Admin,
}

impl RollenArt {
    /// Fehlender Marker bedeutet `tester`
    pub fn aus_marker(marker: Option<&str>) -> Option<Self> {
        match marker {
            None | Some("tester") => Some(Self::Tester),
            Some("api") => Some(Self::Api),
            Some("admin") => Some(Self::Admin),
            Some(_) => None,
        }
    }
}
