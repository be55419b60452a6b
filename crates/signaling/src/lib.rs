//! autotest-signaling – Verbindungs- und Session-Schicht
//!
//! Dieser Crate implementiert den ereignisbasierten Kanal zwischen Server
//! und Test-Runnern, den `hello`-Handshake und die drei Sitzungsrollen.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (AutotestServer)
//!     |
//!     v
//! Connection (Lese-Task + Schreib-Task pro Verbindung)
//!     |  Dispatch: Warte-Slot -> Handler -> Replay-Puffer
//!     |
//!     v
//! HandshakeDispatcher (hello -> ack | drop)
//!     |
//!     +-- TaskRunner    (stdin/eof, stdout, appterm, appkill)
//!     +-- TaskApi       (get-input-by-id)
//!     +-- AdminSession  (admin-control)
//!
//! TaskRegistry  – Aufgaben nach taskId
//! AllowList     – zugelassene zIds
//! ```

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use connection::{Connection, EventWaiter, HandlerId};
pub use dispatcher::{HandshakeDispatcher, Sitzung};
pub use error::{ConnectionError, SignalingError, SignalingResult};
pub use handlers::{AdminSession, RollenArt, RundenPhase, SessionRolle, TaskApi, TaskRunner};
pub use registry::{AllowList, TaskRegistry, Zugangspruefung};
pub use server_state::{SignalingConfig, SignalingState};
pub use tcp::AutotestServer;
