//! autotest-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Ereignisse, Nutzdaten und den Zeilen-Codec,
//! die zwischen Workern und dem Autotest-Server ausgetauscht werden.

pub mod error;
pub mod event;
pub mod payload;
pub mod wire;

pub use error::{ProtocolError, ProtocolResult};
pub use event::{Event, EventKind, Frame};
pub use payload::{
    Ack, AdminControl, AppSignal, DropReason, Fortschritt, GetInputById, Hello, InputPayload, RoundReport,
    StatisticsSnapshot, TextMessage,
};
pub use wire::LineCodec;
