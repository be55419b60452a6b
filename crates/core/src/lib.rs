//! autotest-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Cloud-Autotest-Crates gemeinsam genutzt werden.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{AutotestError, Result};
pub use types::{zufalls_token, InputId, TaskId, WorkerId};
