//! Fehlertypen fuer Cloud-Autotest
//!
//! Zentraler Fehler-Enum fuer crate-uebergreifende Fehlerzustaende beim
//! Start des Servers. Die Fach-Crates definieren eigene Fehler.

use thiserror::Error;

/// Globaler Result-Alias fuer Cloud-Autotest
pub type Result<T> = std::result::Result<T, AutotestError>;

/// Crate-uebergreifende Fehler
#[derive(Debug, Error)]
pub enum AutotestError {
    // --- Netzwerk ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AutotestError {
    /// Gibt true zurueck wenn der Fehler das Netzwerk betrifft
    pub fn ist_verbindungsfehler(&self) -> bool {
        matches!(self, Self::Verbindung(_) | Self::Io(_))
    }
}
