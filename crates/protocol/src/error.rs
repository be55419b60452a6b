//! Fehlertypen fuer das Draht-Protokoll

use thiserror::Error;

/// Fehler beim Kodieren oder Dekodieren eines Frames
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// IO-Fehler des darunterliegenden Transports
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Frame ist kein gueltiges JSON oder passt nicht zur erwarteten Form
    #[error("Ungueltiges Frame: {0}")]
    Json(#[from] serde_json::Error),

    /// Unbekannter Ereignisname im `type`-Feld
    #[error("Unbekannter Ereignistyp: {0}")]
    UnbekannterTyp(String),

    /// Frame ueberschreitet die konfigurierte Maximalgroesse
    #[error("Frame zu gross: {groesse} Bytes (Maximum: {maximum} Bytes)")]
    FrameZuGross { groesse: usize, maximum: usize },

    /// Lokale Ereignisse (z.B. `disconnect`) werden nie uebertragen
    #[error("Lokales Ereignis kann nicht gesendet werden: {0}")]
    LokalesEreignis(&'static str),
}

/// Result-Typ fuer das Protokoll-Crate
pub type ProtocolResult<T> = Result<T, ProtocolError>;
