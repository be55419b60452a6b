//! Fehlertypen fuer den Signaling-Service

use autotest_protocol::EventKind;
use thiserror::Error;

/// Fehler einer einzelnen Verbindung
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Transport getrennt (vor oder waehrend des Wartens)
    #[error("Verbindung getrennt")]
    Disconnected,

    /// Fuer dieses Ereignis wartet bereits jemand
    #[error("Es wird bereits auf '{0}' gewartet")]
    WarteSlotBelegt(EventKind),

    /// `run()` wurde bereits aufgerufen
    #[error("Empfangsschleife laeuft bereits")]
    BereitsGestartet,

    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_fehler_ist_io_fehler() {
        let fehler: SignalingError =
            std::io::Error::new(std::io::ErrorKind::AddrInUse, "belegt").into();
        assert!(matches!(fehler, SignalingError::Io(_)));
        assert_eq!(fehler.to_string(), "IO-Fehler: belegt");
    }
}
