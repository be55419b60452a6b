//! Fehlertypen der Bewertungs-Engine

use autotest_core::{InputId, TaskId};
use thiserror::Error;

/// Fehler bei Operationen auf dem Aufgaben-Zustand
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradingError {
    /// Fortschritt liegt ausserhalb von `0..=max`
    #[error("Fortschritt {value} ausserhalb des gueltigen Bereichs 0..={max}")]
    OutOfRange { value: i64, max: usize },

    /// Eingabe existiert nicht (mehr), z.B. nach purge-all
    #[error("Unbekannte Eingabe: {0}")]
    UnknownInput(InputId),

    /// Keine Aufgabe mit dieser ID registriert
    #[error("Unbekannte Aufgabe: {0}")]
    UnknownTask(TaskId),
}

/// Result-Typ fuer die Bewertungs-Engine
pub type GradingResult<T> = Result<T, GradingError>;
