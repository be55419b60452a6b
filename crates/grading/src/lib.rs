//! autotest-grading – Konsens-basierte Bewertungs-Engine
//!
//! Ohne Musterloesung: eine Ausgabe gilt als korrekt, wenn die Mehrheit
//! aller Worker fuer dieselbe Eingabe dieselbe Ausgabe produziert hat.
//!
//! - [`Task`]: Eingaben, Stimmen und Fortschritt einer Uebung
//! - [`InputGenerator`]: austauschbare Eingabe-Rezepte
//! - [`admin`]: Steuerbefehle (Fortschritt, Loeschen, Statistik)

pub mod admin;
pub mod courses;
pub mod error;
pub mod generator;
pub mod task;

pub use admin::{admin_control_beantworten, AdminBefehl};
pub use error::{GradingError, GradingResult};
pub use generator::InputGenerator;
pub use task::{Abstimmung, Ausgaben, Runde, Task, KONSENS_SCHWELLE};
