//! Nutzdaten der einzelnen Ereignisse
//!
//! Jede Struktur entspricht dem `data`-Feld eines Frames. Feldnamen folgen
//! dem camelCase des bestehenden Draht-Formats (`taskId`, `workerId`, ...).

use std::collections::BTreeMap;

use autotest_core::{InputId, WorkerId};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Liest ein Textfeld aus beliebigem JSON
///
/// Nicht-Strings werden zu ihrer JSON-Darstellung (`5` -> `"5"`), `null`
/// zaehlt als fehlend. So landet ein falsch getyptes Feld bei der
/// fachlichen Pruefung statt am Decoder zu scheitern.
fn als_text<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(T::from(s)),
        Some(andere) => Some(T::from(andere.to_string())),
    })
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// Handshake-Anfrage des Clients
///
/// Alle Felder sind optional, damit fehlende Angaben mit einer lesbaren
/// `drop`-Begruendung beantwortet werden koennen statt stumm verworfen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    #[serde(default, deserialize_with = "als_text", skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, deserialize_with = "als_text", skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<WorkerId>,
    /// Identitaet fuer die Allow-List-Pruefung
    #[serde(
        rename = "zId",
        default,
        deserialize_with = "als_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub z_id: Option<String>,
    /// Rollen-Marker: "tester" (Standard), "api" oder "admin"
    #[serde(default, deserialize_with = "als_text", skip_serializing_if = "Option::is_none")]
    pub worker_type: Option<String>,
}

/// Handshake-Bestaetigung mit der zugewiesenen Worker-ID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub worker_id: WorkerId,
}

/// Verbindungsabbruch mit Begruendung
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropReason {
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Text-Nachrichten (error, message, stdin, stdout)
// ---------------------------------------------------------------------------

/// Einfache Textnachricht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMessage {
    pub message: String,
}

impl TextMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Prozess-Signale (appterm, appkill)
// ---------------------------------------------------------------------------

/// Beendigungs- oder Kill-Signal des externen Prozess-Runners
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSignal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<WorkerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Bewertung
// ---------------------------------------------------------------------------

/// Ergebnisbericht einer Runde
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundReport {
    /// Anzahl aller abgegebenen Stimmen fuer diese Eingabe
    pub total: usize,
    /// Anzahl der Stimmen mit identischer Ausgabe
    pub sameoutput: usize,
    /// `sameoutput / total`
    pub similarity: f64,
    /// Die eigene Ausgabe des Workers
    pub output: String,
    /// Die Eingabe dieser Runde
    pub input: String,
    pub input_id: InputId,
    /// Rundenindex (0-basiert)
    pub test_number: usize,
    /// Ausgabe -> Worker-IDs, die diese Ausgabe produziert haben
    pub all_outputs: BTreeMap<String, Vec<WorkerId>>,
}

// ---------------------------------------------------------------------------
// Admin-Steuerung
// ---------------------------------------------------------------------------

/// Admin-Befehl (ungeparst, Validierung erfolgt in der Grading-Engine)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminControl {
    #[serde(default, deserialize_with = "als_text", skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, deserialize_with = "als_text", skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<WorkerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Fortschritt>,
}

/// Wert von `admin-control.progress`
///
/// Alles ausser einer ganzen Zahl bleibt als `Ungueltig` erhalten, damit
/// der Befehl mit `error` beantwortet werden kann.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fortschritt {
    Zahl(i64),
    Ungueltig(Value),
}

impl From<i64> for Fortschritt {
    fn from(zahl: i64) -> Self {
        Fortschritt::Zahl(zahl)
    }
}

/// Vollstaendiger Schnappschuss des Aufgaben-Zustands
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub worker_progress: BTreeMap<WorkerId, usize>,
    pub input_id_to_input: BTreeMap<InputId, String>,
    pub input_id_to_output_to_worker_ids: BTreeMap<InputId, BTreeMap<String, Vec<WorkerId>>>,
    pub worker_id_to_input_id_to_output: BTreeMap<WorkerId, BTreeMap<InputId, String>>,
    pub input_id_in_order: Vec<InputId>,
}

impl StatisticsSnapshot {
    /// True wenn alle fuenf Felder leer sind
    pub fn ist_leer(&self) -> bool {
        self.worker_progress.is_empty()
            && self.input_id_to_input.is_empty()
            && self.input_id_to_output_to_worker_ids.is_empty()
            && self.worker_id_to_input_id_to_output.is_empty()
            && self.input_id_in_order.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Abfrage-API
// ---------------------------------------------------------------------------

/// Anfrage einer gespeicherten Eingabe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetInputById {
    #[serde(default, deserialize_with = "als_text", skip_serializing_if = "Option::is_none")]
    pub input_id: Option<InputId>,
}

/// Antwort auf `get-input-by-id`; `None` wird explizit als `null` gesendet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputPayload {
    #[serde(default)]
    pub input: Option<String>,
}
