//! Ereignis-Vokabular des Autotest-Protokolls
//!
//! Jedes Frame auf dem Draht ist ein einzeiliges JSON-Dokument mit genau
//! zwei Feldern: `type` (Ereignisname) und `data` (Nutzdaten oder `null`).
//!
//! ## Design
//! - `Event` ist ein geschlossener Enum, ein Fall pro Ereignisname
//! - `EventKind` ist der feldlose Schluessel fuer Handler- und Warte-Tabellen
//! - Unbekannte Namen oder unpassende Nutzdaten werden abgelehnt
//! - `disconnect` existiert nur lokal und wird nie serialisiert

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};
use crate::payload::{
    Ack, AdminControl, AppSignal, DropReason, GetInputById, Hello, InputPayload, RoundReport,
    StatisticsSnapshot, TextMessage,
};

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// Ereignisname ohne Nutzdaten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Hello,
    Ack,
    Drop,
    Error,
    Message,
    Stdin,
    Eof,
    Stdout,
    AppTerm,
    AppKill,
    Report,
    AdminControl,
    Completed,
    Statistics,
    GetInputById,
    Input,
    /// Lokal synthetisiert wenn der Transport wegbricht
    Disconnect,
}

impl EventKind {
    /// Alle uebertragbaren Ereignisnamen
    pub const DRAHT: [EventKind; 16] = [
        EventKind::Hello,
        EventKind::Ack,
        EventKind::Drop,
        EventKind::Error,
        EventKind::Message,
        EventKind::Stdin,
        EventKind::Eof,
        EventKind::Stdout,
        EventKind::AppTerm,
        EventKind::AppKill,
        EventKind::Report,
        EventKind::AdminControl,
        EventKind::Completed,
        EventKind::Statistics,
        EventKind::GetInputById,
        EventKind::Input,
    ];

    /// Name auf dem Draht
    pub const fn name(self) -> &'static str {
        match self {
            EventKind::Hello => "hello",
            EventKind::Ack => "ack",
            EventKind::Drop => "drop",
            EventKind::Error => "error",
            EventKind::Message => "message",
            EventKind::Stdin => "stdin",
            EventKind::Eof => "eof",
            EventKind::Stdout => "stdout",
            EventKind::AppTerm => "appterm",
            EventKind::AppKill => "appkill",
            EventKind::Report => "report",
            EventKind::AdminControl => "admin-control",
            EventKind::Completed => "completed",
            EventKind::Statistics => "statistics",
            EventKind::GetInputById => "get-input-by-id",
            EventKind::Input => "input",
            EventKind::Disconnect => "disconnect",
        }
    }

    /// Sucht den Ereignistyp zu einem Draht-Namen
    ///
    /// `disconnect` wird nie aufgeloest, es entsteht nur lokal.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::DRAHT.iter().copied().find(|k| k.name() == name)
    }

    /// True fuer Ereignisse die nie uebertragen werden
    pub fn ist_lokal(self) -> bool {
        matches!(self, EventKind::Disconnect)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// Rohes Frame wie es auf dem Draht steht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default)]
    pub data: Value,
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Alle Ereignisse des Protokolls (typsicher)
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Hello(Hello),
    Ack(Ack),
    Drop(DropReason),
    Error(TextMessage),
    Message(TextMessage),
    Stdin(TextMessage),
    Eof,
    Stdout(TextMessage),
    AppTerm(AppSignal),
    AppKill(AppSignal),
    Report(Box<RoundReport>),
    AdminControl(AdminControl),
    Completed,
    Statistics(Box<StatisticsSnapshot>),
    GetInputById(GetInputById),
    Input(InputPayload),
    Disconnect,
}

impl Event {
    /// Ereignistyp dieses Ereignisses
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Hello(_) => EventKind::Hello,
            Event::Ack(_) => EventKind::Ack,
            Event::Drop(_) => EventKind::Drop,
            Event::Error(_) => EventKind::Error,
            Event::Message(_) => EventKind::Message,
            Event::Stdin(_) => EventKind::Stdin,
            Event::Eof => EventKind::Eof,
            Event::Stdout(_) => EventKind::Stdout,
            Event::AppTerm(_) => EventKind::AppTerm,
            Event::AppKill(_) => EventKind::AppKill,
            Event::Report(_) => EventKind::Report,
            Event::AdminControl(_) => EventKind::AdminControl,
            Event::Completed => EventKind::Completed,
            Event::Statistics(_) => EventKind::Statistics,
            Event::GetInputById(_) => EventKind::GetInputById,
            Event::Input(_) => EventKind::Input,
            Event::Disconnect => EventKind::Disconnect,
        }
    }

    // --- Konstruktoren fuer haeufige Ereignisse ---

    pub fn error(message: impl Into<String>) -> Self {
        Event::Error(TextMessage::new(message))
    }

    pub fn message(message: impl Into<String>) -> Self {
        Event::Message(TextMessage::new(message))
    }

    pub fn stdin(message: impl Into<String>) -> Self {
        Event::Stdin(TextMessage::new(message))
    }

    pub fn stdout(message: impl Into<String>) -> Self {
        Event::Stdout(TextMessage::new(message))
    }

    pub fn drop(reason: impl Into<String>) -> Self {
        Event::Drop(DropReason {
            reason: reason.into(),
        })
    }

    /// Wandelt das Ereignis in ein Draht-Frame um
    pub fn to_frame(&self) -> ProtocolResult<Frame> {
        let data = match self {
            Event::Hello(p) => serde_json::to_value(p)?,
            Event::Ack(p) => serde_json::to_value(p)?,
            Event::Drop(p) => serde_json::to_value(p)?,
            Event::Error(p) | Event::Message(p) | Event::Stdin(p) | Event::Stdout(p) => {
                serde_json::to_value(p)?
            }
            Event::AppTerm(p) | Event::AppKill(p) => serde_json::to_value(p)?,
            Event::Report(p) => serde_json::to_value(p)?,
            Event::AdminControl(p) => serde_json::to_value(p)?,
            Event::Statistics(p) => serde_json::to_value(p)?,
            Event::GetInputById(p) => serde_json::to_value(p)?,
            Event::Input(p) => serde_json::to_value(p)?,
            Event::Eof | Event::Completed => Value::Null,
            Event::Disconnect => return Err(ProtocolError::LokalesEreignis("disconnect")),
        };
        Ok(Frame {
            typ: self.kind().name().to_string(),
            data,
        })
    }

    /// Baut ein typisiertes Ereignis aus einem Draht-Frame
    pub fn from_frame(frame: Frame) -> ProtocolResult<Self> {
        let kind = EventKind::from_name(&frame.typ)
            .ok_or_else(|| ProtocolError::UnbekannterTyp(frame.typ.clone()))?;
        let data = frame.data;

        let event = match kind {
            EventKind::Hello => Event::Hello(nutzdaten_oder_leer(data)?),
            EventKind::Ack => Event::Ack(nutzdaten(data)?),
            EventKind::Drop => Event::Drop(nutzdaten(data)?),
            EventKind::Error => Event::Error(nutzdaten(data)?),
            EventKind::Message => Event::Message(nutzdaten(data)?),
            EventKind::Stdin => Event::Stdin(nutzdaten(data)?),
            EventKind::Eof => Event::Eof,
            EventKind::Stdout => Event::Stdout(nutzdaten(data)?),
            EventKind::AppTerm => Event::AppTerm(nutzdaten(data)?),
            EventKind::AppKill => Event::AppKill(nutzdaten(data)?),
            EventKind::Report => Event::Report(Box::new(nutzdaten(data)?)),
            EventKind::AdminControl => Event::AdminControl(nutzdaten_oder_leer(data)?),
            EventKind::Completed => Event::Completed,
            EventKind::Statistics => Event::Statistics(Box::new(nutzdaten(data)?)),
            EventKind::GetInputById => Event::GetInputById(nutzdaten_oder_leer(data)?),
            EventKind::Input => Event::Input(nutzdaten(data)?),
            // from_name liefert nie Disconnect
            EventKind::Disconnect => return Err(ProtocolError::UnbekannterTyp(frame.typ)),
        };
        Ok(event)
    }

    /// Serialisiert das Ereignis als einzeiliges JSON (ohne Zeilenende)
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(&self.to_frame()?)?)
    }

    /// Dekodiert ein Ereignis aus einer JSON-Zeile
    pub fn from_json(json: &[u8]) -> ProtocolResult<Self> {
        let frame: Frame = serde_json::from_slice(json)?;
        Self::from_frame(frame)
    }
}

/// Deserialisiert die Nutzdaten; `null` gilt als leeres Objekt
fn nutzdaten<T: DeserializeOwned>(data: Value) -> ProtocolResult<T> {
    let data = if data.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        data
    };
    Ok(serde_json::from_value(data)?)
}

/// Wie [`nutzdaten`], aber Nicht-Objekte ergeben die leere Nutzlast
///
/// Fuer Anfragen, deren Felder alle optional sind: die fachliche Pruefung
/// beantwortet sie dann mit der passenden Ablehnung.
fn nutzdaten_oder_leer<T: DeserializeOwned + Default>(data: Value) -> ProtocolResult<T> {
    if data.is_object() {
        nutzdaten(data)
    } else {
        Ok(T::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use autotest_core::{InputId, WorkerId};
    use std::collections::BTreeMap;

    #[test]
    fn namen_sind_eindeutig_und_aufloesbar() {
        for kind in EventKind::DRAHT {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EventKind::from_name("disconnect"), None);
        assert_eq!(EventKind::from_name("Hello"), None);
    }

    #[test]
    fn hello_frame_im_draht_format() {
        let json = br#"{"type":"hello","data":{"taskId":"going_electric","workerId":"w1","zId":"z5423219","workerType":"api"}}"#;
        let event = Event::from_json(json).unwrap();
        let Event::Hello(hello) = event else {
            panic!("Erwartet Hello");
        };
        assert_eq!(hello.task_id.as_deref(), Some("going_electric"));
        assert_eq!(hello.worker_id, Some(WorkerId::from("w1")));
        assert_eq!(hello.z_id.as_deref(), Some("z5423219"));
        assert_eq!(hello.worker_type.as_deref(), Some("api"));
    }

    #[test]
    fn ereignisse_ohne_nutzdaten() {
        assert_eq!(Event::Eof.to_json().unwrap(), r#"{"type":"eof","data":null}"#);
        assert_eq!(
            Event::from_json(br#"{"type":"completed","data":null}"#).unwrap(),
            Event::Completed
        );
        // `data` darf fehlen
        assert_eq!(Event::from_json(br#"{"type":"eof"}"#).unwrap(), Event::Eof);
    }

    #[test]
    fn null_nutzdaten_fuer_struktur_mit_optionalen_feldern() {
        let event = Event::from_json(br#"{"type":"appterm","data":null}"#).unwrap();
        assert_eq!(event, Event::AppTerm(AppSignal::default()));
    }

    #[test]
    fn unbekannter_typ_wird_abgelehnt() {
        let err = Event::from_json(br#"{"type":"teleport","data":{}}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::UnbekannterTyp(t) if t == "teleport"));
    }

    #[test]
    fn disconnect_von_aussen_abgelehnt() {
        assert!(Event::from_json(br#"{"type":"disconnect","data":null}"#).is_err());
        assert!(matches!(
            Event::Disconnect.to_frame(),
            Err(ProtocolError::LokalesEreignis(_))
        ));
    }

    #[test]
    fn falsche_nutzdaten_werden_abgelehnt() {
        // stdout ohne message
        assert!(Event::from_json(br#"{"type":"stdout","data":{}}"#).is_err());
        // kein JSON-Objekt
        assert!(Event::from_json(br#"["hello", {}]"#).is_err());
        // type fehlt
        assert!(Event::from_json(br#"{"data":{}}"#).is_err());
    }

    #[test]
    fn input_antwort_sendet_explizites_null() {
        let json = Event::Input(InputPayload { input: None }).to_json().unwrap();
        assert_eq!(json, r#"{"type":"input","data":{"input":null}}"#);
    }

    #[test]
    fn report_feldnamen() {
        let mut all_outputs = BTreeMap::new();
        all_outputs.insert("5\n".to_string(), vec![WorkerId::from("a")]);
        let report = Event::Report(Box::new(RoundReport {
            total: 1,
            sameoutput: 1,
            similarity: 1.0,
            output: "5\n".into(),
            input: "1 2".into(),
            input_id: InputId::from("i0"),
            test_number: 0,
            all_outputs,
        }));
        let frame = report.to_frame().unwrap();
        assert_eq!(frame.typ, "report");
        for feld in [
            "total",
            "sameoutput",
            "similarity",
            "output",
            "input",
            "inputId",
            "testNumber",
            "allOutputs",
        ] {
            assert!(frame.data.get(feld).is_some(), "Feld {feld} fehlt");
        }
        assert_eq!(frame.data["allOutputs"]["5\n"][0], "a");
    }

    #[test]
    fn statistik_feldnamen() {
        let frame = Event::Statistics(Box::default()).to_frame().unwrap();
        assert_eq!(frame.data["workerProgress"], serde_json::json!({}));
        assert_eq!(frame.data["inputIdToInput"], serde_json::json!({}));
        assert_eq!(frame.data["inputIdToOutputToWorkerIds"], serde_json::json!({}));
        assert_eq!(frame.data["workerIdToInputIdToOutput"], serde_json::json!({}));
        assert_eq!(frame.data["inputIdInOrder"], serde_json::json!([]));
    }

    #[test]
    fn admin_control_aus_admin_client() {
        let json = br#"{"type":"admin-control","data":{"workerId":null,"progress":3,"command":"set-progress"}}"#;
        let Event::AdminControl(ctrl) = Event::from_json(json).unwrap() else {
            panic!("Erwartet AdminControl");
        };
        assert_eq!(ctrl.command.as_deref(), Some("set-progress"));
        assert_eq!(ctrl.worker_id, None);
        assert_eq!(ctrl.progress, Some(3.into()));
    }

    #[test]
    fn anfragen_mit_falsch_getypten_feldern_kommen_an() {
        let Event::Hello(hello) =
            Event::from_json(br#"{"type":"hello","data":{"taskId":5,"zId":5423219}}"#).unwrap()
        else {
            panic!("Erwartet Hello");
        };
        assert_eq!(hello.task_id.as_deref(), Some("5"));
        assert_eq!(hello.z_id.as_deref(), Some("5423219"));

        let Event::AdminControl(ctrl) = Event::from_json(
            br#"{"type":"admin-control","data":{"command":"set-progress","progress":"x"}}"#,
        )
        .unwrap() else {
            panic!("Erwartet AdminControl");
        };
        assert_eq!(
            ctrl.progress,
            Some(crate::Fortschritt::Ungueltig(serde_json::json!("x")))
        );

        let Event::GetInputById(anfrage) =
            Event::from_json(br#"{"type":"get-input-by-id","data":{"inputId":12}}"#).unwrap()
        else {
            panic!("Erwartet GetInputById");
        };
        assert_eq!(anfrage.input_id, Some(InputId::from("12")));
    }

    #[test]
    fn anfragen_ohne_objekt_ergeben_leere_nutzlast() {
        assert_eq!(
            Event::from_json(br#"{"type":"hello","data":"summe"}"#).unwrap(),
            Event::Hello(Hello::default())
        );
        assert_eq!(
            Event::from_json(br#"{"type":"admin-control","data":[1,2]}"#).unwrap(),
            Event::AdminControl(AdminControl::default())
        );
        // Ausgaben bleiben streng
        assert!(Event::from_json(br#"{"type":"stdout","data":"5"}"#).is_err());
    }

    #[test]
    fn frame_hat_genau_zwei_felder() {
        let frame = Event::stdin("1 2 3").to_frame().unwrap();
        let value = serde_json::to_value(&frame).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["type"], "stdin");
        assert_eq!(obj["data"]["message"], "1 2 3");
    }
}
