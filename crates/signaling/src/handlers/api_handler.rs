//! TaskApi – Abfrage gespeicherter Eingaben
//!
//! Beantwortet beliebig viele `get-input-by-id` auf derselben Verbindung.
//! Fehlt die ID oder ist sie unbekannt, folgt auf `input{input: null}` ein
//! `error` mit der Begruendung.

use std::sync::Arc;

use autotest_core::WorkerId;
use autotest_grading::Task;
use autotest_protocol::{Event, EventKind, GetInputById, InputPayload};

use crate::connection::Connection;

#[derive(Debug)]
pub struct TaskApi {
    task: Arc<Task>,
    verbindung: Connection,
    worker_id: WorkerId,
}

impl TaskApi {
    pub fn starten(task: Arc<Task>, verbindung: Connection, worker_id: WorkerId) -> Arc<Self> {
        let api = Arc::new(Self {
            task,
            verbindung,
            worker_id,
        });

        let a = Arc::clone(&api);
        api.verbindung.on(EventKind::GetInputById, move |e| {
            if let Event::GetInputById(anfrage) = e {
                a.bei_anfrage(anfrage);
            }
        });
        api
    }

    pub fn worker_id(&self) -> &WorkerId {
        &self.worker_id
    }

    fn bei_anfrage(&self, anfrage: &GetInputById) {
        let fehler = match &anfrage.input_id {
            None => "No inputId specified",
            Some(id) => match self.task.input_by_id(id) {
                Some(input) => {
                    self.verbindung.send(Event::Input(InputPayload { input: Some(input) }));
                    return;
                }
                None => "Unknown inputId",
            },
        };

        tracing::debug!(worker_id = %self.worker_id, input_id = ?anfrage.input_id, fehler, "Eingabe nicht gefunden");
        self.verbindung.send(Event::Input(InputPayload { input: None }));
        self.verbindung.send(Event::error(fehler));
    }
}
