//! AdminSession – reine Steuerverbindung ohne Testrunde
//!
//! Es wird keine Runde gestartet und keine Eingabe erzeugt. Jedes
//! `admin-control` wird mit seiner Antwort und `completed` beantwortet.

use std::sync::Arc;

use autotest_core::WorkerId;
use autotest_grading::{admin_control_beantworten, Task};
use autotest_protocol::{Event, EventKind};

use crate::connection::Connection;

#[derive(Debug)]
pub struct AdminSession {
    task: Arc<Task>,
    verbindung: Connection,
    worker_id: WorkerId,
}

impl AdminSession {
    pub fn starten(task: Arc<Task>, verbindung: Connection, worker_id: WorkerId) -> Arc<Self> {
        tracing::info!(task_id = %task.id(), worker_id = %worker_id, "Admin-Sitzung gestartet");

        let sitzung = Arc::new(Self {
            task,
            verbindung,
            worker_id,
        });

        let s = Arc::clone(&sitzung);
        sitzung.verbindung.on(EventKind::AdminControl, move |e| {
            if let Event::AdminControl(control) = e {
                for antwort in admin_control_beantworten(&s.task, control, &s.worker_id) {
                    s.verbindung.send(antwort);
                }
            }
        });
        sitzung
    }

    pub fn worker_id(&self) -> &WorkerId {
        &self.worker_id
    }
}
