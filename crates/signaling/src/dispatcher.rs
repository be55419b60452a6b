//! Handshake-Dispatcher – bindet eine Verbindung an Aufgabe und Rolle
//!
//! Jede neue Verbindung wartet auf `hello`. Die Pruefung bricht beim ersten
//! Fehler ab:
//!
//! 1. `taskId` fehlt
//! 2. `taskId` unbekannt
//! 3. `zId` fehlt oder ist nicht zugelassen
//! 4. `workerType` unbekannt
//!
//! Bei Fehler: `drop{reason}` und Verbindung schliessen, ohne den
//! Aufgaben-Zustand zu beruehren. Bei Erfolg wird die Rolle gebunden und
//! `ack{workerId}` gesendet. Nur das erste `hello` zaehlt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use autotest_core::WorkerId;
use autotest_grading::Task;
use autotest_protocol::{Ack, Event, EventKind, Hello};
use parking_lot::Mutex;

use crate::connection::Connection;
use crate::handlers::{AdminSession, RollenArt, SessionRolle, TaskApi, TaskRunner};
use crate::server_state::SignalingState;

pub const DROP_KEINE_TASK_ID: &str = "No taskId provided.";
pub const DROP_UNBEKANNTE_TASK: &str = "TaskId not found.";
pub const DROP_ZUGANG: &str = "Failed to start autotest due to an error.";
pub const DROP_UNBEKANNTE_ROLLE: &str = "Unknown workerType.";

// ---------------------------------------------------------------------------
// Sitzung
// ---------------------------------------------------------------------------

/// Zustand einer Verbindung waehrend und nach dem Handshake
#[derive(Debug)]
pub struct Sitzung {
    verbindung: Connection,
    hello_erhalten: AtomicBool,
    rolle: Mutex<Option<SessionRolle>>,
}

impl Sitzung {
    fn neu(verbindung: Connection) -> Self {
        Self {
            verbindung,
            hello_erhalten: AtomicBool::new(false),
            rolle: Mutex::new(None),
        }
    }

    pub fn verbindung(&self) -> &Connection {
        &self.verbindung
    }

    /// Gebundene Rolle (None vor dem Handshake oder nach `drop`)
    pub fn rolle(&self) -> Option<SessionRolle> {
        self.rolle.lock().clone()
    }
}

// ---------------------------------------------------------------------------
// HandshakeDispatcher
// ---------------------------------------------------------------------------

/// Nimmt Verbindungen an und fuehrt den `hello`-Handshake durch
#[derive(Clone)]
pub struct HandshakeDispatcher {
    state: Arc<SignalingState>,
}

impl HandshakeDispatcher {
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<SignalingState> {
        &self.state
    }

    /// Registriert den Handshake-Handler und startet die Verbindung
    pub fn verbindung_annehmen(&self, verbindung: Connection) -> Arc<Sitzung> {
        let sitzung = Arc::new(Sitzung::neu(verbindung.clone()));

        let dispatcher = self.clone();
        let s = Arc::clone(&sitzung);
        verbindung.on(EventKind::Hello, move |e| {
            if let Event::Hello(hello) = e {
                dispatcher.hello_verarbeiten(&s, hello);
            }
        });

        if let Err(e) = verbindung.run() {
            tracing::debug!(peer = %verbindung.peer(), fehler = %e, "Verbindung nicht gestartet");
        }
        sitzung
    }

    fn hello_verarbeiten(&self, sitzung: &Sitzung, hello: &Hello) {
        let verbindung = &sitzung.verbindung;

        if sitzung.hello_erhalten.swap(true, Ordering::SeqCst) {
            tracing::debug!(peer = %verbindung.peer(), "Weiteres hello ignoriert");
            return;
        }

        let (task, art) = match self.hello_pruefen(hello) {
            Ok(ergebnis) => ergebnis,
            Err(grund) => {
                tracing::info!(
                    peer = %verbindung.peer(),
                    task_id = ?hello.task_id,
                    grund,
                    "Handshake abgelehnt"
                );
                verbindung.send(Event::drop(grund));
                verbindung.close();
                return;
            }
        };

        let worker_id = hello
            .worker_id
            .clone()
            .filter(|w| !w.as_str().is_empty())
            .unwrap_or_else(WorkerId::zufaellig);

        tracing::info!(
            peer = %verbindung.peer(),
            task_id = %task.id(),
            worker_id = %worker_id,
            rolle = ?art,
            "Handshake erfolgreich"
        );

        let rolle = match art {
            RollenArt::Tester => {
                SessionRolle::Runner(TaskRunner::starten(task, verbindung.clone(), worker_id.clone()))
            }
            RollenArt::Api => {
                SessionRolle::Api(TaskApi::starten(task, verbindung.clone(), worker_id.clone()))
            }
            RollenArt::Admin => SessionRolle::Admin(AdminSession::starten(
                task,
                verbindung.clone(),
                worker_id.clone(),
            )),
        };
        *sitzung.rolle.lock() = Some(rolle);

        verbindung.send(Event::Ack(Ack { worker_id }));
    }

    /// Prueft ein `hello`; `Err` enthaelt die `drop`-Begruendung
    pub fn hello_pruefen(&self, hello: &Hello) -> Result<(Arc<Task>, RollenArt), &'static str> {
        let task_id = hello.task_id.as_deref().ok_or(DROP_KEINE_TASK_ID)?;
        let task = self
            .state
            .registry
            .finden(task_id)
            .ok_or(DROP_UNBEKANNTE_TASK)?;

        let zugelassen = hello
            .z_id
            .as_deref()
            .is_some_and(|z| self.state.zugang.erlaubt(z));
        if !zugelassen {
            return Err(DROP_ZUGANG);
        }

        let art = RollenArt::aus_marker(hello.worker_type.as_deref()).ok_or(DROP_UNBEKANNTE_ROLLE)?;
        Ok((task, art))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
