//! TaskRunner – eine Testrunde fuer einen Worker
//!
//! ## State Machine
//! ```text
//! AwaitingOutput --appterm--> Terminated --report--> Reported
//!       |
//!       +-------disconnect-------> Aborted
//! ```
//!
//! Beim Start wird die Runde zugeteilt und die Eingabe als `stdin` + `eof`
//! gesendet. `stdout`-Stuecke werden gesammelt, bis `appterm` (oder
//! `appkill`) die Runde beendet. Danach wird die Ausgabe als Stimme
//! eingetragen und der Stimmenstand als `report` zurueckgemeldet.

use std::sync::Arc;

use autotest_core::WorkerId;
use autotest_grading::{admin_control_beantworten, Runde, Task};
use autotest_protocol::{AdminControl, AppSignal, Event, EventKind, RoundReport};
use parking_lot::Mutex;

use crate::connection::{Connection, HandlerId};

/// Fehlermeldung an den Worker wenn die Runde nicht abgeschlossen werden konnte
pub const NICHT_ABGESCHLOSSEN: &str = "Task could not be completed.";

/// Phase einer Runde
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RundenPhase {
    AwaitingOutput,
    Terminated,
    Reported,
    Aborted,
}

#[derive(Debug)]
struct RunnerZustand {
    ausgabe: String,
    kill_grund: Option<String>,
    phase: RundenPhase,
}

#[derive(Debug, Default)]
struct Registrierungen {
    /// stdout, appterm, appkill
    runde: Vec<(EventKind, HandlerId)>,
    admin: Option<HandlerId>,
}

/// Fuehrt eine Runde fuer einen Worker auf einer Verbindung durch
#[derive(Debug)]
pub struct TaskRunner {
    task: Arc<Task>,
    verbindung: Connection,
    worker_id: WorkerId,
    runde: Runde,
    zustand: Mutex<RunnerZustand>,
    registrierungen: Mutex<Registrierungen>,
}

impl TaskRunner {
    /// Teilt die naechste Runde zu und sendet die Eingabe an den Worker
    pub fn starten(task: Arc<Task>, verbindung: Connection, worker_id: WorkerId) -> Arc<Self> {
        let runde = task.start_round(&worker_id);

        tracing::info!(
            task_id = %task.id(),
            worker_id = %worker_id,
            runde = runde.index,
            input_id = %runde.input_id,
            "Runde gestartet"
        );

        let runner = Arc::new(Self {
            task,
            verbindung,
            worker_id,
            runde,
            zustand: Mutex::new(RunnerZustand {
                ausgabe: String::new(),
                kill_grund: None,
                phase: RundenPhase::AwaitingOutput,
            }),
            registrierungen: Mutex::new(Registrierungen::default()),
        });

        runner.handler_registrieren();
        runner
            .verbindung
            .send(Event::stdin(runner.runde.input.clone()));
        runner.verbindung.send(Event::Eof);
        runner
    }

    fn handler_registrieren(self: &Arc<Self>) {
        let r = Arc::clone(self);
        let stdout = self.verbindung.on(EventKind::Stdout, move |e| {
            if let Event::Stdout(m) = e {
                r.bei_stdout(&m.message);
            }
        });

        let r = Arc::clone(self);
        let appterm = self.verbindung.on(EventKind::AppTerm, move |_| r.bei_appterm());

        let r = Arc::clone(self);
        let appkill = self.verbindung.on(EventKind::AppKill, move |e| {
            if let Event::AppKill(signal) = e {
                r.bei_appkill(signal);
            }
        });

        let r = Arc::clone(self);
        let admin = self.verbindung.on(EventKind::AdminControl, move |e| {
            if let Event::AdminControl(control) = e {
                r.bei_admin(control);
            }
        });

        let r = Arc::clone(self);
        self.verbindung
            .on(EventKind::Disconnect, move |_| r.bei_disconnect());

        let mut reg = self.registrierungen.lock();
        reg.runde = vec![
            (EventKind::Stdout, stdout),
            (EventKind::AppTerm, appterm),
            (EventKind::AppKill, appkill),
        ];
        reg.admin = Some(admin);
    }

    // -----------------------------------------------------------------------
    // Zugriff
    // -----------------------------------------------------------------------

    pub fn worker_id(&self) -> &WorkerId {
        &self.worker_id
    }

    pub fn runde(&self) -> &Runde {
        &self.runde
    }

    pub fn phase(&self) -> RundenPhase {
        self.zustand.lock().phase
    }

    /// Grund aus `appkill`, falls die Runde abgebrochen wurde
    pub fn kill_grund(&self) -> Option<String> {
        self.zustand.lock().kill_grund.clone()
    }

    // -----------------------------------------------------------------------
    // Ereignisse
    // -----------------------------------------------------------------------

    fn bei_stdout(&self, stueck: &str) {
        let mut zustand = self.zustand.lock();
        if zustand.phase == RundenPhase::AwaitingOutput {
            zustand.ausgabe.push_str(&stueck.replace("\r\n", "\n"));
        }
    }

    fn bei_appterm(&self) {
        let ausgabe = {
            let mut zustand = self.zustand.lock();
            if zustand.phase != RundenPhase::AwaitingOutput {
                tracing::debug!(worker_id = %self.worker_id, phase = ?zustand.phase, "appterm ignoriert");
                return;
            }
            zustand.phase = RundenPhase::Terminated;
            zustand.ausgabe.clone()
        };

        match self
            .task
            .record_outcome(&self.worker_id, &self.runde.input_id, &ausgabe)
        {
            Ok(stand) => {
                tracing::info!(
                    task_id = %self.task.id(),
                    worker_id = %self.worker_id,
                    runde = self.runde.index,
                    gleich = stand.same_output,
                    gesamt = stand.total,
                    angenommen = stand.angenommen(),
                    "Runde bewertet"
                );
                self.verbindung.send(Event::Report(Box::new(RoundReport {
                    total: stand.total,
                    sameoutput: stand.same_output,
                    similarity: stand.similarity,
                    output: ausgabe,
                    input: self.runde.input.clone(),
                    input_id: self.runde.input_id.clone(),
                    test_number: self.runde.index,
                    all_outputs: self.task.all_outputs(&self.runde.input_id),
                })));
            }
            Err(e) => {
                tracing::warn!(worker_id = %self.worker_id, fehler = %e, "Ergebnis nicht eintragbar");
                self.verbindung.send(Event::error(NICHT_ABGESCHLOSSEN));
            }
        }

        self.handler_entfernen(true);
        self.zustand.lock().phase = RundenPhase::Reported;
        self.verbindung.send(Event::Completed);
    }

    fn bei_appkill(&self, signal: &AppSignal) {
        tracing::info!(worker_id = %self.worker_id, grund = ?signal.reason, "Programm abgebrochen");
        self.zustand.lock().kill_grund = signal.reason.clone();

        self.verbindung.local_fire(Event::AppTerm(AppSignal {
            worker_id: Some(self.worker_id.clone()),
            reason: signal.reason.clone(),
        }));
        self.verbindung.send(Event::error(NICHT_ABGESCHLOSSEN));
    }

    fn bei_admin(&self, control: &AdminControl) {
        // Die Runde endet ohne Bewertung, weitere Befehle bleiben moeglich
        self.handler_entfernen(false);
        for antwort in admin_control_beantworten(&self.task, control, &self.worker_id) {
            self.verbindung.send(antwort);
        }
    }

    fn bei_disconnect(&self) {
        let mut zustand = self.zustand.lock();
        if matches!(
            zustand.phase,
            RundenPhase::AwaitingOutput | RundenPhase::Terminated
        ) {
            zustand.phase = RundenPhase::Aborted;
            tracing::info!(
                worker_id = %self.worker_id,
                runde = self.runde.index,
                "Runde ohne Ergebnis abgebrochen"
            );
        }
    }

    fn handler_entfernen(&self, mit_admin: bool) {
        let (runde, admin) = {
            let mut reg = self.registrierungen.lock();
            let admin = if mit_admin { reg.admin.take() } else { None };
            (std::mem::take(&mut reg.runde), admin)
        };
        for (kind, id) in runde {
            self.verbindung.off(kind, id);
        }
        if let Some(id) = admin {
            self.verbindung.off(EventKind::AdminControl, id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn aufbau() -> (Arc<Task>, Connection) {
        let task = Arc::new(Task::neu("runner-test", Arc::new(|| "3 4".to_string())));
        let (a, _b) = tokio::io::duplex(1024);
        (task, Connection::neu(a, "runner"))
    }

    #[test]
    fn stdout_sammelt_und_normalisiert_zeilenenden() {
        let (task, verbindung) = aufbau();
        let runner = TaskRunner::starten(task.clone(), verbindung.clone(), WorkerId::from("a"));

        verbindung.local_fire(Event::stdout("7\r\n"));
        verbindung.local_fire(Event::stdout("8\n"));
        verbindung.local_fire(Event::AppTerm(AppSignal::default()));

        assert_eq!(runner.phase(), RundenPhase::Reported);
        let alle = task.all_outputs(&runner.runde().input_id);
        assert_eq!(alle["7\n8\n"], vec![WorkerId::from("a")]);
    }

    #[test]
    fn zweites_appterm_wird_ignoriert() {
        let (task, verbindung) = aufbau();
        let runner = TaskRunner::starten(task.clone(), verbindung.clone(), WorkerId::from("a"));

        verbindung.local_fire(Event::stdout("erst"));
        verbindung.local_fire(Event::AppTerm(AppSignal::default()));
        verbindung.local_fire(Event::stdout("spaeter"));
        runner.bei_appterm();

        let alle = task.all_outputs(&runner.runde().input_id);
        assert_eq!(alle.len(), 1);
        assert!(alle.contains_key("erst"));
    }

    #[test]
    fn appkill_bewertet_bisherige_ausgabe() {
        let (task, verbindung) = aufbau();
        let runner = TaskRunner::starten(task.clone(), verbindung.clone(), WorkerId::from("a"));

        verbindung.local_fire(Event::stdout("teil"));
        verbindung.local_fire(Event::AppKill(AppSignal {
            worker_id: None,
            reason: Some("timeout".into()),
        }));

        assert_eq!(runner.phase(), RundenPhase::Reported);
        assert_eq!(runner.kill_grund().as_deref(), Some("timeout"));
        assert!(task.all_outputs(&runner.runde().input_id).contains_key("teil"));
    }

    #[test]
    fn admin_beendet_runde_ohne_stimme() {
        let (task, verbindung) = aufbau();
        let runner = TaskRunner::starten(task.clone(), verbindung.clone(), WorkerId::from("a"));

        verbindung.local_fire(Event::AdminControl(AdminControl {
            command: Some("set-progress".into()),
            worker_id: None,
            progress: Some(0.into()),
        }));
        // Runden-Handler sind entfernt
        verbindung.local_fire(Event::AppTerm(AppSignal::default()));

        assert_eq!(runner.phase(), RundenPhase::AwaitingOutput);
        assert!(task.all_outputs(&runner.runde().input_id).is_empty());
        assert_eq!(task.fortschritt(runner.worker_id()), 0);

        // Weitere Admin-Befehle werden weiter bedient
        verbindung.local_fire(Event::AdminControl(AdminControl {
            command: Some("purge-all".into()),
            ..Default::default()
        }));
        assert_eq!(task.anzahl_eingaben(), 0);
    }

    #[test]
    fn disconnect_bricht_runde_ab() {
        let (task, verbindung) = aufbau();
        let runner = TaskRunner::starten(task.clone(), verbindung.clone(), WorkerId::from("a"));

        verbindung.local_fire(Event::stdout("halb"));
        verbindung.local_fire(Event::Disconnect);

        assert_eq!(runner.phase(), RundenPhase::Aborted);
        assert!(task.all_outputs(&runner.runde().input_id).is_empty());
    }

    #[test]
    fn purge_all_waehrend_der_runde() {
        let (task, verbindung) = aufbau();
        let runner = TaskRunner::starten(task.clone(), verbindung.clone(), WorkerId::from("a"));

        task.purge_all();
        verbindung.local_fire(Event::AppTerm(AppSignal::default()));

        // Kein Report, aber die Runde ist abgeschlossen
        assert_eq!(runner.phase(), RundenPhase::Reported);
        assert_eq!(task.anzahl_eingaben(), 0);
    }
}
