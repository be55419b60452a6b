//! Administrative Steuerung einer Aufgabe
//!
//! `admin-control` wird in einen [`AdminBefehl`] uebersetzt und gegen die
//! Task ausgefuehrt. Das Ergebnis ist genau ein Antwort-Ereignis; das
//! abschliessende `completed` sendet die Session.

use autotest_core::WorkerId;
use autotest_protocol::{AdminControl, Event, Fortschritt};

use crate::error::GradingError;
use crate::task::Task;

/// Ein geparster Admin-Befehl
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminBefehl {
    SetProgress {
        worker_id: WorkerId,
        progress: Option<Fortschritt>,
    },
    PurgeData {
        worker_id: WorkerId,
    },
    PurgeAll,
    ServerStatistics,
    /// Kein `command`-Feld
    Fehlt,
    /// Unbekannter Befehlsname
    Unbekannt(String),
}

impl AdminBefehl {
    /// Parst die Nutzdaten; fehlt `workerId`, gilt der eigene Worker
    pub fn parsen(control: &AdminControl, eigener_worker: &WorkerId) -> Self {
        let worker_id = || {
            control
                .worker_id
                .clone()
                .unwrap_or_else(|| eigener_worker.clone())
        };

        match control.command.as_deref() {
            None => AdminBefehl::Fehlt,
            Some("set-progress") => AdminBefehl::SetProgress {
                worker_id: worker_id(),
                progress: control.progress.clone(),
            },
            Some("purge-data") => AdminBefehl::PurgeData {
                worker_id: worker_id(),
            },
            Some("purge-all") => AdminBefehl::PurgeAll,
            Some("server-statistics") => AdminBefehl::ServerStatistics,
            Some(andere) => AdminBefehl::Unbekannt(andere.to_string()),
        }
    }

    /// Fuehrt den Befehl aus und liefert das Antwort-Ereignis
    pub fn ausfuehren(&self, task: &Task) -> Event {
        tracing::info!(task_id = %task.id(), befehl = ?self, "Admin-Befehl");

        match self {
            AdminBefehl::SetProgress {
                progress: None, ..
            } => Event::error("No progress specified"),
            AdminBefehl::SetProgress {
                worker_id,
                progress: Some(Fortschritt::Ungueltig(wert)),
            } => {
                tracing::debug!(task_id = %task.id(), worker_id = %worker_id, %wert, "Fortschritt keine ganze Zahl");
                Event::error("Progress out of bounds")
            }
            AdminBefehl::SetProgress {
                worker_id,
                progress: Some(Fortschritt::Zahl(progress)),
            } => match task.set_progress(worker_id, *progress) {
                Ok(()) => Event::message(format!("Progress set to {progress}")),
                Err(GradingError::OutOfRange { .. }) => Event::error("Progress out of bounds"),
                Err(e) => Event::error(e.to_string()),
            },
            AdminBefehl::PurgeData { worker_id } => {
                task.purge_worker(worker_id);
                Event::message(format!("Data purged for {worker_id}"))
            }
            AdminBefehl::PurgeAll => {
                task.purge_all();
                Event::message("Purged all data.")
            }
            AdminBefehl::ServerStatistics => {
                Event::Statistics(Box::new(task.statistics_snapshot()))
            }
            AdminBefehl::Fehlt => Event::error("No command specified"),
            AdminBefehl::Unbekannt(befehl) => Event::error(format!("Unknown command {befehl}")),
        }
    }
}

/// Beantwortet ein `admin-control` vollstaendig: Antwort gefolgt von `completed`
pub fn admin_control_beantworten(
    task: &Task,
    control: &AdminControl,
    eigener_worker: &WorkerId,
) -> [Event; 2] {
    let antwort = AdminBefehl::parsen(control, eigener_worker).ausfuehren(task);
    [antwort, Event::Completed]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn task_mit_runden(n: usize) -> Task {
        let task = Task::neu("admin-test", Arc::new(|| "1 2 3".to_string()));
        for _ in 0..n {
            task.start_round(&WorkerId::from("a"));
        }
        task
    }

    fn befehl(command: Option<&str>, worker: Option<&str>, progress: Option<i64>) -> AdminControl {
        AdminControl {
            command: command.map(str::to_string),
            worker_id: worker.map(WorkerId::from),
            progress: progress.map(Fortschritt::from),
        }
    }

    fn text(event: &Event) -> (&'static str, String) {
        match event {
            Event::Message(m) => ("message", m.message.clone()),
            Event::Error(m) => ("error", m.message.clone()),
            andere => panic!("Unerwartetes Ereignis: {andere:?}"),
        }
    }

    #[test]
    fn parsen_nutzt_eigenen_worker() {
        let eigen = WorkerId::from("ich");
        assert_eq!(
            AdminBefehl::parsen(&befehl(Some("purge-data"), None, None), &eigen),
            AdminBefehl::PurgeData { worker_id: eigen.clone() }
        );
        assert_eq!(
            AdminBefehl::parsen(&befehl(Some("purge-data"), Some("du"), None), &eigen),
            AdminBefehl::PurgeData { worker_id: WorkerId::from("du") }
        );
        assert_eq!(
            AdminBefehl::parsen(&befehl(None, None, None), &eigen),
            AdminBefehl::Fehlt
        );
    }

    #[test]
    fn antwort_endet_immer_mit_completed() {
        let task = task_mit_runden(1);
        let eigen = WorkerId::from("a");
        for c in [
            befehl(None, None, None),
            befehl(Some("kaputt"), None, None),
            befehl(Some("set-progress"), None, None),
            befehl(Some("server-statistics"), None, None),
        ] {
            let [_, letztes] = admin_control_beantworten(&task, &c, &eigen);
            assert_eq!(letztes, Event::Completed);
        }
    }

    #[test]
    fn set_progress_antworten() {
        let task = task_mit_runden(2);
        let eigen = WorkerId::from("a");

        let ok = AdminBefehl::parsen(&befehl(Some("set-progress"), None, Some(1)), &eigen);
        assert_eq!(text(&ok.ausfuehren(&task)), ("message", "Progress set to 1".into()));
        assert_eq!(task.fortschritt(&eigen), 1);

        let zu_gross = AdminBefehl::parsen(&befehl(Some("set-progress"), None, Some(3)), &eigen);
        assert_eq!(text(&zu_gross.ausfuehren(&task)), ("error", "Progress out of bounds".into()));
        assert_eq!(task.fortschritt(&eigen), 1);

        let fehlt = AdminBefehl::parsen(&befehl(Some("set-progress"), None, None), &eigen);
        assert_eq!(text(&fehlt.ausfuehren(&task)), ("error", "No progress specified".into()));
    }

    #[test]
    fn set_progress_ohne_ganze_zahl() {
        let task = task_mit_runden(2);
        let eigen = WorkerId::from("a");

        for wert in [serde_json::json!("x"), serde_json::json!(1.5), serde_json::json!(true)] {
            let control = AdminControl {
                progress: Some(Fortschritt::Ungueltig(wert)),
                ..befehl(Some("set-progress"), None, None)
            };
            let [antwort, ende] = admin_control_beantworten(&task, &control, &eigen);
            assert_eq!(text(&antwort), ("error", "Progress out of bounds".into()));
            assert_eq!(ende, Event::Completed);
        }
        assert_eq!(task.fortschritt(&eigen), 2);
    }

    #[test]
    fn purge_antworten() {
        let task = task_mit_runden(1);
        let eigen = WorkerId::from("a");

        let purge = AdminBefehl::parsen(&befehl(Some("purge-data"), Some("b"), None), &eigen);
        assert_eq!(text(&purge.ausfuehren(&task)), ("message", "Data purged for b".into()));

        let alles = AdminBefehl::parsen(&befehl(Some("purge-all"), None, None), &eigen);
        assert_eq!(text(&alles.ausfuehren(&task)), ("message", "Purged all data.".into()));
        assert_eq!(task.anzahl_eingaben(), 0);
    }

    #[test]
    fn statistik_nach_purge_all_leer() {
        let task = task_mit_runden(3);
        AdminBefehl::PurgeAll.ausfuehren(&task);

        let Event::Statistics(stats) = AdminBefehl::ServerStatistics.ausfuehren(&task) else {
            panic!("Erwartet statistics");
        };
        assert!(stats.ist_leer());
    }

    #[test]
    fn fehlende_und_unbekannte_befehle() {
        let task = task_mit_runden(0);
        assert_eq!(
            text(&AdminBefehl::Fehlt.ausfuehren(&task)),
            ("error", "No command specified".into())
        );
        assert_eq!(
            text(&AdminBefehl::Unbekannt("reboot".into()).ausfuehren(&task)),
            ("error", "Unknown command reboot".into())
        );
    }
}
