//! Aufgaben-Registry und Zugangspruefung
//!
//! Die Registry wird beim Start einmal aufgebaut und danach nur noch
//! gelesen. Sie bildet Aufgaben-IDs auf die gemeinsam genutzten
//! [`Task`]-Instanzen ab.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use autotest_core::TaskId;
use autotest_grading::{courses, GradingError, InputGenerator, Task};

// ---------------------------------------------------------------------------
// TaskRegistry
// ---------------------------------------------------------------------------

/// Unveraenderliche Zuordnung Aufgaben-ID -> Task
#[derive(Debug, Default)]
pub struct TaskRegistry {
    aufgaben: HashMap<TaskId, Arc<Task>>,
}

impl TaskRegistry {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Baut eine Registry aus eingebauten Rezepten
    ///
    /// Schlaegt fehl sobald eine ID kein eingebautes Rezept hat.
    pub fn aus_eingebauten<S: AsRef<str>>(ids: &[S]) -> Result<Self, GradingError> {
        let mut registry = Self::neu();
        for id in ids {
            let id = id.as_ref();
            let generator =
                courses::rezept(id).ok_or_else(|| GradingError::UnknownTask(TaskId::from(id)))?;
            registry.registrieren(id, generator);
        }
        Ok(registry)
    }

    /// Registriert eine Aufgabe; eine vorhandene gleiche ID wird ersetzt
    pub fn registrieren(
        &mut self,
        id: impl Into<TaskId>,
        generator: Arc<dyn InputGenerator>,
    ) -> Arc<Task> {
        let id = id.into();
        let task = Arc::new(Task::neu(id.clone(), generator));
        if self.aufgaben.insert(id.clone(), Arc::clone(&task)).is_some() {
            tracing::warn!(task_id = %id, "Aufgabe doppelt registriert – ersetzt");
        }
        task
    }

    pub fn finden(&self, id: &str) -> Option<Arc<Task>> {
        self.aufgaben.get(id).cloned()
    }

    /// Alle registrierten IDs (sortiert)
    pub fn ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.aufgaben.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.aufgaben.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aufgaben.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Zugangspruefung
// ---------------------------------------------------------------------------

/// Externe Pruefung ob eine Identitaet teilnehmen darf
pub trait Zugangspruefung: Send + Sync {
    fn erlaubt(&self, z_id: &str) -> bool;
}

/// Einfache Allow-List aus der Konfiguration
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    ids: HashSet<String>,
    alle_erlauben: bool,
}

impl AllowList {
    pub fn neu<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            alle_erlauben: false,
        }
    }

    /// Laesst jede Identitaet zu (nur fuer Entwicklung und Tests)
    pub fn alle() -> Self {
        Self {
            ids: HashSet::new(),
            alle_erlauben: true,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Zugangspruefung for AllowList {
    fn erlaubt(&self, z_id: &str) -> bool {
        self.alle_erlauben || self.ids.contains(z_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eingebaute_aufgaben_registrieren() {
        let registry = TaskRegistry::aus_eingebauten(&courses::EINGEBAUTE_AUFGABEN).unwrap();
        assert_eq!(registry.len(), 4);
        assert!(registry.finden("going_electric").is_some());
        assert!(registry.finden("cs2521_lab3_1").is_none());
    }

    #[test]
    fn unbekanntes_rezept_ist_fehler() {
        let err = TaskRegistry::aus_eingebauten(&["going_electric", "gibts_nicht"]).unwrap_err();
        assert_eq!(err, GradingError::UnknownTask(TaskId::from("gibts_nicht")));
    }

    #[test]
    fn gleiche_id_liefert_dieselbe_task() {
        let mut registry = TaskRegistry::neu();
        let task = registry.registrieren("eigene", Arc::new(|| "x".to_string()));
        assert!(Arc::ptr_eq(&task, &registry.finden("eigene").unwrap()));
        assert_eq!(registry.ids(), vec![TaskId::from("eigene")]);
    }

    #[test]
    fn allow_list() {
        let liste = AllowList::neu(["z1234567"]);
        assert!(liste.erlaubt("z1234567"));
        assert!(!liste.erlaubt("z7654321"));
        assert!(!AllowList::default().erlaubt("z1234567"));
        assert!(AllowList::alle().erlaubt("beliebig"));
    }
}
