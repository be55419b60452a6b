//! Aufgaben-Zustand und Konsens-Bewertung
//!
//! Eine `Task` haelt fuer eine Uebung alle Eingaben in Erzeugungsreihenfolge,
//! die Stimmen der Worker pro Eingabe und den Fortschritt jedes Workers.
//! Alle Sessions einer Uebung teilen sich dieselbe `Task` ueber ein `Arc`.
//!
//! ## Invarianten
//! - `fortschritt[w]` liegt immer in `0..=eingaben.len()`
//! - Steht ein Worker an der Front, wird genau eine neue Eingabe erzeugt
//! - Ein Worker steht pro Eingabe in genau einem Ausgabe-Topf
//! - Leere Toepfe werden sofort entfernt

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use autotest_core::{InputId, TaskId, WorkerId};
use autotest_protocol::StatisticsSnapshot;
use parking_lot::Mutex;

use crate::error::{GradingError, GradingResult};
use crate::generator::InputGenerator;

/// Eine Ausgabe gilt als korrekt wenn mehr als die Haelfte uebereinstimmt
pub const KONSENS_SCHWELLE: f64 = 0.5;

/// Ausgabe -> Worker mit genau dieser Ausgabe
pub type Ausgaben = BTreeMap<String, Vec<WorkerId>>;

// ---------------------------------------------------------------------------
// Ergebnistypen
// ---------------------------------------------------------------------------

/// Eine zugeteilte Runde
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runde {
    pub input_id: InputId,
    pub input: String,
    /// Rundenindex (0-basiert), entspricht der Position in der Eingabe-Reihenfolge
    pub index: usize,
}

/// Stimmenstand nach dem Eintragen einer Ausgabe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Abstimmung {
    pub same_output: usize,
    pub total: usize,
    pub similarity: f64,
}

impl Abstimmung {
    /// True wenn die Ausgabe die Mehrheit hat
    pub fn angenommen(&self) -> bool {
        self.similarity > KONSENS_SCHWELLE
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TaskZustand {
    eingabe_reihenfolge: Vec<InputId>,
    eingaben: HashMap<InputId, String>,
    stimmen: HashMap<InputId, Ausgaben>,
    letzte_ausgabe: HashMap<WorkerId, HashMap<InputId, String>>,
    fortschritt: HashMap<WorkerId, usize>,
}

impl TaskZustand {
    /// Erzeugt bei Bedarf die Eingabe an Position `index`
    fn frontier_sichern(&mut self, index: usize, generator: &dyn InputGenerator) -> InputId {
        let index = index.min(self.eingabe_reihenfolge.len());
        if let Some(id) = self.eingabe_reihenfolge.get(index) {
            return id.clone();
        }

        let id = InputId::zufaellig();
        let eingabe = generator.generate();
        tracing::debug!(input_id = %id, index, bytes = eingabe.len(), "Neue Eingabe erzeugt");

        self.eingabe_reihenfolge.push(id.clone());
        self.eingaben.insert(id.clone(), eingabe);
        self.stimmen.insert(id.clone(), Ausgaben::new());
        id
    }

    fn aus_toepfen_entfernen(toepfe: &mut Ausgaben, worker_id: &WorkerId) {
        for worker in toepfe.values_mut() {
            worker.retain(|w| w != worker_id);
        }
        toepfe.retain(|_, worker| !worker.is_empty());
    }
}

/// Gemeinsamer Bewertungs-Zustand einer Uebung
pub struct Task {
    id: TaskId,
    generator: Arc<dyn InputGenerator>,
    zustand: Mutex<TaskZustand>,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("eingaben", &self.anzahl_eingaben())
            .finish_non_exhaustive()
    }
}

impl Task {
    /// Erstellt eine leere Aufgabe mit dem gegebenen Generator
    pub fn neu(id: impl Into<TaskId>, generator: Arc<dyn InputGenerator>) -> Self {
        Self {
            id: id.into(),
            generator,
            zustand: Mutex::new(TaskZustand::default()),
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// Anzahl der bisher erzeugten Eingaben
    pub fn anzahl_eingaben(&self) -> usize {
        self.zustand.lock().eingabe_reihenfolge.len()
    }

    /// Aktueller Fortschritt eines Workers (0 fuer unbekannte Worker)
    pub fn fortschritt(&self, worker_id: &WorkerId) -> usize {
        self.zustand
            .lock()
            .fortschritt
            .get(worker_id)
            .copied()
            .unwrap_or(0)
    }

    /// Stellt sicher dass an Position `index` eine Eingabe existiert
    ///
    /// Nur an der Front (`index == anzahl_eingaben()`) wird der Generator
    /// aufgerufen. Groessere Indizes werden auf die Front begrenzt.
    pub fn ensure_frontier_input(&self, index: usize) -> InputId {
        let mut zustand = self.zustand.lock();
        zustand.frontier_sichern(index, self.generator.as_ref())
    }

    /// Teilt einem Worker seine naechste Runde zu und erhoeht den Fortschritt
    pub fn start_round(&self, worker_id: &WorkerId) -> Runde {
        let mut zustand = self.zustand.lock();

        let index = zustand
            .fortschritt
            .get(worker_id)
            .copied()
            .unwrap_or(0)
            .min(zustand.eingabe_reihenfolge.len());

        let input_id = zustand.frontier_sichern(index, self.generator.as_ref());
        zustand.fortschritt.insert(worker_id.clone(), index + 1);

        let input = zustand.eingaben.get(&input_id).cloned().unwrap_or_default();

        tracing::debug!(
            task_id = %self.id,
            worker_id = %worker_id,
            runde = index,
            "Runde zugeteilt"
        );

        Runde {
            input_id,
            input,
            index,
        }
    }

    /// Traegt die Ausgabe eines Workers ein und liefert den neuen Stimmenstand
    ///
    /// Eine fruehere Stimme desselben Workers fuer diese Eingabe wird ersetzt.
    pub fn record_outcome(
        &self,
        worker_id: &WorkerId,
        input_id: &InputId,
        output: &str,
    ) -> GradingResult<Abstimmung> {
        let mut zustand = self.zustand.lock();

        let toepfe = zustand
            .stimmen
            .get_mut(input_id)
            .ok_or_else(|| GradingError::UnknownInput(input_id.clone()))?;

        TaskZustand::aus_toepfen_entfernen(toepfe, worker_id);
        toepfe
            .entry(output.to_string())
            .or_default()
            .push(worker_id.clone());

        let total: usize = toepfe.values().map(Vec::len).sum();
        let same_output = toepfe.get(output).map(Vec::len).unwrap_or(0);

        zustand
            .letzte_ausgabe
            .entry(worker_id.clone())
            .or_default()
            .insert(input_id.clone(), output.to_string());

        Ok(Abstimmung {
            same_output,
            total,
            similarity: same_output as f64 / total as f64,
        })
    }

    /// Setzt den Fortschritt eines Workers auf `value`
    pub fn set_progress(&self, worker_id: &WorkerId, value: i64) -> GradingResult<()> {
        let mut zustand = self.zustand.lock();
        let max = zustand.eingabe_reihenfolge.len();

        let index = usize::try_from(value)
            .ok()
            .filter(|i| *i <= max)
            .ok_or(GradingError::OutOfRange { value, max })?;

        zustand.fortschritt.insert(worker_id.clone(), index);
        tracing::info!(task_id = %self.id, worker_id = %worker_id, fortschritt = index, "Fortschritt gesetzt");
        Ok(())
    }

    /// Entfernt alle Stimmen eines Workers und setzt seinen Fortschritt zurueck
    pub fn purge_worker(&self, worker_id: &WorkerId) {
        let mut zustand = self.zustand.lock();

        zustand.fortschritt.insert(worker_id.clone(), 0);
        for toepfe in zustand.stimmen.values_mut() {
            TaskZustand::aus_toepfen_entfernen(toepfe, worker_id);
        }
        zustand.letzte_ausgabe.remove(worker_id);

        tracing::info!(task_id = %self.id, worker_id = %worker_id, "Worker-Daten geloescht");
    }

    /// Setzt die gesamte Aufgabe zurueck
    pub fn purge_all(&self) {
        *self.zustand.lock() = TaskZustand::default();
        tracing::info!(task_id = %self.id, "Alle Aufgaben-Daten geloescht");
    }

    /// Kopie des gesamten Zustands fuer Diagnosezwecke
    pub fn statistics_snapshot(&self) -> StatisticsSnapshot {
        let zustand = self.zustand.lock();

        StatisticsSnapshot {
            worker_progress: zustand
                .fortschritt
                .iter()
                .map(|(w, p)| (w.clone(), *p))
                .collect(),
            input_id_to_input: zustand
                .eingaben
                .iter()
                .map(|(id, e)| (id.clone(), e.clone()))
                .collect(),
            input_id_to_output_to_worker_ids: zustand
                .stimmen
                .iter()
                .map(|(id, t)| (id.clone(), t.clone()))
                .collect(),
            worker_id_to_input_id_to_output: zustand
                .letzte_ausgabe
                .iter()
                .map(|(w, a)| {
                    let ausgaben = a.iter().map(|(id, o)| (id.clone(), o.clone())).collect();
                    (w.clone(), ausgaben)
                })
                .collect(),
            input_id_in_order: zustand.eingabe_reihenfolge.clone(),
        }
    }

    /// Gespeicherte Eingabe zu einer ID
    pub fn input_by_id(&self, input_id: &InputId) -> Option<String> {
        self.zustand.lock().eingaben.get(input_id).cloned()
    }

    /// Alle bisherigen Ausgaben fuer eine Eingabe
    pub fn all_outputs(&self, input_id: &InputId) -> Ausgaben {
        self.zustand
            .lock()
            .stimmen
            .get(input_id)
            .cloned()
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
