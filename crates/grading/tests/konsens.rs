//! Bewertung ueber mehrere Runden mit eingebauten Rezepten

use std::sync::Arc;
use std::thread;

use autotest_core::WorkerId;
use autotest_grading::{admin_control_beantworten, courses, GradingError, Task};
use autotest_protocol::{AdminControl, Event};

/// Referenzloesung fuer cs2521_lab1_2: Eingabe sortiert ausgeben
fn sortiert(eingabe: &str) -> String {
    let mut zahlen: Vec<i64> = eingabe
        .split_whitespace()
        .filter_map(|z| z.parse().ok())
        .collect();
    zahlen.sort_unstable();
    let zeile: Vec<String> = zahlen.iter().map(i64::to_string).collect();
    format!("{}\n", zeile.join(" "))
}

#[test]
fn korrekte_loesungen_erreichen_konsens() {
    let generator = courses::rezept("cs2521_lab1_2").unwrap();
    let task = Arc::new(Task::neu("cs2521_lab1_2", generator));

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let task = Arc::clone(&task);
            thread::spawn(move || {
                let worker = WorkerId::from(format!("w{n}").as_str());
                (0..5)
                    .map(|_| {
                        let runde = task.start_round(&worker);
                        task.record_outcome(&worker, &runde.input_id, &sortiert(&runde.input))
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for stand in handle.join().unwrap() {
            assert_eq!(stand.same_output, stand.total);
            assert!(stand.angenommen());
        }
    }

    // Alle Worker haben dieselben fuenf Eingaben bearbeitet
    assert_eq!(task.anzahl_eingaben(), 5);
    let stats = task.statistics_snapshot();
    assert_eq!(stats.input_id_in_order.len(), 5);
    assert!(stats.worker_progress.values().all(|p| *p == 5));
    for toepfe in stats.input_id_to_output_to_worker_ids.values() {
        assert_eq!(toepfe.len(), 1);
        assert_eq!(toepfe.values().next().unwrap().len(), 4);
    }
}

#[test]
fn falsche_loesung_wird_ueberstimmt() {
    let task = Task::neu("cs2521_lab1_1", courses::rezept("cs2521_lab1_1").unwrap());

    let mut letzter = None;
    for (worker, richtig) in [("a", true), ("b", true), ("c", false)] {
        let worker = WorkerId::from(worker);
        let runde = task.start_round(&worker);
        let ausgabe = if richtig { "ok\n" } else { "falsch\n" };
        letzter = Some(task.record_outcome(&worker, &runde.input_id, ausgabe).unwrap());
    }

    let stand = letzter.unwrap();
    assert_eq!((stand.same_output, stand.total), (1, 3));
    assert!(!stand.angenommen());
}

#[test]
fn admin_purge_all_verwirft_offene_runden() {
    let task = Task::neu("going_electric", courses::rezept("going_electric").unwrap());
    let worker = WorkerId::from("a");
    let runde = task.start_round(&worker);

    let [antwort, ende] = admin_control_beantworten(
        &task,
        &AdminControl {
            command: Some("purge-all".into()),
            ..AdminControl::default()
        },
        &worker,
    );
    assert_eq!(antwort, Event::message("Purged all data."));
    assert_eq!(ende, Event::Completed);

    assert_eq!(
        task.record_outcome(&worker, &runde.input_id, "x"),
        Err(GradingError::UnknownInput(runde.input_id.clone()))
    );
    assert_eq!(task.fortschritt(&worker), 0);
}
