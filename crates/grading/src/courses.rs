//! Eingebaute Eingabe-Rezepte der Kurse
//!
//! Jedes Rezept gibt es in zwei Formen: `<name>_mit(rng)` fuer reproduzierbare
//! Tests mit eigenem Zufallsgenerator und `<name>()` mit dem Thread-RNG, die
//! direkt als [`InputGenerator`] taugt.

use std::sync::Arc;

use rand::Rng;

use crate::generator::InputGenerator;

// ---------------------------------------------------------------------------
// Registrierung
// ---------------------------------------------------------------------------

/// IDs aller eingebauten Aufgaben
pub const EINGEBAUTE_AUFGABEN: [&str; 4] = [
    "going_electric",
    "cs2521_lab1_1",
    "cs2521_lab1_2",
    "cs2521_lab2_2",
];

/// Sucht das eingebaute Rezept zu einer Aufgaben-ID
pub fn rezept(task_id: &str) -> Option<Arc<dyn InputGenerator>> {
    let generator: Arc<dyn InputGenerator> = match task_id {
        "going_electric" => Arc::new(going_electric),
        "cs2521_lab1_1" => Arc::new(cs2521_lab1_1),
        "cs2521_lab1_2" => Arc::new(cs2521_lab1_2),
        "cs2521_lab2_2" => Arc::new(cs2521_lab2_2),
        _ => return None,
    };
    Some(generator)
}

// ---------------------------------------------------------------------------
// going_electric
// ---------------------------------------------------------------------------

/// Startwert gefolgt von 5 bis 15 Ladestationen, getrennt durch Leerzeichen
pub fn going_electric_mit<R: Rng + ?Sized>(rng: &mut R) -> String {
    let anzahl: usize = rng.random_range(5..=15);
    let mut werte: Vec<u32> = Vec::with_capacity(anzahl + 1);
    werte.push(rng.random_range(0..=5));

    for _ in 0..anzahl {
        let wert = match rng.random_range(0..=4) {
            0 => 0,
            1 => rng.random_range(0..=2),
            2 => rng.random_range(3..=5),
            3 => rng.random_range(0..=10),
            _ => rng.random_range(0..=5),
        };
        werte.push(wert);
    }

    verbinden(&werte, " ")
}

pub fn going_electric() -> String {
    going_electric_mit(&mut rand::rng())
}

// ---------------------------------------------------------------------------
// cs2521 Lab 1
// ---------------------------------------------------------------------------

/// Sortiertes Einfuegen: Zeile 1 sortierte Liste, Zeile 2 der neue Wert
pub fn cs2521_lab1_1_mit<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut liste = zufallsliste(rng);
    liste.sort_unstable();
    let neu: i32 = rng.random_range(-1500..=1500);
    format!("{}\n{}", verbinden(&liste, " "), neu)
}

pub fn cs2521_lab1_1() -> String {
    cs2521_lab1_1_mit(&mut rand::rng())
}

/// Eine Zeile mit bis zu 1000 unsortierten Zahlen
pub fn cs2521_lab1_2_mit<R: Rng + ?Sized>(rng: &mut R) -> String {
    verbinden(&zufallsliste(rng), " ")
}

pub fn cs2521_lab1_2() -> String {
    cs2521_lab1_2_mit(&mut rand::rng())
}

fn zufallsliste<R: Rng + ?Sized>(rng: &mut R) -> Vec<i32> {
    let anzahl: usize = rng.random_range(0..=1000);
    (0..anzahl).map(|_| rng.random_range(-1000..=1000)).collect()
}

// ---------------------------------------------------------------------------
// cs2521 Lab 2
// ---------------------------------------------------------------------------

/// Warteschlangen-Befehle, abgeschlossen mit `q`
///
/// - `+ n`  einreihen (Gruppe von 1 bis 100)
/// - `-`    entnehmen (Gruppe von 1 bis 100)
/// - `f`    vorderstes Element
/// - `s`    Groesse
pub fn cs2521_lab2_2_mit<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut befehle = Vec::new();

    for _ in 0..rng.random_range(5..=100) {
        match rng.random_range(0..4) {
            0 => {
                for _ in 0..rng.random_range(1..=100) {
                    let n: i32 = rng.random_range(-1000..=1000);
                    befehle.push(format!("+ {n}"));
                }
            }
            1 => {
                for _ in 0..rng.random_range(1..=100) {
                    befehle.push("-".to_string());
                }
            }
            2 => befehle.push("f".to_string()),
            _ => befehle.push("s".to_string()),
        }
    }
    befehle.push("q".to_string());

    befehle.join("\n")
}

pub fn cs2521_lab2_2() -> String {
    cs2521_lab2_2_mit(&mut rand::rng())
}

fn verbinden<T: ToString>(werte: &[T], trenner: &str) -> String {
    werte
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(trenner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn zahlen(zeile: &str) -> Vec<i32> {
        zeile
            .split_whitespace()
            .map(|s| s.parse().unwrap())
            .collect()
    }

    #[test]
    fn alle_eingebauten_aufgaben_haben_ein_rezept() {
        for id in EINGEBAUTE_AUFGABEN {
            let generator = rezept(id).unwrap_or_else(|| panic!("Rezept fuer {id} fehlt"));
            assert!(!generator.generate().contains('\r'));
        }
        assert!(rezept("unbekannt").is_none());
    }

    #[test]
    fn going_electric_wertebereiche() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let werte = zahlen(&going_electric_mit(&mut rng));
            assert!((6..=16).contains(&werte.len()), "Laenge {}", werte.len());
            assert!((0..=5).contains(&werte[0]));
            assert!(werte[1..].iter().all(|w| (0..=10).contains(w)));
        }
    }

    #[test]
    fn lab1_1_erste_zeile_sortiert() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let eingabe = cs2521_lab1_1_mit(&mut rng);
            let zeilen: Vec<&str> = eingabe.split('\n').collect();
            assert_eq!(zeilen.len(), 2);

            let liste = zahlen(zeilen[0]);
            assert!(liste.len() <= 1000);
            assert!(liste.windows(2).all(|p| p[0] <= p[1]));
            assert!(liste.iter().all(|w| (-1000..=1000).contains(w)));

            let neu: i32 = zeilen[1].parse().unwrap();
            assert!((-1500..=1500).contains(&neu));
        }
    }

    #[test]
    fn lab1_2_eine_zeile() {
        let mut rng = StdRng::seed_from_u64(3);
        let eingabe = cs2521_lab1_2_mit(&mut rng);
        assert!(!eingabe.contains('\n'));
        assert!(zahlen(&eingabe).iter().all(|w| (-1000..=1000).contains(w)));
    }

    #[test]
    fn lab2_2_befehlsformat() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            let eingabe = cs2521_lab2_2_mit(&mut rng);
            let zeilen: Vec<&str> = eingabe.lines().collect();
            assert_eq!(zeilen.last(), Some(&"q"));
            assert!(zeilen.len() >= 6);

            for zeile in &zeilen[..zeilen.len() - 1] {
                match *zeile {
                    "-" | "f" | "s" => {}
                    z => {
                        let n: i32 = z.strip_prefix("+ ").unwrap().parse().unwrap();
                        assert!((-1000..=1000).contains(&n));
                    }
                }
            }
        }
    }

    #[test]
    fn gleicher_seed_gleiche_eingabe() {
        let a = going_electric_mit(&mut StdRng::seed_from_u64(42));
        let b = going_electric_mit(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
