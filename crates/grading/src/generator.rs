//! Eingabe-Generatoren
//!
//! Ein Generator liefert pro Aufruf eine neue, zufaellige Eingabe als
//! undurchsichtigen Text. Die Engine interpretiert den Inhalt nie.

/// Erzeugt neue Eingaben fuer eine Aufgabe
pub trait InputGenerator: Send + Sync {
    fn generate(&self) -> String;
}

impl<F> InputGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate(&self) -> String {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn closure_als_generator() {
        let zaehler = AtomicUsize::new(0);
        let generator = move || format!("eingabe-{}", zaehler.fetch_add(1, Ordering::SeqCst));
        assert_eq!(generator.generate(), "eingabe-0");
        assert_eq!(generator.generate(), "eingabe-1");
    }

    #[test]
    fn generator_als_trait_objekt() {
        let generator: Arc<dyn InputGenerator> = Arc::new(|| "fest".to_string());
        assert_eq!(generator.generate(), "fest");
    }
}
