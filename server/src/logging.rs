//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `AUTOTEST_LOG_LEVEL`: Filter-Direktive, ueberschreibt `[logging] level`
//! - `AUTOTEST_LOG_FORMAT`: Format (text/json), ueberschreibt `[logging] format`

use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "AUTOTEST_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "AUTOTEST_LOG_FORMAT";

/// Initialisiert das Logging-System.
///
/// Faellt auf `info` / `text` zurueck falls nichts Gueltiges gesetzt ist.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match format_waehlen(std::env::var(ENV_LOG_FORMAT).ok().as_deref(), format) {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(true)
                .init();
        }
        _ => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Umgebung vor Konfiguration; ungueltige Werte werden uebergangen
fn format_waehlen<'a>(aus_env: Option<&'a str>, aus_config: &'a str) -> &'a str {
    match aus_env {
        Some(f) if log_format_gueltig(f) => f,
        _ if log_format_gueltig(aus_config) => aus_config,
        _ => "text",
    }
}

/// Validiert eine Filter-Direktive (`info`, `info,autotest_signaling=debug`, ...)
pub fn log_filter_gueltig(level: &str) -> bool {
    EnvFilter::try_new(level).is_ok()
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_werte() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(log_filter_gueltig(level));
        }
        assert!(log_filter_gueltig("info,autotest_signaling=debug"));
        assert!(log_filter_gueltig("warn,autotest_grading[runde]=trace"));
        assert!(!log_filter_gueltig("autotest_signaling=sehr_laut"));
        assert!(!log_filter_gueltig("info,autotest_grading=42x"));
    }

    #[test]
    fn log_format_werte() {
        assert!(log_format_gueltig("text"));
        assert!(log_format_gueltig("json"));
        assert!(!log_format_gueltig("xml"));
        assert!(!log_format_gueltig("JSON"));
    }

    #[test]
    fn umgebung_ueberschreibt_konfiguration() {
        assert_eq!(format_waehlen(Some("json"), "text"), "json");
        assert_eq!(format_waehlen(None, "json"), "json");
        assert_eq!(format_waehlen(Some("xml"), "json"), "json");
        assert_eq!(format_waehlen(Some("xml"), "yaml"), "text");
    }
}
