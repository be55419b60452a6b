//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use autotest_core::{AutotestError, Result};
use autotest_grading::courses::EINGEBAUTE_AUFGABEN;
use autotest_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use autotest_signaling::SignalingConfig;
use serde::{Deserialize, Serialize};

use crate::logging::{log_filter_gueltig, log_format_gueltig};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Zugelassene Identitaeten
    pub zugang: ZugangEinstellungen,
    /// Zu registrierende Aufgaben
    pub aufgaben: AufgabenEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Cloud-Autotest Server".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    pub bind_adresse: String,
    pub port: u16,
    /// Maximale Anzahl gleichzeitiger Verbindungen
    pub max_verbindungen: usize,
    /// Maximale Groesse eines einzelnen Frames in Bytes
    pub max_frame_bytes: usize,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 15000,
            max_verbindungen: 256,
            max_frame_bytes: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Allow-List fuer `hello.zId`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZugangEinstellungen {
    pub erlaubte_ids: Vec<String>,
    /// Jede Identitaet zulassen (nur Entwicklung)
    pub alle_erlauben: bool,
}

/// Aufgaben-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AufgabenEinstellungen {
    /// IDs der eingebauten Aufgaben, die angeboten werden
    pub aktiviert: Vec<String>,
}

impl Default for AufgabenEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: EINGEBAUTE_AUFGABEN.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt).map_err(|e| match e {
                AutotestError::Konfiguration(msg) => {
                    AutotestError::Konfiguration(format!("'{pfad}': {msg}"))
                }
                andere => andere,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Parst und prueft eine Konfiguration aus einem TOML-String
    pub fn aus_toml(inhalt: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(inhalt).map_err(|e| AutotestError::Konfiguration(e.to_string()))?;
        config.pruefen()?;
        Ok(config)
    }

    /// Prueft Werte, die serde allein nicht abdeckt
    pub fn pruefen(&self) -> Result<()> {
        if !log_filter_gueltig(&self.logging.level) {
            return Err(AutotestError::Konfiguration(format!(
                "Ungueltiger Log-Filter '{}'",
                self.logging.level
            )));
        }
        if !log_format_gueltig(&self.logging.format) {
            return Err(AutotestError::Konfiguration(format!(
                "Ungueltiges Log-Format '{}'",
                self.logging.format
            )));
        }
        if self.netzwerk.max_verbindungen == 0 {
            return Err(AutotestError::Konfiguration(
                "max_verbindungen muss groesser als 0 sein".into(),
            ));
        }
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port)
    }

    /// Limits und Anzeigename fuer den Signaling-Service
    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            server_name: self.server.name.clone(),
            max_verbindungen: self.netzwerk.max_verbindungen,
            max_frame_bytes: self.netzwerk.max_frame_bytes,
        }
    }
}
