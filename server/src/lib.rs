//! autotest-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;
pub mod logging;

use std::sync::Arc;

use autotest_core::{AutotestError, Result};
use autotest_signaling::{AllowList, AutotestServer, SignalingState, TaskRegistry};
use config::ServerConfig;
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
    state: Arc<SignalingState>,
}

impl Server {
    /// Baut Registry und Allow-List aus der Konfiguration
    ///
    /// Unbekannte Aufgaben in `[aufgaben] aktiviert` sind ein
    /// Konfigurationsfehler.
    pub fn neu(config: ServerConfig) -> Result<Self> {
        config.pruefen()?;

        let registry = TaskRegistry::aus_eingebauten(&config.aufgaben.aktiviert)
            .map_err(|e| AutotestError::Konfiguration(e.to_string()))?;

        let zugang = if config.zugang.alle_erlauben {
            tracing::warn!("Allow-List deaktiviert – jede zId wird zugelassen");
            AllowList::alle()
        } else {
            if config.zugang.erlaubte_ids.is_empty() {
                tracing::warn!("Allow-List ist leer – kein Runner kann sich anmelden");
            }
            AllowList::neu(config.zugang.erlaubte_ids.iter().cloned())
        };

        let state = SignalingState::neu(config.signaling_config(), registry, Arc::new(zugang));
        Ok(Self { config, state })
    }

    pub fn state(&self) -> &Arc<SignalingState> {
        &self.state
    }

    /// Bindet den TCP-Listener an die konfigurierte Adresse
    pub async fn binden(&self) -> Result<AutotestServer> {
        AutotestServer::binden(Arc::clone(&self.state), self.config.bind_adresse())
            .await
            .map_err(|e| AutotestError::Verbindung(e.to_string()))
    }

    /// Startet den Server und laeuft bis zum Shutdown-Signal (Ctrl-C)
    pub async fn starten(self) -> anyhow::Result<()> {
        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %self.config.bind_adresse(),
            aufgaben = ?self.state.registry.ids(),
            "Server startet"
        );

        let listener = self.binden().await.inspect_err(|e| {
            if e.ist_verbindungsfehler() {
                tracing::error!(adresse = %self.config.bind_adresse(), fehler = %e, "Listener nicht gebunden");
            }
        })?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown-Signal empfangen, Server wird beendet"),
                Err(e) => tracing::error!(fehler = %e, "Ctrl-C-Handler nicht installierbar"),
            }
            shutdown_tx.send_replace(true);
        });

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        listener.starten(shutdown_rx).await?;
        Ok(())
    }
}
