//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `AutotestServer` bindet einen TCP-Socket und uebergibt jede
//! eingehende Verbindung an den [`HandshakeDispatcher`]. Lese- und
//! Schreib-Task jeder Verbindung laufen als eigene tokio-Tasks.
//!
//! Beim Shutdown nimmt die Accept-Loop keine Verbindungen mehr an und
//! schliesst alle offenen Verbindungen.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use autotest_protocol::EventKind;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::watch;

use crate::connection::Connection;
use crate::dispatcher::HandshakeDispatcher;
use crate::error::SignalingResult;
use crate::server_state::SignalingState;

/// TCP-Server fuer Runner-, API- und Admin-Verbindungen
pub struct AutotestServer {
    listener: TcpListener,
    dispatcher: HandshakeDispatcher,
    offen: Arc<AtomicUsize>,
}

impl AutotestServer {
    /// Bindet den Listener (Port 0 waehlt einen freien Port)
    pub async fn binden(state: Arc<SignalingState>, addr: impl ToSocketAddrs) -> SignalingResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            dispatcher: HandshakeDispatcher::neu(state),
            offen: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Tatsaechlich gebundene Adresse
    pub fn local_addr(&self) -> SignalingResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Anzahl aktuell offener Verbindungen
    pub fn offene_verbindungen(&self) -> usize {
        self.offen.load(Ordering::SeqCst)
    }

    /// Accept-Loop; laeuft bis `shutdown_rx` `true` meldet
    pub async fn starten(self, mut shutdown_rx: watch::Receiver<bool>) -> SignalingResult<()> {
        let state = Arc::clone(self.dispatcher.state());
        tracing::info!(
            adresse = %self.local_addr()?,
            server = %state.config.server_name,
            aufgaben = state.registry.len(),
            "Autotest-Server gestartet"
        );

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let max = state.config.max_verbindungen;
                            if self.offen.load(Ordering::SeqCst) >= max {
                                tracing::warn!(peer = %peer_addr, max, "Server voll – Verbindung abgelehnt");
                                drop(stream);
                                continue;
                            }
                            if let Err(e) = stream.set_nodelay(true) {
                                tracing::debug!(peer = %peer_addr, fehler = %e, "TCP_NODELAY nicht gesetzt");
                            }

                            tracing::debug!(peer = %peer_addr, "Verbindung akzeptiert");

                            let verbindung = Connection::mit_frame_limit(
                                stream,
                                peer_addr.to_string(),
                                state.config.max_frame_bytes,
                            );
                            self.offen.fetch_add(1, Ordering::SeqCst);
                            let offen = Arc::clone(&self.offen);
                            verbindung.on(EventKind::Disconnect, move |_| {
                                offen.fetch_sub(1, Ordering::SeqCst);
                            });

                            self.dispatcher.verbindung_annehmen(verbindung.clone());
                            tokio::spawn(shutdown_weiterleiten(verbindung, shutdown_rx.clone()));
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Autotest-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("Autotest-Server gestoppt");
        Ok(())
    }
}

/// Schliesst die Verbindung beim Shutdown; endet mit der Verbindung
async fn shutdown_weiterleiten(verbindung: Connection, mut shutdown_rx: watch::Receiver<bool>) {
    tokio::select! {
        _ = verbindung.getrennt() => {}
        signal = shutdown_rx.wait_for(|stopp| *stopp) => {
            // Sender verworfen: kein Shutdown mehr moeglich
            if signal.is_ok() {
                verbindung.close();
            }
        }
    }
}
