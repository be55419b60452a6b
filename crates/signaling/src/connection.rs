//! Connection – Ereignis-Kanal ueber einen Byte-Stream
//!
//! Eine `Connection` kapselt einen beliebigen Duplex-Transport (TCP, oder
//! `tokio::io::duplex` in Tests) und bietet darauf:
//!
//! - `send`: fire-and-forget, nicht blockierend, aus jedem Task aufrufbar
//! - `on` / `off`: Handler pro Ereignisname
//! - `wait_for`: einmaliges Warten auf das naechste Ereignis eines Namens
//!
//! ## Tasks
//! ```text
//!              +-> Lese-Task  (FramedRead, einziger Leser, dispatcht)
//! Connection --+
//!              +-> Schreib-Task (FramedWrite, leert die Sende-Queue)
//! ```
//!
//! Der Lese-Task ist der einzige, der den Verbindungszustand auf "getrennt"
//! setzt. Danach wird lokal `disconnect` ausgeloest und alle offenen
//! Wartenden erhalten `ConnectionError::Disconnected`.
//!
//! ## Dispatch
//! 1. Wartet jemand auf den Namen, bekommt er das Ereignis (bei `capture`
//!    endet der Dispatch hier)
//! 2. Sind Handler registriert, laufen alle in Registrierungsreihenfolge
//! 3. Sonst landet das Ereignis im Replay-Puffer bis zum ersten `on`
//!
//! Das erste `on` liefert den Puffer aus. Solange diese Zustellung laeuft,
//! werden neue Ereignisse desselben Namens weiter gepuffert und vom
//! zustellenden Aufrufer hinterher an alle Handler verteilt. Die
//! Ankunftsreihenfolge bleibt so erhalten und kein Handler laeuft doppelt.
//!
//! Waehrend ein Handler laeuft wird kein Lock gehalten, Handler duerfen also
//! `send`, `on`, `off` und `local_fire` selbst aufrufen.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use autotest_protocol::wire::{LineCodec, DEFAULT_MAX_FRAME_SIZE};
use autotest_protocol::{Event, EventKind, ProtocolError};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::error::ConnectionError;

/// Ereignis-Handler
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Kennung eines registrierten Handlers (fuer `off`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Leser = Box<dyn AsyncRead + Send + Unpin>;
type Schreiber = Box<dyn AsyncWrite + Send + Unpin>;

/// Eintrag der Sende-Queue
enum Ausgehend {
    Frame(Event),
    /// Queue bis hierhin leeren, dann Transport schliessen
    Schliessen,
}

/// Transport-Haelften bis `run()` sie an die Tasks uebergibt
struct Transport {
    leser: Leser,
    schreiber: Schreiber,
    sende_rx: mpsc::UnboundedReceiver<Ausgehend>,
}

#[derive(Default)]
struct Verteilung {
    handler: HashMap<EventKind, Vec<(HandlerId, Handler)>>,
    puffer: HashMap<EventKind, VecDeque<Event>>,
    /// Namen, deren Puffer gerade von `on` ausgeliefert wird
    zustellung: HashSet<EventKind>,
}

struct Warten {
    tx: oneshot::Sender<Event>,
    capture: bool,
}

struct ConnectionInner {
    peer: String,
    max_frame_size: usize,
    /// Wird nur unter dem `warten`-Lock auf `false` gesetzt
    verbunden: AtomicBool,
    gestartet: AtomicBool,
    geschlossen: AtomicBool,
    getrennt_gemeldet: AtomicBool,
    naechste_handler_id: AtomicU64,
    verteilung: Mutex<Verteilung>,
    warten: Mutex<HashMap<EventKind, Warten>>,
    sende_tx: mpsc::UnboundedSender<Ausgehend>,
    transport: Mutex<Option<Transport>>,
    /// Schreib-Task -> Lese-Task: Transport ist geschlossen
    stopp_tx: watch::Sender<bool>,
    getrennt_tx: watch::Sender<bool>,
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Ereignis-Kanal ueber einen Duplex-Transport
///
/// Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.inner.peer)
            .field("verbunden", &self.ist_verbunden())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Umschliesst einen Transport mit Standard-Frame-Limit
    pub fn neu<T>(io: T, peer: impl Into<String>) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::mit_frame_limit(io, peer, DEFAULT_MAX_FRAME_SIZE)
    }

    /// Umschliesst einen Transport mit eigener maximaler Frame-Groesse
    pub fn mit_frame_limit<T>(io: T, peer: impl Into<String>, max_frame_size: usize) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (leser, schreiber) = tokio::io::split(io);
        let (sende_tx, sende_rx) = mpsc::unbounded_channel();
        let (stopp_tx, _) = watch::channel(false);
        let (getrennt_tx, _) = watch::channel(false);

        Self {
            inner: Arc::new(ConnectionInner {
                peer: peer.into(),
                max_frame_size,
                verbunden: AtomicBool::new(true),
                gestartet: AtomicBool::new(false),
                geschlossen: AtomicBool::new(false),
                getrennt_gemeldet: AtomicBool::new(false),
                naechste_handler_id: AtomicU64::new(1),
                verteilung: Mutex::new(Verteilung::default()),
                warten: Mutex::new(HashMap::new()),
                sende_tx,
                transport: Mutex::new(Some(Transport {
                    leser: Box::new(leser),
                    schreiber: Box::new(schreiber),
                    sende_rx,
                })),
                stopp_tx,
                getrennt_tx,
            }),
        }
    }

    /// Baut eine TCP-Verbindung auf (Client-Seite)
    ///
    /// Die Empfangsschleife wird noch nicht gestartet, damit vorher Handler
    /// und Wartende registriert werden koennen.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ConnectionError> {
        let stream = TcpStream::connect(addr).await?;
        let peer = stream.peer_addr()?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(peer = %peer, fehler = %e, "TCP_NODELAY nicht gesetzt");
        }
        Ok(Self::neu(stream, peer.to_string()))
    }

    /// Adresse bzw. Bezeichnung der Gegenstelle
    pub fn peer(&self) -> &str {
        &self.inner.peer
    }

    pub fn ist_verbunden(&self) -> bool {
        self.inner.verbunden.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Senden
    // -----------------------------------------------------------------------

    /// Reiht ein Ereignis in die Sende-Queue ein
    ///
    /// Nach der Trennung wird still verworfen. `disconnect` wird nie gesendet.
    pub fn send(&self, event: Event) {
        if !self.ist_verbunden() {
            tracing::trace!(peer = %self.inner.peer, ereignis = %event.kind(), "Nicht verbunden – Ereignis verworfen");
            return;
        }
        if event.kind().ist_lokal() {
            tracing::debug!(peer = %self.inner.peer, ereignis = %event.kind(), "Lokales Ereignis wird nicht gesendet");
            return;
        }
        let _ = self.inner.sende_tx.send(Ausgehend::Frame(event));
    }

    // -----------------------------------------------------------------------
    // Handler
    // -----------------------------------------------------------------------

    /// Registriert einen Handler fuer einen Ereignisnamen
    ///
    /// Gepufferte Ereignisse dieses Namens werden sofort in Ankunftsreihenfolge
    /// an den Handler geliefert und danach verworfen.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = HandlerId(self.inner.naechste_handler_id.fetch_add(1, Ordering::Relaxed));
        let handler: Handler = Arc::new(handler);

        let gepuffert = {
            let mut verteilung = self.inner.verteilung.lock();
            // Nach der Trennung werden keine Handler mehr gespeichert
            if !self.inner.getrennt_gemeldet.load(Ordering::SeqCst) {
                verteilung
                    .handler
                    .entry(kind)
                    .or_default()
                    .push((id, Arc::clone(&handler)));
            }
            // Laufende Zustellung verteilt ihren Rest auch an diesen Handler
            if verteilung.zustellung.contains(&kind) {
                return id;
            }
            let puffer = verteilung.puffer.remove(&kind).unwrap_or_default();
            if !puffer.is_empty() {
                verteilung.zustellung.insert(kind);
            }
            puffer
        };
        if gepuffert.is_empty() {
            return id;
        }

        for event in &gepuffert {
            handler(event);
        }
        self.nachzuegler_zustellen(kind);
        id
    }

    /// Verteilt Ereignisse, die waehrend der Puffer-Zustellung eintrafen
    fn nachzuegler_zustellen(&self, kind: EventKind) {
        loop {
            let (nachzuegler, handler): (VecDeque<Event>, Vec<Handler>) = {
                let mut verteilung = self.inner.verteilung.lock();
                match verteilung.puffer.remove(&kind) {
                    Some(puffer) if !puffer.is_empty() => {
                        let handler = verteilung
                            .handler
                            .get(&kind)
                            .map(|liste| liste.iter().map(|(_, h)| Arc::clone(h)).collect())
                            .unwrap_or_default();
                        (puffer, handler)
                    }
                    _ => {
                        verteilung.zustellung.remove(&kind);
                        return;
                    }
                }
            };

            for event in &nachzuegler {
                for h in &handler {
                    h(event);
                }
            }
        }
    }

    /// Entfernt einen Handler; unbekannte IDs werden ignoriert
    pub fn off(&self, kind: EventKind, id: HandlerId) {
        let mut verteilung = self.inner.verteilung.lock();
        if let Some(liste) = verteilung.handler.get_mut(&kind) {
            liste.retain(|(h, _)| *h != id);
        }
    }

    /// Dispatcht ein Ereignis lokal, als waere es empfangen worden
    pub fn local_fire(&self, event: Event) {
        let kind = event.kind();
        let mut event = event;

        // 1. Einmaliges Warten
        let wartend = self.inner.warten.lock().remove(&kind);
        if let Some(warten) = wartend {
            if warten.capture {
                match warten.tx.send(event) {
                    Ok(()) => return,
                    // Wartender hat aufgegeben, normal weiter verteilen
                    Err(zurueck) => event = zurueck,
                }
            } else {
                let _ = warten.tx.send(event.clone());
            }
        }

        // 2. Handler oder 3. Replay-Puffer
        let handler: Vec<Handler> = {
            let mut verteilung = self.inner.verteilung.lock();
            if verteilung.zustellung.contains(&kind) {
                verteilung.puffer.entry(kind).or_default().push_back(event);
                return;
            }
            match verteilung.handler.get(&kind) {
                Some(liste) => liste.iter().map(|(_, h)| Arc::clone(h)).collect(),
                None => {
                    tracing::trace!(peer = %self.inner.peer, ereignis = %kind, "Kein Handler – Ereignis gepuffert");
                    verteilung.puffer.entry(kind).or_default().push_back(event);
                    return;
                }
            }
        };

        for h in handler {
            h(&event);
        }
    }

    // -----------------------------------------------------------------------
    // Warten
    // -----------------------------------------------------------------------

    /// Belegt den Warte-Slot fuer einen Ereignisnamen
    ///
    /// Das zurueckgegebene [`EventWaiter`] erhaelt das naechste passende
    /// Ereignis, das nach diesem Aufruf eintrifft. Pro Name gibt es genau
    /// einen Slot; ein zweiter Versuch schlaegt fehl.
    pub fn register_wait(
        &self,
        kind: EventKind,
        capture: bool,
    ) -> Result<EventWaiter, ConnectionError> {
        let mut warten = self.inner.warten.lock();

        if !self.ist_verbunden() {
            return Err(ConnectionError::Disconnected);
        }
        if let Some(alt) = warten.get(&kind) {
            if !alt.tx.is_closed() {
                tracing::warn!(peer = %self.inner.peer, ereignis = %kind, "Es wird bereits auf dieses Ereignis gewartet");
                return Err(ConnectionError::WarteSlotBelegt(kind));
            }
        }

        let (tx, rx) = oneshot::channel();
        warten.insert(kind, Warten { tx, capture });
        Ok(EventWaiter { kind, rx })
    }

    /// Wartet auf das naechste Ereignis des gegebenen Namens
    ///
    /// `capture = true` verbirgt das Ereignis vor allen Handlern.
    pub async fn wait_for(&self, kind: EventKind, capture: bool) -> Result<Event, ConnectionError> {
        self.register_wait(kind, capture)?.recv().await
    }

    /// Wartet bis die Verbindung getrennt ist
    pub async fn getrennt(&self) {
        let mut rx = self.inner.getrennt_tx.subscribe();
        let _ = rx.wait_for(|getrennt| *getrennt).await;
    }

    // -----------------------------------------------------------------------
    // Lebenszyklus
    // -----------------------------------------------------------------------

    /// Startet Lese- und Schreib-Task
    ///
    /// Wirkt genau einmal; weitere Aufrufe werden geloggt und ignoriert.
    pub fn run(&self) -> Result<(), ConnectionError> {
        if self.inner.gestartet.swap(true, Ordering::SeqCst) {
            tracing::warn!(peer = %self.inner.peer, "run() mehrfach aufgerufen – ignoriert");
            return Err(ConnectionError::BereitsGestartet);
        }
        let Some(transport) = self.inner.transport.lock().take() else {
            return Err(ConnectionError::Disconnected);
        };

        let stopp_rx = self.inner.stopp_tx.subscribe();
        tokio::spawn(schreib_schleife(
            Arc::clone(&self.inner),
            transport.schreiber,
            transport.sende_rx,
        ));

        let verbindung = self.clone();
        tokio::spawn(async move {
            verbindung.lese_schleife(transport.leser, stopp_rx).await;
        });

        tracing::debug!(peer = %self.inner.peer, "Verbindung gestartet");
        Ok(())
    }

    /// Schliesst die Verbindung (idempotent, schlaegt nie fehl)
    ///
    /// Bereits eingereihte Frames werden noch geschrieben, danach wird der
    /// Transport geschlossen und lokal `disconnect` ausgeloest.
    pub fn close(&self) {
        if self.inner.geschlossen.swap(true, Ordering::SeqCst) {
            return;
        }

        if !self.inner.gestartet.swap(true, Ordering::SeqCst) {
            // Nie gestartet: kein Task der aufraeumen koennte
            drop(self.inner.transport.lock().take());
            self.trennen();
            return;
        }

        tracing::debug!(peer = %self.inner.peer, "Verbindung wird geschlossen");
        let _ = self.inner.sende_tx.send(Ausgehend::Schliessen);
    }

    async fn lese_schleife(self, leser: Leser, mut stopp_rx: watch::Receiver<bool>) {
        let mut frames = FramedRead::new(leser, LineCodec::with_max_size(self.inner.max_frame_size));

        loop {
            tokio::select! {
                frame = frames.next() => match frame {
                    Some(Ok(Ok(event))) => {
                        tracing::trace!(peer = %self.inner.peer, ereignis = %event.kind(), "Ereignis empfangen");
                        self.local_fire(event);
                    }
                    Some(Ok(Err(e))) => {
                        tracing::debug!(peer = %self.inner.peer, fehler = %e, "Ungueltiges Frame verworfen");
                    }
                    Some(Err(e)) => {
                        tracing::warn!(peer = %self.inner.peer, fehler = %e, "Frame-Lesefehler");
                        break;
                    }
                    None => {
                        tracing::debug!(peer = %self.inner.peer, "Verbindung von der Gegenstelle geschlossen");
                        break;
                    }
                },
                _ = async { let _ = stopp_rx.wait_for(|stopp| *stopp).await; } => {
                    break;
                }
            }
        }

        self.trennen();
    }

    /// Uebergang nach "getrennt" (genau einmal)
    fn trennen(&self) {
        if self.inner.getrennt_gemeldet.swap(true, Ordering::SeqCst) {
            return;
        }

        {
            let _warten = self.inner.warten.lock();
            self.inner.verbunden.store(false, Ordering::SeqCst);
        }

        self.local_fire(Event::Disconnect);

        // Offene Wartende erhalten Disconnected (Sender wird verworfen)
        self.inner.warten.lock().clear();

        // Schreib-Task beenden, Handler-Zyklen aufloesen
        let _ = self.inner.sende_tx.send(Ausgehend::Schliessen);
        *self.inner.verteilung.lock() = Verteilung::default();

        self.inner.getrennt_tx.send_replace(true);
        tracing::info!(peer = %self.inner.peer, "Verbindung getrennt");
    }
}

async fn schreib_schleife(
    inner: Arc<ConnectionInner>,
    schreiber: Schreiber,
    mut sende_rx: mpsc::UnboundedReceiver<Ausgehend>,
) {
    let mut frames = FramedWrite::new(schreiber, LineCodec::with_max_size(inner.max_frame_size));

    while let Some(ausgehend) = sende_rx.recv().await {
        let event = match ausgehend {
            Ausgehend::Frame(event) => event,
            Ausgehend::Schliessen => break,
        };
        let kind = event.kind();

        match frames.send(event).await {
            Ok(()) => {}
            Err(ProtocolError::Io(e)) => {
                tracing::warn!(peer = %inner.peer, fehler = %e, "Senden fehlgeschlagen");
                break;
            }
            Err(e) => {
                tracing::warn!(peer = %inner.peer, ereignis = %kind, fehler = %e, "Frame nicht kodierbar – verworfen");
            }
        }
    }

    let mut schreiber = frames.into_inner();
    if let Err(e) = schreiber.shutdown().await {
        tracing::trace!(peer = %inner.peer, fehler = %e, "Shutdown des Transports fehlgeschlagen");
    }
    inner.stopp_tx.send_replace(true);
}

// ---------------------------------------------------------------------------
// EventWaiter
// ---------------------------------------------------------------------------

/// Belegter Warte-Slot, siehe [`Connection::register_wait`]
#[derive(Debug)]
pub struct EventWaiter {
    kind: EventKind,
    rx: oneshot::Receiver<Event>,
}

impl EventWaiter {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Wartet auf das Ereignis; `Disconnected` bei Trennung
    pub async fn recv(self) -> Result<Event, ConnectionError> {
        self.rx.await.map_err(|_| ConnectionError::Disconnected)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
