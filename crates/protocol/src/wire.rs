//! Wire-Format fuer TCP-Verbindungen
//!
//! Zeilenbasiertes Protokoll: ein JSON-Dokument pro Zeile, abgeschlossen
//! mit `\n`.
//!
//! ## Frame-Format
//!
//! ```text
//! {"type":"<ereignis>","data":<nutzdaten>}\n
//! ```
//!
//! Leere Zeilen werden ignoriert. Eine einzelne fehlerhafte Zeile beendet
//! den Stream nicht, sondern wird als `Err` im Item gemeldet. Nur ein Frame
//! ueber der Maximalgroesse ist fatal (Standard: 16 MB).

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::event::Event;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (16 MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Frame-Trenner
pub const ZEILENENDE: u8 = b'\n';

// ---------------------------------------------------------------------------
// LineCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer zeilenbasierte JSON-Frames
///
/// Implementiert `Encoder<Event>` und `Decoder` fuer die Verwendung mit
/// `FramedRead` / `FramedWrite`.
///
/// ```rust,no_run
/// use tokio_util::codec::FramedRead;
/// use autotest_protocol::wire::LineCodec;
///
/// // let (lese, schreib) = tokio::io::split(stream);
/// // let frames = FramedRead::new(lese, LineCodec::new());
/// ```
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Maximale erlaubte Frame-Groesse in Bytes (ohne Zeilenende)
    max_frame_size: usize,
    /// Bereits durchsuchter Teil des Puffers
    next_index: usize,
}

impl LineCodec {
    /// Erstellt einen neuen `LineCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Erstellt einen `LineCodec` mit benutzerdefinierter maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            next_index: 0,
        }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    fn zu_gross(&self, groesse: usize) -> ProtocolError {
        ProtocolError::FrameZuGross {
            groesse,
            maximum: self.max_frame_size,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl Decoder for LineCodec {
    type Item = Result<Event, ProtocolError>;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let gefunden = src[self.next_index..]
                .iter()
                .position(|b| *b == ZEILENENDE);

            let Some(offset) = gefunden else {
                // Kein vollstaendiges Frame, Groesse des Rests pruefen
                if src.len() > self.max_frame_size {
                    return Err(self.zu_gross(src.len()));
                }
                self.next_index = src.len();
                return Ok(None);
            };

            let ende = self.next_index + offset;
            self.next_index = 0;

            if ende > self.max_frame_size {
                return Err(self.zu_gross(ende));
            }

            let zeile = src.split_to(ende + 1);
            let inhalt = &zeile[..ende];
            // `\r\n` tolerieren
            let inhalt = inhalt.strip_suffix(b"\r").unwrap_or(inhalt);

            if inhalt.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            return Ok(Some(Event::from_json(inhalt)));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => {
                // Unvollstaendiges letztes Frame verwerfen
                src.clear();
                self.next_index = 0;
                Ok(None)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl Encoder<Event> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Event, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item.to_frame()?)?;

        if json.len() > self.max_frame_size {
            return Err(self.zu_gross(json.len()));
        }

        dst.reserve(json.len() + 1);
        dst.put_slice(&json);
        dst.put_u8(ZEILENENDE);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
