//! Gemeinsame Identifikationstypen fuer Cloud-Autotest
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Aufgaben-, Worker- und Eingabe-IDs zur Compilezeit auszuschliessen.
//! Auf dem Draht sind alle IDs einfache Strings (`#[serde(transparent)]`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Erzeugt ein kryptografisch zufaelliges, nicht erratbares Token
///
/// 128 Bit aus dem OS-Zufallsgenerator, kodiert als 32 Hex-Zeichen.
pub fn zufalls_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Kennung einer Aufgabe (z.B. "cs2521_lab1_1")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Erlaubt Nachschlagen in Maps direkt mit `&str`
impl std::borrow::Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kennung eines Workers
///
/// Vom Client vorgegeben oder beim Handshake zufaellig vergeben.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub String);

impl WorkerId {
    /// Erstellt eine neue zufaellige WorkerId
    pub fn zufaellig() -> Self {
        Self(zufalls_token())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorkerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for WorkerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kennung einer generierten Eingabe
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputId(pub String);

impl InputId {
    /// Erstellt eine neue zufaellige InputId
    pub fn zufaellig() -> Self {
        Self(zufalls_token())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InputId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for InputId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for InputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_ist_32_hex_zeichen() {
        let token = zufalls_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn zufaellige_ids_eindeutig() {
        assert_ne!(WorkerId::zufaellig(), WorkerId::zufaellig());
        assert_ne!(InputId::zufaellig(), InputId::zufaellig());
    }

    #[test]
    fn ids_serialisieren_als_string() {
        let wid = WorkerId::from("z5423219");
        assert_eq!(serde_json::to_string(&wid).unwrap(), "\"z5423219\"");
        let zurueck: WorkerId = serde_json::from_str("\"z5423219\"").unwrap();
        assert_eq!(zurueck, wid);
    }

    #[test]
    fn ids_als_map_schluessel() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(InputId::from("abc"), 3usize);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"abc":3}"#);
    }
}
