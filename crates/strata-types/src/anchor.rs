use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;
use crate::payload::PayloadGraph;

/// Stable 128-bit identifier for an anchor.
///
/// Identity is by id only: two anchors with the same `AnchorId` are the
/// same logical entity regardless of payload equality. The canonical
/// string form is the hyphenated lowercase UUID, and it is what every
/// tier uses as its storage key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnchorId(Uuid);

impl AnchorId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID (e.g. one minted by the object-graph runtime).
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// The raw 16 bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for AnchorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl fmt::Debug for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnchorId({})", self.0.hyphenated())
    }
}

impl FromStr for AnchorId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidAnchorId(e.to_string()))
    }
}

/// The unit of storage: an identified, possibly cyclic object graph.
///
/// An anchor is created by the object-graph runtime, handed to the store
/// via `set`, lives in the working set until commit, and is destroyed
/// only by an explicit delete followed by commit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// Globally unique identifier, stable for the anchor's lifetime.
    pub id: AnchorId,
    /// Whether the anchor should survive beyond the current process.
    pub persistent: bool,
    /// The application object graph reachable from this anchor.
    pub payload: PayloadGraph,
}

impl Anchor {
    /// Create a non-persistent anchor with a fresh id.
    pub fn new(payload: PayloadGraph) -> Self {
        Self {
            id: AnchorId::new(),
            persistent: false,
            payload,
        }
    }

    /// Create an anchor with a caller-supplied id.
    pub fn with_id(id: AnchorId, payload: PayloadGraph) -> Self {
        Self {
            id,
            persistent: false,
            payload,
        }
    }

    /// Mark the anchor as persistent.
    pub fn persist(mut self) -> Self {
        self.persistent = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Value;

    #[test]
    fn fresh_ids_are_unique() {
        assert_ne!(AnchorId::new(), AnchorId::new());
    }

    #[test]
    fn display_is_canonical_uuid() {
        let id = AnchorId::new();
        let s = id.to_string();
        assert_eq!(s.len(), 36);
        assert_eq!(s, s.to_lowercase());
        assert_eq!(s.matches('-').count(), 4);
    }

    #[test]
    fn string_roundtrip() {
        let id = AnchorId::new();
        let parsed: AnchorId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = "not-a-uuid".parse::<AnchorId>().unwrap_err();
        assert!(matches!(err, TypeError::InvalidAnchorId(_)));
    }

    #[test]
    fn serde_roundtrip() {
        let id = AnchorId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: AnchorId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn new_anchor_is_not_persistent() {
        let anchor = Anchor::new(PayloadGraph::new());
        assert!(!anchor.persistent);
        assert!(anchor.persist().persistent);
    }

    #[test]
    fn identity_is_by_id() {
        let id = AnchorId::new();
        let mut payload = PayloadGraph::new();
        let root = payload.root();
        payload.set_field(root, "label", Value::Text("a".into())).unwrap();

        let a = Anchor::with_id(id, payload);
        let b = Anchor::with_id(id, PayloadGraph::new());
        // Payloads differ, ids agree: same logical entity.
        assert_eq!(a.id, b.id);
        assert_ne!(a.payload, b.payload);
    }
}
