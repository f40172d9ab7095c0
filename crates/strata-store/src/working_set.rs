//! The in-process working set: live anchors plus the garbage set.
//!
//! One `WorkingSet` belongs to one unit of work and is not internally
//! synchronized; callers serialize access by holding the owning
//! [`TieredStore`](crate::TieredStore) mutably.

use std::collections::{HashMap, HashSet};

use strata_types::{Anchor, AnchorId};

/// In-memory anchor map plus identifiers pending deletion.
///
/// Once an identifier enters the garbage set it is terminal: reads will
/// not return it, and only a physical purge (commit) clears the mark.
#[derive(Debug, Default)]
pub struct WorkingSet {
    anchors: HashMap<AnchorId, Anchor>,
    garbage: HashSet<AnchorId>,
}

impl WorkingSet {
    /// Create an empty working set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a live anchor. Garbage-marked identifiers are invisible.
    pub fn find_by_id(&self, id: AnchorId) -> Option<&Anchor> {
        if self.garbage.contains(&id) {
            return None;
        }
        self.anchors.get(&id)
    }

    /// Insert or overwrite an anchor.
    pub fn set(&mut self, anchor: Anchor) {
        self.anchors.insert(anchor.id, anchor);
    }

    /// Drop an anchor from the map and mark its identifier as garbage.
    pub fn remove(&mut self, id: AnchorId) {
        self.anchors.remove(&id);
        self.garbage.insert(id);
    }

    /// Whether the identifier is marked for deletion.
    pub fn is_garbage(&self, id: AnchorId) -> bool {
        self.garbage.contains(&id)
    }

    /// Snapshot of all garbage-marked identifiers.
    pub fn garbage_ids(&self) -> Vec<AnchorId> {
        self.garbage.iter().copied().collect()
    }

    /// Clear the garbage mark after a physical purge. Returns `true` if
    /// the mark existed.
    pub fn clear_garbage(&mut self, id: AnchorId) -> bool {
        self.garbage.remove(&id)
    }

    /// Iterate over the live anchors (garbage-marked entries excluded).
    pub fn anchors(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors
            .values()
            .filter(|a| !self.garbage.contains(&a.id))
    }

    /// Number of live anchors.
    pub fn len(&self) -> usize {
        self.anchors().count()
    }

    /// Returns `true` if no live anchors are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything, garbage marks included.
    pub fn clear(&mut self) {
        self.anchors.clear();
        self.garbage.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_types::PayloadGraph;

    fn anchor() -> Anchor {
        Anchor::new(PayloadGraph::new())
    }

    #[test]
    fn set_then_find() {
        let mut ws = WorkingSet::new();
        let a = anchor();
        let id = a.id;
        ws.set(a);
        assert_eq!(ws.find_by_id(id).map(|a| a.id), Some(id));
        assert_eq!(ws.len(), 1);
    }

    #[test]
    fn set_overwrites_by_id() {
        let mut ws = WorkingSet::new();
        let a = anchor();
        let id = a.id;
        ws.set(a.clone());
        ws.set(a.persist());
        assert_eq!(ws.len(), 1);
        assert!(ws.find_by_id(id).is_some_and(|a| a.persistent));
    }

    #[test]
    fn remove_marks_garbage_and_hides() {
        let mut ws = WorkingSet::new();
        let a = anchor();
        let id = a.id;
        ws.set(a);
        ws.remove(id);
        assert!(ws.find_by_id(id).is_none());
        assert!(ws.is_garbage(id));
        assert_eq!(ws.garbage_ids(), vec![id]);
    }

    #[test]
    fn garbage_is_terminal_until_cleared() {
        let mut ws = WorkingSet::new();
        let a = anchor();
        let id = a.id;
        ws.remove(id);
        // A later set cannot make the id visible again.
        ws.set(a);
        assert!(ws.find_by_id(id).is_none());
        assert_eq!(ws.anchors().count(), 0);

        assert!(ws.clear_garbage(id));
        assert!(!ws.is_garbage(id));
        assert!(!ws.clear_garbage(id));
    }

    #[test]
    fn remove_of_unknown_id_still_marks() {
        let mut ws = WorkingSet::new();
        let id = AnchorId::new();
        ws.remove(id);
        assert!(ws.is_garbage(id));
    }

    #[test]
    fn clear_drops_all_state() {
        let mut ws = WorkingSet::new();
        let a = anchor();
        let id = a.id;
        ws.set(a);
        ws.remove(AnchorId::new());
        ws.clear();
        assert!(ws.is_empty());
        assert!(ws.garbage_ids().is_empty());
        assert!(ws.find_by_id(id).is_none());
    }
}
