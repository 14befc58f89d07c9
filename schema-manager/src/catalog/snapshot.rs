//! Immutable, generation-stamped catalog snapshots.

use std::sync::Arc;

use crate::catalog::Ais;

/// A frozen catalog graph stamped with a generation. Once built, a
/// `Snapshot` offers no mutable accessor to its graph at all — the
/// immutability invariant holds by construction
/// rather than by a runtime check. Cheap to clone: the graph itself is
/// behind an `Arc`, so cloning a `Snapshot` is a refcount bump, which is
/// what lets the same instance be shared across every session attached to
/// it within a transaction.
#[derive(Debug, Clone)]
pub struct Snapshot {
    ais: Arc<Ais>,
    generation: i64,
}

impl Snapshot {
    /// Freezes `ais` at `generation`. This is the only constructor:
    /// there is deliberately no `Snapshot::new` that skips stamping a
    /// generation, since an unstamped snapshot would violate the
    /// invariant that every persisted snapshot's generation equals the
    /// generation key's value at the transaction that installed it.
    pub fn freeze(ais: Ais, generation: i64) -> Snapshot {
        Snapshot { ais: Arc::new(ais), generation }
    }

    pub fn generation(&self) -> i64 {
        self.generation
    }

    pub fn ais(&self) -> &Ais {
        &self.ais
    }

    /// Two snapshots are the same *instance* (not merely structurally
    /// equal) iff this returns true. Used by session-stability tests:
    /// repeated `get_ais` calls within one transaction must return the
    /// same instance, not just an equal one.
    pub fn is_same_instance(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.ais, &other.ais) && self.generation == other.generation
    }
}

impl PartialEq for Snapshot {
    /// Structural equality ignoring `generation`: two snapshots built from
    /// the same catalog graph are equal even if one was restamped at a
    /// later generation than the other.
    fn eq(&self, other: &Self) -> bool {
        self.ais == other.ais
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Ais;

    #[test]
    fn clones_share_the_same_instance() {
        let snap = Snapshot::freeze(Ais::new(), 1);
        let clone = snap.clone();
        assert!(snap.is_same_instance(&clone));
    }

    #[test]
    fn independently_frozen_equal_graphs_are_not_the_same_instance() {
        let a = Snapshot::freeze(Ais::new(), 1);
        let b = Snapshot::freeze(Ais::new(), 2);
        assert!(!a.is_same_instance(&b));
        // Structural equality ignores the generation stamp.
        assert_eq!(a, b);
    }
}
