use std::collections::BTreeSet;

use crate::EntityId;

/// The set of entity ids picked for a uniform bulk operation.
///
/// Pure set bookkeeping; applying an operation over the selection is the
/// reconciler's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<EntityId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the selection with the given ids.
    pub fn select_all(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        self.ids = ids.into_iter().collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Flips membership for one id; returns whether it is now selected.
    pub fn toggle(&mut self, id: EntityId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.ids.iter().copied().collect()
    }
}
