use super::Partition;
use crate::shape::{Shape, ShapeId};

/// Structural change requested from inside a collision callback.
#[derive(Debug, Clone)]
pub enum PendingChange {
    Add { shape: Shape, partition: Partition },
    Remove(ShapeId),
    /// Overwrite the registered shape with this state and push it into the proxy.
    Replace(Shape),
}

/// Queue handed to collision callbacks. The space is mid-iteration over contact pairs while
/// callbacks run, so changes are recorded here and applied once dispatch has finished.
#[derive(Debug, Default)]
pub struct PendingChanges {
    changes: Vec<PendingChange>,
}

impl PendingChanges {
    pub fn add(&mut self, shape: Shape, partition: Partition) {
        self.changes.push(PendingChange::Add { shape, partition });
    }

    pub fn remove(&mut self, id: ShapeId) {
        self.changes.push(PendingChange::Remove(id));
    }

    pub fn replace(&mut self, shape: Shape) {
        self.changes.push(PendingChange::Replace(shape));
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingChange> {
        self.changes.iter()
    }

    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, PendingChange> {
        self.changes.drain(..)
    }
}
