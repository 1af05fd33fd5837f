//! Per-tick event diff delivered by the host.

use super::entity::{EntityId, EntityKind, PlayerId};

/// An entity left the world. The host no longer knows it, so the event
/// carries what the naval subsystem needs to reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destroyed {
    pub id: EntityId,
    pub owner: PlayerId,
    pub kind: EntityKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipChanged {
    pub id: EntityId,
    pub from: PlayerId,
    pub to: PlayerId,
}

/// Everything that happened since the previous tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Events {
    /// Newly placed entities, foundations included.
    pub create: Vec<EntityId>,
    pub destroy: Vec<Destroyed>,
    /// Entities produced by a training queue.
    pub training_finished: Vec<EntityId>,
    pub ownership_changed: Vec<OwnershipChanged>,
}

impl Events {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty()
            && self.destroy.is_empty()
            && self.training_finished.is_empty()
            && self.ownership_changed.is_empty()
    }
}
