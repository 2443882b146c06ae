use std::fmt;

/// Handle to an entity owned by an [`EntityManager`](crate::EntityManager).
///
/// `index` keys the manager's active set and component columns, and is handed out
/// again as soon as the clean pass deletes the entity. The pool returns the slot with
/// `generation` bumped, so the manager can tell a handle held across that deletion
/// from the entity now occupying the slot: reads through it come back empty and
/// mutations panic.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl Entity {
    /// Build a handle from raw parts. The manager only accepts it if it matches a live slot.
    pub fn from_raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Identity of the slot, shared by every entity recycled through it.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// How many times the slot had been recycled when this handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// The handle the same slot will carry after this one is recycled.
    pub(crate) fn next_generation(self) -> Self {
        Self {
            index: self.index,
            generation: self.generation.wrapping_add(1),
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}
