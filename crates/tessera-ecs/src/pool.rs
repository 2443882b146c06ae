use tracing::{debug, warn};

use crate::entity::Entity;
use crate::error::EcsError;

/// Bounded free-list of recyclable entity handles.
///
/// Every handle the pool ever created is *resident*: it is either on the free list or
/// handed out to the caller. The number of resident handles never exceeds
/// `max_entities`; once that bound is hit with an empty free list, [`obtain`] fails.
///
/// [`obtain`]: EntityPool::obtain
pub struct EntityPool {
    free_list: Vec<Entity>,
    /// Per slot index: whether the slot currently sits on the free list.
    free_slots: Vec<bool>,
    max_entities: usize,
    obtained: u64,
    discarded: u64,
}

impl EntityPool {
    pub fn new(initial_capacity: usize, max_entities: usize) -> Self {
        Self {
            free_list: Vec::with_capacity(initial_capacity),
            free_slots: Vec::with_capacity(initial_capacity),
            max_entities,
            obtained: 0,
            discarded: 0,
        }
    }

    /// Eagerly create up to `count` fresh handles and put them on the free list.
    /// Returns how many were created; growth stops at `max_entities`.
    ///
    /// Fresh handles are handed out in ascending index order.
    pub fn fill(&mut self, count: usize) -> usize {
        let start = self.free_slots.len();
        let end = (start + count).min(self.max_entities);
        if end <= start {
            return 0;
        }
        self.free_slots.resize(end, true);
        self.free_list
            .extend((start..end).rev().map(|index| Entity::from_raw(index as u32, 0)));
        debug!("Entity pool prewarmed with {} handles", end - start);
        end - start
    }

    /// Take a handle off the free list, creating a new one if the list is empty.
    pub fn obtain(&mut self) -> Result<Entity, EcsError> {
        let entity = match self.free_list.pop() {
            Some(entity) => {
                self.free_slots[entity.index as usize] = false;
                entity
            }
            None => {
                let index = self.free_slots.len();
                if index >= self.max_entities {
                    warn!("Entity pool exhausted at {} resident handles", index);
                    return Err(EcsError::PoolExhausted {
                        capacity: self.max_entities,
                    });
                }
                self.free_slots.push(false);
                Entity::from_raw(index as u32, 0)
            }
        };
        self.obtained += 1;
        Ok(entity)
    }

    /// Return a handle for reuse. The slot comes back with its generation bumped.
    ///
    /// # Panics
    /// If the handle was not created by this pool or is already free.
    pub fn free(&mut self, entity: Entity) {
        let slot = self
            .free_slots
            .get_mut(entity.index as usize)
            .unwrap_or_else(|| panic!("entity {entity:?} does not belong to this pool"));
        assert!(!*slot, "entity {entity:?} freed twice");
        *slot = true;
        self.free_list.push(entity.next_generation());
        self.discarded += 1;
    }

    /// Whether the slot with this index is currently on the free list.
    pub fn is_free(&self, index: u32) -> bool {
        self.free_slots.get(index as usize).copied().unwrap_or(false)
    }

    /// Total handles ever handed out by [`obtain`](Self::obtain).
    pub fn obtained(&self) -> u64 {
        self.obtained
    }

    /// Total handles ever returned through [`free`](Self::free).
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Handles allocated so far, free or in use.
    pub fn resident(&self) -> usize {
        self.free_slots.len()
    }

    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    pub fn max_entities(&self) -> usize {
        self.max_entities
    }
}
