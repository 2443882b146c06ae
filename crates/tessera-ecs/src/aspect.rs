use crate::component::{Component, ComponentStore, ComponentType};
use crate::entity::Entity;
use crate::sparse_set::SparseSet;
use crate::system::EntityView;

/// A component-composition filter. Disabled entities and entities without any
/// component never match; the latter are deleted by the clean pass that revalidates them.
#[derive(Debug, Clone, Default)]
pub struct Aspect {
    all: Vec<ComponentType>,
    none: Vec<ComponentType>,
}

impl Aspect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a component of type `T`.
    pub fn with<T: Component>(mut self) -> Self {
        self.all.push(ComponentType::of::<T>());
        self
    }

    /// Reject entities that carry a component of type `T`.
    pub fn without<T: Component>(mut self) -> Self {
        self.none.push(ComponentType::of::<T>());
        self
    }

    pub fn matches<S: ComponentStore>(&self, view: &EntityView<'_, S>) -> bool {
        view.is_enabled()
            && view.has_any()
            && self.all.iter().all(|&ty| view.has_type(ty))
            && !self.none.iter().any(|&ty| view.has_type(ty))
    }
}

/// Outcome of revalidating an entity against a [`Family`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// Newly tracked.
    Joined,
    /// Was tracked, no longer matches.
    Left,
    /// Was tracked and still matches.
    Stayed,
    /// Not tracked before or after.
    Absent,
}

/// The set of entities currently matching an [`Aspect`].
///
/// Typical use is a subsystem forwarding its `revalidate` calls here and iterating
/// [`entities`](Family::entities) in its processing pass.
pub struct Family {
    aspect: Aspect,
    members: SparseSet<Entity>,
}

impl Family {
    pub fn new(aspect: Aspect) -> Self {
        Self {
            aspect,
            members: SparseSet::new(),
        }
    }

    pub fn aspect(&self) -> &Aspect {
        &self.aspect
    }

    /// Track or drop the entity according to its current state.
    pub fn revalidate<S: ComponentStore>(&mut self, view: &EntityView<'_, S>) -> Membership {
        let entity = view.entity();
        let tracked = self.members.get(entity.index) == Some(&entity);
        match (tracked, self.aspect.matches(view)) {
            (false, true) => {
                self.members.insert(entity.index, entity);
                Membership::Joined
            }
            (true, false) => {
                self.members.remove(entity.index);
                Membership::Left
            }
            (true, true) => Membership::Stayed,
            (false, false) => Membership::Absent,
        }
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.members.get(entity.index) == Some(&entity)
    }

    /// Snapshot of the current members, safe to hold while mutating the entity manager.
    pub fn entities(&self) -> Vec<Entity> {
        self.members.values().to_vec()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
