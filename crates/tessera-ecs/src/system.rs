use crate::component::{Component, ComponentStore, ComponentType, Components};
use crate::entity::Entity;
use crate::manager::EntityManager;

/// Read-only view of one entity, handed to subsystems during revalidation.
pub struct EntityView<'a, S = Components> {
    entity: Entity,
    enabled: bool,
    store: &'a S,
}

impl<'a, S: ComponentStore> EntityView<'a, S> {
    pub(crate) fn new(entity: Entity, enabled: bool, store: &'a S) -> Self {
        Self {
            entity,
            enabled,
            store,
        }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn has<T: Component>(&self) -> bool {
        self.store.has::<T>(self.entity)
    }

    pub fn has_type(&self, ty: ComponentType) -> bool {
        self.store.has_type(self.entity, ty)
    }

    pub fn has_any(&self) -> bool {
        self.store.has_any(self.entity)
    }

    pub fn get<T: Component>(&self) -> Option<&'a T> {
        self.store.get::<T>(self.entity)
    }
}

/// A processing unit that keeps its own working set of entities.
pub trait Subsystem<S: ComponentStore = Components> {
    /// Called for every dirty entity during the clean pass. The subsystem decides,
    /// from the entity's current composition and enabled flag, whether to track it.
    fn revalidate(&mut self, entity: &EntityView<'_, S>);

    /// One processing pass. Structural changes made here are deferred until the
    /// clean pass that follows.
    fn process(&mut self, _entities: &mut EntityManager<S>) {}

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// An ordered list of subsystems. Registration order is processing order and
/// revalidation order.
pub struct SubsystemRegistry<S: ComponentStore = Components> {
    systems: Vec<Box<dyn Subsystem<S>>>,
}

impl<S: ComponentStore> SubsystemRegistry<S> {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
        }
    }

    /// Add a subsystem to the end of the registry.
    pub fn register<T: Subsystem<S> + 'static>(&mut self, system: T) {
        self.systems.push(Box::new(system));
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut (dyn Subsystem<S> + 'static)> {
        self.systems.last_mut().map(|s| s.as_mut())
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut (dyn Subsystem<S> + 'static)> {
        self.systems.get_mut(index).map(|s| s.as_mut())
    }

    /// Revalidate one entity against every subsystem, in registration order.
    pub(crate) fn revalidate(&mut self, view: &EntityView<'_, S>) {
        for system in &mut self.systems {
            system.revalidate(view);
        }
    }

    /// Names of the registered subsystems, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.systems.iter().map(|s| s.name())
    }

    /// Number of registered subsystems.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl<S: ComponentStore> Default for SubsystemRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
