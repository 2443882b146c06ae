use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::entity::Entity;
use crate::sparse_set::SparseSet;

/// Marker trait for types that can be stored as ECS components.
pub trait Component: 'static + Send + Sync {}

/// Blanket implementation: any `'static + Send + Sync` type is a valid component.
impl<T: 'static + Send + Sync> Component for T {}

/// Runtime descriptor of a component type, for type-erased removal and filtering.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
}

impl ComponentType {
    pub fn of<T: Component>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentType({})", self.name)
    }
}

/// The component-storage collaborator of the entity manager.
///
/// The manager only relies on the boolean results to decide whether an entity's
/// composition changed; how components are laid out is up to the implementation.
pub trait ComponentStore {
    /// Attach a component. Returns `true` if it replaced an existing component of the
    /// same type, `false` if the entity's composition changed.
    fn insert<T: Component>(&mut self, entity: Entity, component: T) -> bool;

    /// Detach and return the component of type `T`, if present.
    fn remove<T: Component>(&mut self, entity: Entity) -> Option<T>;

    /// Detach the component of the given runtime type. Returns `true` if one was removed.
    fn remove_type(&mut self, entity: Entity, ty: ComponentType) -> bool;

    /// Detach every component of the entity.
    fn remove_all(&mut self, entity: Entity);

    fn get<T: Component>(&self, entity: Entity) -> Option<&T>;

    fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T>;

    fn has_type(&self, entity: Entity, ty: ComponentType) -> bool;

    /// Number of components attached to the entity.
    fn component_count(&self, entity: Entity) -> usize;

    fn has<T: Component>(&self, entity: Entity) -> bool {
        self.has_type(entity, ComponentType::of::<T>())
    }

    fn has_any(&self, entity: Entity) -> bool {
        self.component_count(entity) > 0
    }
}

/// Type-erased column interface.
trait ComponentColumn: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn remove(&mut self, index: u32) -> bool;
    fn has(&self, index: u32) -> bool;
}

impl<T: Component> ComponentColumn for SparseSet<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove(&mut self, index: u32) -> bool {
        SparseSet::remove(self, index).is_some()
    }

    fn has(&self, index: u32) -> bool {
        self.contains(index)
    }
}

/// Default component store: one sparse-set column per component type, keyed by
/// entity index, plus a per-entity component count.
#[derive(Default)]
pub struct Components {
    columns: HashMap<TypeId, Box<dyn ComponentColumn>>,
    counts: Vec<u32>,
}

impl Components {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered component types.
    pub fn type_count(&self) -> usize {
        self.columns.len()
    }

    fn column<T: Component>(&self) -> Option<&SparseSet<T>> {
        self.columns
            .get(&TypeId::of::<T>())
            .and_then(|c| c.as_any().downcast_ref::<SparseSet<T>>())
    }

    fn column_mut<T: Component>(&mut self) -> Option<&mut SparseSet<T>> {
        self.columns
            .get_mut(&TypeId::of::<T>())
            .and_then(|c| c.as_any_mut().downcast_mut::<SparseSet<T>>())
    }

    fn column_or_insert<T: Component>(&mut self) -> &mut SparseSet<T> {
        self.columns
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(SparseSet::<T>::new()))
            .as_any_mut()
            .downcast_mut::<SparseSet<T>>()
            .expect("component type mismatch")
    }

    fn count_mut(&mut self, index: u32) -> &mut u32 {
        let idx = index as usize;
        if idx >= self.counts.len() {
            self.counts.resize(idx + 1, 0);
        }
        &mut self.counts[idx]
    }
}

impl ComponentStore for Components {
    fn insert<T: Component>(&mut self, entity: Entity, component: T) -> bool {
        let replaced = self
            .column_or_insert::<T>()
            .insert(entity.index, component)
            .is_some();
        if !replaced {
            *self.count_mut(entity.index) += 1;
        }
        replaced
    }

    fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        let removed = self.column_mut::<T>()?.remove(entity.index)?;
        *self.count_mut(entity.index) -= 1;
        Some(removed)
    }

    fn remove_type(&mut self, entity: Entity, ty: ComponentType) -> bool {
        let removed = self
            .columns
            .get_mut(&ty.id)
            .is_some_and(|c| c.remove(entity.index));
        if removed {
            *self.count_mut(entity.index) -= 1;
        }
        removed
    }

    fn remove_all(&mut self, entity: Entity) {
        if !self.has_any(entity) {
            return;
        }
        for column in self.columns.values_mut() {
            column.remove(entity.index);
        }
        *self.count_mut(entity.index) = 0;
    }

    fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.column::<T>()?.get(entity.index)
    }

    fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.column_mut::<T>()?.get_mut(entity.index)
    }

    fn has_type(&self, entity: Entity, ty: ComponentType) -> bool {
        self.columns
            .get(&ty.id)
            .is_some_and(|c| c.has(entity.index))
    }

    fn component_count(&self, entity: Entity) -> usize {
        self.counts.get(entity.index as usize).copied().unwrap_or(0) as usize
    }
}

/// A group of components attached in one call.
pub trait Bundle: 'static {
    /// Insert every component. Returns `true` if at least one insert changed the
    /// entity's composition (i.e. did not merely replace a value).
    fn insert_into<S: ComponentStore>(self, store: &mut S, entity: Entity) -> bool;
}

macro_rules! impl_bundle_tuple {
    ($($name:ident),+) => {
        #[allow(non_snake_case)]
        impl<$($name: Component),+> Bundle for ($($name,)+) {
            fn insert_into<S: ComponentStore>(self, store: &mut S, entity: Entity) -> bool {
                let ($($name,)+) = self;
                let mut structural = false;
                $(structural |= !store.insert(entity, $name);)+
                structural
            }
        }
    };
}

impl_bundle_tuple!(A);
impl_bundle_tuple!(A, B);
impl_bundle_tuple!(A, B, C);
impl_bundle_tuple!(A, B, C, D);
impl_bundle_tuple!(A, B, C, D, E);
impl_bundle_tuple!(A, B, C, D, E, F);
impl_bundle_tuple!(A, B, C, D, E, F, G);
impl_bundle_tuple!(A, B, C, D, E, F, G, H);
