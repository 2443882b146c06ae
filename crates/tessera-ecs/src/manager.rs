use serde::Serialize;
use tracing::{debug, trace};

use crate::component::{Bundle, Component, ComponentStore, ComponentType, Components};
use crate::config::EcsConfig;
use crate::entity::Entity;
use crate::error::EcsError;
use crate::pool::EntityPool;
use crate::sparse_set::SparseSet;
use crate::system::{EntityView, Subsystem, SubsystemRegistry};

#[derive(Debug, Clone, Copy)]
struct EntityState {
    entity: Entity,
    enabled: bool,
    dirty: bool,
}

/// Snapshot of the manager's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityStats {
    pub alive: usize,
    pub dirty: usize,
    pub created: u64,
    pub destroyed: u64,
    pub in_memory: usize,
}

/// Owns entity creation, dirty-marking, the deferred clean pass and recycling.
///
/// Structural changes (component add/remove, enable/disable, removal) only mark the
/// entity dirty. Their consequences, subsystem revalidation and deletion of entities
/// left without components, are applied in [`clean`](EntityManager::clean).
///
/// Every per-entity method expects a handle created by this manager that is still
/// alive, and panics otherwise. Read accessors return `None`/`false` instead.
pub struct EntityManager<S: ComponentStore = Components> {
    store: S,
    active: SparseSet<EntityState>,
    /// Entities pending revalidation, in the order they were first dirtied.
    dirty: Vec<Entity>,
    pool: EntityPool,
}

impl<S: ComponentStore> EntityManager<S> {
    pub fn new(store: S, config: &EcsConfig) -> Result<Self, EcsError> {
        config.validate()?;
        let mut pool = EntityPool::new(config.initial_capacity, config.max_entities);
        pool.fill(config.prewarm_count());
        debug!(
            "EntityManager created (capacity {}, max {})",
            config.initial_capacity, config.max_entities
        );
        Ok(Self {
            store,
            active: SparseSet::with_capacity(config.initial_capacity),
            dirty: Vec::with_capacity(config.initial_capacity),
            pool,
        })
    }

    // ---- Lifecycle ----

    /// Obtain a fresh entity: no components, enabled, not dirty.
    pub fn create(&mut self) -> Result<Entity, EcsError> {
        let entity = self.pool.obtain()?;
        self.active.insert(
            entity.index,
            EntityState {
                entity,
                enabled: true,
                dirty: false,
            },
        );
        trace!("Created entity {}", entity);
        Ok(entity)
    }

    /// Strip every component and mark the entity dirty. The entity is deleted by the
    /// next clean pass unless components are added back before then.
    pub fn remove(&mut self, entity: Entity) {
        self.assert_alive(entity);
        self.store.remove_all(entity);
        self.refresh(entity);
    }

    /// Attach a component. Marks the entity dirty unless it replaced a component of the
    /// same type.
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) {
        self.assert_alive(entity);
        if !self.store.insert(entity, component) {
            self.refresh(entity);
        }
    }

    /// Attach several components at once; dirty if any of them was a structural add.
    pub fn add_components<B: Bundle>(&mut self, entity: Entity, bundle: B) {
        self.assert_alive(entity);
        if bundle.insert_into(&mut self.store, entity) {
            self.refresh(entity);
        }
    }

    /// Detach and return the component of type `T`. Marks dirty only if one was present.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        self.assert_alive(entity);
        let removed = self.store.remove::<T>(entity);
        if removed.is_some() {
            self.refresh(entity);
        }
        removed
    }

    /// Detach the component of a runtime type. Marks dirty only if one was present.
    pub fn remove_component_type(&mut self, entity: Entity, ty: ComponentType) -> bool {
        self.assert_alive(entity);
        let removed = self.store.remove_type(entity, ty);
        if removed {
            self.refresh(entity);
        }
        removed
    }

    pub fn enable(&mut self, entity: Entity) {
        self.set_enabled(entity, true);
    }

    pub fn disable(&mut self, entity: Entity) {
        self.set_enabled(entity, false);
    }

    fn set_enabled(&mut self, entity: Entity, enabled: bool) {
        let state = self.state_mut(entity);
        if state.enabled == enabled {
            return;
        }
        state.enabled = enabled;
        self.refresh(entity);
    }

    /// Queue the entity for revalidation. Idempotent until the next clean pass.
    pub fn refresh(&mut self, entity: Entity) {
        let state = self.state_mut(entity);
        if state.dirty {
            return;
        }
        state.dirty = true;
        self.dirty.push(entity);
    }

    // ---- Clean pass ----

    /// Revalidate every dirty entity against every subsystem, then delete those left
    /// without components.
    ///
    /// Entities are visited in the order they were dirtied, subsystems in registration
    /// order. Must not run while a subsystem is processing.
    pub fn clean(&mut self, systems: &mut SubsystemRegistry<S>) {
        if self.dirty.is_empty() {
            return;
        }
        let mut pending = std::mem::take(&mut self.dirty);
        let mut deleted = 0usize;
        for &entity in &pending {
            let enabled = self.state(entity).enabled;
            systems.revalidate(&EntityView::new(entity, enabled, &self.store));
            self.state_mut(entity).dirty = false;

            if !self.store.has_any(entity) {
                self.delete(entity);
                deleted += 1;
            }
        }
        debug!(
            "Clean pass revalidated {} entities against {} subsystems, deleted {}",
            pending.len(),
            systems.len(),
            deleted
        );
        pending.clear();
        self.dirty = pending;
    }

    /// Revalidate every live entity against one subsystem, e.g. right after it is
    /// registered.
    pub fn revalidate_all(&self, system: &mut dyn Subsystem<S>) {
        for state in self.active.values() {
            system.revalidate(&EntityView::new(state.entity, state.enabled, &self.store));
        }
    }

    fn delete(&mut self, entity: Entity) {
        self.active.remove(entity.index);
        self.pool.free(entity);
        trace!("Deleted entity {}", entity);
    }

    // ---- Handle checks ----

    fn assert_alive(&self, entity: Entity) {
        self.state(entity);
    }

    fn state(&self, entity: Entity) -> &EntityState {
        match self.active.get(entity.index) {
            Some(state) if state.entity == entity => state,
            _ => panic!("entity {entity:?} is not alive in this manager"),
        }
    }

    fn state_mut(&mut self, entity: Entity) -> &mut EntityState {
        match self.active.get_mut(entity.index) {
            Some(state) if state.entity == entity => state,
            _ => panic!("entity {entity:?} is not alive in this manager"),
        }
    }

    // ---- Queries ----

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.active
            .get(entity.index)
            .is_some_and(|s| s.entity == entity)
    }

    pub fn is_enabled(&self, entity: Entity) -> bool {
        self.is_alive(entity) && self.state(entity).enabled
    }

    pub fn is_dirty(&self, entity: Entity) -> bool {
        self.is_alive(entity) && self.state(entity).dirty
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.store.get::<T>(entity)
    }

    /// Mutable access to a component value. Not a structural change.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.store.get_mut::<T>(entity)
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.is_alive(entity) && self.store.has::<T>(entity)
    }

    /// Live entities, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.active.values().iter().map(|s| s.entity)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pool(&self) -> &EntityPool {
        &self.pool
    }

    // ---- Counters ----

    /// Number of live entities.
    pub fn entities(&self) -> usize {
        self.active.len()
    }

    pub fn entities_created(&self) -> u64 {
        self.pool.obtained()
    }

    pub fn entities_destroyed(&self) -> u64 {
        self.pool.discarded()
    }

    /// Handles allocated so far, live or pooled.
    pub fn entities_in_memory(&self) -> usize {
        self.pool.resident()
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    pub fn stats(&self) -> EntityStats {
        EntityStats {
            alive: self.entities(),
            dirty: self.dirty_count(),
            created: self.entities_created(),
            destroyed: self.entities_destroyed(),
            in_memory: self.entities_in_memory(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }

    type Log = Arc<Mutex<Vec<(u32, Entity)>>>;

    struct Recorder {
        id: u32,
        log: Log,
    }

    impl Subsystem for Recorder {
        fn revalidate(&mut self, entity: &EntityView<'_>) {
            self.log.lock().unwrap().push((self.id, entity.entity()));
        }
    }

    fn manager() -> EntityManager {
        let config = EcsConfig {
            initial_capacity: 8,
            max_entities: 64,
            prewarm_ratio: 0.5,
        };
        EntityManager::new(Components::new(), &config).unwrap()
    }

    fn registry(count: u32) -> (SubsystemRegistry, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SubsystemRegistry::new();
        for id in 0..count {
            registry.register(Recorder {
                id,
                log: log.clone(),
            });
        }
        (registry, log)
    }

    /// Pool/active disjointness and dirty-flag consistency.
    fn assert_invariants(manager: &EntityManager) {
        for index in 0..manager.pool.resident() as u32 {
            assert!(
                manager.active.contains(index) != manager.pool.is_free(index),
                "slot {index} must be exactly one of active or pooled"
            );
        }
        for state in manager.active.values() {
            let occurrences = manager.dirty.iter().filter(|&&e| e == state.entity).count();
            assert_eq!(state.dirty, occurrences == 1);
            assert!(occurrences <= 1);
        }
    }

    #[test]
    fn create_postconditions() {
        let mut m = manager();
        let e = m.create().unwrap();
        assert!(m.is_alive(e));
        assert!(m.is_enabled(e));
        assert!(!m.is_dirty(e));
        assert!(!m.store().has_any(e));
        assert_eq!(m.entities(), 1);
        assert_eq!(m.entities_created(), 1);
        assert_eq!(m.entities_in_memory(), 4);
        assert_invariants(&m);
    }

    #[test]
    fn construction_rejects_invalid_config() {
        let config = EcsConfig {
            initial_capacity: 100,
            max_entities: 10,
            prewarm_ratio: 0.5,
        };
        assert!(matches!(
            EntityManager::new(Components::new(), &config),
            Err(EcsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn refresh_is_idempotent() {
        let mut m = manager();
        let e = m.create().unwrap();
        m.refresh(e);
        m.refresh(e);
        assert_eq!(m.dirty_count(), 1);
        assert!(m.is_dirty(e));
        assert_invariants(&m);
    }

    #[test]
    fn replacing_a_component_does_not_dirty() {
        let mut m = manager();
        let (mut systems, _) = registry(0);
        let e = m.create().unwrap();
        m.add_component(e, Position { x: 0.0, y: 0.0 });
        assert!(m.is_dirty(e));
        m.clean(&mut systems);

        m.add_component(e, Position { x: 1.0, y: 1.0 });
        assert!(!m.is_dirty(e));
        assert_eq!(m.get::<Position>(e), Some(&Position { x: 1.0, y: 1.0 }));
    }

    #[test]
    fn add_components_dirties_only_on_structural_change() {
        let mut m = manager();
        let (mut systems, _) = registry(0);
        let e = m.create().unwrap();
        m.add_components(e, (Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0, dy: 0.0 }));
        assert!(m.is_dirty(e));
        m.clean(&mut systems);

        m.add_components(e, (Position { x: 2.0, y: 0.0 }, Velocity { dx: 0.0, dy: 0.0 }));
        assert!(!m.is_dirty(e));
        m.add_components(e, (Position { x: 3.0, y: 0.0 }, 1u8));
        assert!(m.is_dirty(e));
    }

    #[test]
    fn remove_component_dirties_only_on_actual_removal() {
        let mut m = manager();
        let (mut systems, _) = registry(0);
        let e = m.create().unwrap();
        m.add_components(e, (Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0, dy: 0.0 }));
        m.clean(&mut systems);

        assert_eq!(m.remove_component::<u8>(e), None);
        assert!(!m.remove_component_type(e, ComponentType::of::<u16>()));
        assert!(!m.is_dirty(e));

        assert_eq!(
            m.remove_component::<Velocity>(e),
            Some(Velocity { dx: 1.0, dy: 0.0 })
        );
        assert!(m.is_dirty(e));
        m.clean(&mut systems);

        assert!(m.remove_component_type(e, ComponentType::of::<Position>()));
        assert!(m.is_dirty(e));
        m.clean(&mut systems);
        assert!(!m.is_alive(e));
    }

    #[test]
    fn no_op_toggles_do_not_dirty() {
        let mut m = manager();
        let (mut systems, _) = registry(0);
        let e = m.create().unwrap();
        m.add_component(e, Position { x: 0.0, y: 0.0 });
        m.clean(&mut systems);

        m.enable(e);
        assert!(!m.is_dirty(e));

        m.disable(e);
        assert!(m.is_dirty(e));
        assert!(!m.is_enabled(e));
        m.clean(&mut systems);

        m.disable(e);
        assert!(!m.is_dirty(e));
        m.enable(e);
        assert!(m.is_dirty(e));
        assert_eq!(m.dirty_count(), 1);
        assert_invariants(&m);
    }

    #[test]
    fn disabled_entity_with_components_survives_clean() {
        let mut m = manager();
        let (mut systems, _) = registry(1);
        let e = m.create().unwrap();
        m.add_component(e, Position { x: 0.0, y: 0.0 });
        m.disable(e);
        m.clean(&mut systems);
        assert!(m.is_alive(e));
        assert!(!m.is_enabled(e));
    }

    #[test]
    fn rescue_after_remove() {
        let mut m = manager();
        let (mut systems, log) = registry(1);
        let e = m.create().unwrap();
        m.add_component(e, Position { x: 0.0, y: 0.0 });
        m.clean(&mut systems);
        log.lock().unwrap().clear();

        m.remove(e);
        m.add_component(e, Velocity { dx: 0.0, dy: 1.0 });
        assert_eq!(m.dirty_count(), 1);
        m.clean(&mut systems);

        assert!(m.is_alive(e));
        assert!(!m.has::<Position>(e));
        assert!(m.has::<Velocity>(e));
        assert_eq!(*log.lock().unwrap(), vec![(0, e)]);
        assert_eq!(m.entities_destroyed(), 0);
        assert_invariants(&m);
    }

    #[test]
    fn empty_dirty_entity_is_deleted_and_recycled() {
        let mut m = manager();
        let (mut systems, _) = registry(2);
        let e = m.create().unwrap();
        let other = m.create().unwrap();
        m.add_component(other, Position { x: 0.0, y: 0.0 });
        m.refresh(e);
        assert_eq!(m.entities(), 2);

        m.clean(&mut systems);
        assert!(!m.is_alive(e));
        assert!(m.pool().is_free(e.index()));
        assert_eq!(m.entities(), 1);
        assert_eq!(m.entities_destroyed(), 1);
        assert_invariants(&m);

        let reused = m.create().unwrap();
        assert_eq!(reused.index(), e.index());
        assert_eq!(reused.generation(), e.generation() + 1);
        assert!(!m.is_alive(e));
        assert_invariants(&m);
    }

    #[test]
    fn clean_order_is_entity_major_then_registration() {
        let mut m = manager();
        let (mut systems, log) = registry(3);
        let entities: Vec<Entity> = (0..4).map(|_| m.create().unwrap()).collect();
        // Dirty in a non-index order.
        for &i in &[2usize, 0, 3, 1] {
            m.add_component(entities[i], Position { x: 0.0, y: 0.0 });
        }
        m.refresh(entities[0]);
        m.clean(&mut systems);

        let expected: Vec<(u32, Entity)> = [2usize, 0, 3, 1]
            .iter()
            .flat_map(|&i| {
                let e = entities[i];
                (0..3).map(move |s| (s, e))
            })
            .collect();
        assert_eq!(*log.lock().unwrap(), expected);
        assert_eq!(log.lock().unwrap().len(), 4 * 3);
        assert_eq!(m.dirty_count(), 0);
        assert_invariants(&m);
    }

    #[test]
    fn clean_clears_dirty_after_revalidation() {
        struct SeenLog {
            seen: Arc<Mutex<Vec<Entity>>>,
        }
        impl Subsystem for SeenLog {
            fn revalidate(&mut self, entity: &EntityView<'_>) {
                self.seen.lock().unwrap().push(entity.entity());
            }
        }

        let mut m = manager();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut systems = SubsystemRegistry::new();
        systems.register(SeenLog { seen: seen.clone() });

        let a = m.create().unwrap();
        let b = m.create().unwrap();
        m.add_component(a, Position { x: 0.0, y: 0.0 });
        m.add_component(b, Position { x: 1.0, y: 0.0 });
        m.clean(&mut systems);

        assert_eq!(*seen.lock().unwrap(), vec![a, b]);
        assert!(!m.is_dirty(a));
        assert!(!m.is_dirty(b));
        assert_invariants(&m);
    }

    #[test]
    fn empty_clean_is_a_no_op() {
        let mut m = manager();
        let (mut systems, log) = registry(2);
        m.create().unwrap();
        m.clean(&mut systems);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(m.entities(), 1);
    }

    #[test]
    fn revalidation_sees_final_state() {
        struct FinalState(Arc<Mutex<Vec<(bool, bool)>>>);
        impl Subsystem for FinalState {
            fn revalidate(&mut self, entity: &EntityView<'_>) {
                self.0
                    .lock()
                    .unwrap()
                    .push((entity.is_enabled(), entity.has::<Position>()));
            }
        }

        let mut m = manager();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut systems = SubsystemRegistry::new();
        systems.register(FinalState(seen.clone()));

        let e = m.create().unwrap();
        m.add_component(e, Position { x: 0.0, y: 0.0 });
        m.disable(e);
        m.enable(e);
        m.remove_component::<Position>(e);
        m.add_component(e, Position { x: 1.0, y: 0.0 });
        m.clean(&mut systems);

        assert_eq!(*seen.lock().unwrap(), vec![(true, true)]);
    }

    #[test]
    fn concrete_scenario() {
        let mut m = manager();
        let (mut systems, _) = registry(1);
        let e0 = m.create().unwrap();
        let e1 = m.create().unwrap();
        let e2 = m.create().unwrap();
        assert_eq!([e0.index(), e1.index(), e2.index()], [0, 1, 2]);

        m.add_component(e0, Position { x: 0.0, y: 0.0 });
        m.clean(&mut systems);
        assert!(m.is_alive(e0) && m.is_alive(e1) && m.is_alive(e2));
        assert!(m.has::<Position>(e0));
        assert_eq!(m.entities(), 3);

        m.remove(e0);
        m.clean(&mut systems);
        assert!(!m.is_alive(e0));
        assert_eq!(m.entities(), 2);
        assert_eq!(m.pool().discarded(), 1);

        let next = m.create().unwrap();
        assert_eq!(next.index(), 0);
        assert_invariants(&m);
    }

    #[test]
    fn counters_are_monotonic() {
        let mut m = manager();
        let (mut systems, _) = registry(0);
        let mut last = m.stats();
        for round in 0..5 {
            let created: Vec<Entity> = (0..3).map(|_| m.create().unwrap()).collect();
            for &e in &created {
                m.refresh(e);
            }
            m.clean(&mut systems);
            let stats = m.stats();
            assert!(stats.created >= last.created);
            assert!(stats.destroyed >= last.destroyed);
            assert_eq!(stats.created, 3 * (round + 1));
            assert_eq!(stats.destroyed, 3 * (round + 1));
            last = stats;
        }
        assert_eq!(m.entities(), 0);
        assert_eq!(m.entities_in_memory(), 4);
    }

    #[test]
    fn pool_exhaustion_is_reported() {
        let config = EcsConfig {
            initial_capacity: 2,
            max_entities: 2,
            prewarm_ratio: 0.0,
        };
        let mut m: EntityManager = EntityManager::new(Components::new(), &config).unwrap();
        m.create().unwrap();
        m.create().unwrap();
        assert!(matches!(
            m.create(),
            Err(EcsError::PoolExhausted { capacity: 2 })
        ));
        assert_eq!(m.entities_created(), 2);
    }

    #[test]
    fn revalidate_all_visits_live_entities() {
        let mut m = manager();
        let a = m.create().unwrap();
        let b = m.create().unwrap();
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut recorder = Recorder {
            id: 9,
            log: log.clone(),
        };
        m.revalidate_all(&mut recorder);
        let mut seen: Vec<Entity> = log.lock().unwrap().iter().map(|&(_, e)| e).collect();
        seen.sort_by_key(|e| e.index());
        assert_eq!(seen, vec![a, b]);
    }

    #[test]
    fn stale_reads_return_nothing() {
        let mut m = manager();
        let (mut systems, _) = registry(0);
        let e = m.create().unwrap();
        m.remove(e);
        m.clean(&mut systems);
        let reused = m.create().unwrap();
        m.add_component(reused, Position { x: 5.0, y: 5.0 });

        assert_eq!(m.get::<Position>(e), None);
        assert!(!m.has::<Position>(e));
        assert!(!m.is_enabled(e));
        assert_eq!(m.get::<Position>(reused), Some(&Position { x: 5.0, y: 5.0 }));
    }

    #[test]
    #[should_panic(expected = "not alive")]
    fn stale_handle_mutation_panics() {
        let mut m = manager();
        let (mut systems, _) = registry(0);
        let e = m.create().unwrap();
        m.remove(e);
        m.clean(&mut systems);
        m.create().unwrap();
        m.add_component(e, Position { x: 0.0, y: 0.0 });
    }

    #[test]
    #[should_panic(expected = "not alive")]
    fn foreign_handle_panics() {
        let mut m = manager();
        m.refresh(Entity::from_raw(40, 0));
    }
}
