use tracing::debug;

use crate::component::{ComponentStore, Components};
use crate::config::EcsConfig;
use crate::error::EcsError;
use crate::manager::EntityManager;
use crate::system::{Subsystem, SubsystemRegistry};

/// Owns the entity manager and the subsystems it revalidates against, and drives
/// the process/clean cycle.
pub struct Ecs<S: ComponentStore = Components> {
    entities: EntityManager<S>,
    systems: SubsystemRegistry<S>,
}

impl Ecs<Components> {
    /// An ECS with the default component store and configuration.
    pub fn new() -> Result<Self, EcsError> {
        Self::builder().store(Components::new()).build()
    }
}

impl<S: ComponentStore + 'static> Ecs<S> {
    pub fn builder() -> EcsBuilder<S> {
        EcsBuilder::new()
    }

    /// Run one cycle: each subsystem's processing pass, in registration order, each
    /// followed by exactly one clean pass. With no subsystems the cycle is a single
    /// clean pass.
    pub fn process(&mut self) {
        if self.systems.is_empty() {
            self.entities.clean(&mut self.systems);
            return;
        }
        for index in 0..self.systems.len() {
            if let Some(system) = self.systems.get_mut(index) {
                system.process(&mut self.entities);
            }
            self.entities.clean(&mut self.systems);
        }
    }

    /// Append a subsystem. It is revalidated against every live entity so its
    /// working set starts out consistent.
    pub fn register<T: Subsystem<S> + 'static>(&mut self, system: T) {
        self.systems.register(system);
        if let Some(system) = self.systems.last_mut() {
            debug!("Registered subsystem {}", system.name());
            self.entities.revalidate_all(system);
        }
    }

    pub fn entities(&self) -> &EntityManager<S> {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityManager<S> {
        &mut self.entities
    }

    pub fn systems(&self) -> &SubsystemRegistry<S> {
        &self.systems
    }

    /// Run a clean pass outside of [`process`](Self::process), e.g. after setup code
    /// created entities.
    pub fn clean(&mut self) {
        self.entities.clean(&mut self.systems);
    }
}

/// Builder for [`Ecs`]. A component store is required.
pub struct EcsBuilder<S: ComponentStore = Components> {
    config: EcsConfig,
    store: Option<S>,
    systems: SubsystemRegistry<S>,
}

impl<S: ComponentStore + 'static> EcsBuilder<S> {
    pub fn new() -> Self {
        Self {
            config: EcsConfig::default(),
            store: None,
            systems: SubsystemRegistry::new(),
        }
    }

    pub fn config(mut self, config: EcsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(mut self, store: S) -> Self {
        self.store = Some(store);
        self
    }

    pub fn subsystem<T: Subsystem<S> + 'static>(mut self, system: T) -> Self {
        self.systems.register(system);
        self
    }

    pub fn build(self) -> Result<Ecs<S>, EcsError> {
        let store = self
            .store
            .ok_or(EcsError::MissingCollaborator("component store"))?;
        let entities = EntityManager::new(store, &self.config)?;
        debug!("Ecs built with {} subsystems", self.systems.len());
        Ok(Ecs {
            entities,
            systems: self.systems,
        })
    }
}

impl<S: ComponentStore + 'static> Default for EcsBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
