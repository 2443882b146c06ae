//! Tessera ECS - entity lifecycle coordination
//!
//! Creates, tracks and recycles entity handles, and defers the consequences of
//! structural changes to a clean pass that runs after each subsystem's processing
//! pass. Entities use generational handles; component storage is sparse-set based.

mod aspect;
mod component;
mod config;
mod ecs;
mod entity;
mod error;
mod manager;
mod pool;
mod sparse_set;
mod system;

pub use aspect::{Aspect, Family, Membership};
pub use component::{Bundle, Component, ComponentStore, ComponentType, Components};
pub use config::EcsConfig;
pub use ecs::{Ecs, EcsBuilder};
pub use entity::Entity;
pub use error::{ConfigError, EcsError};
pub use manager::{EntityManager, EntityStats};
pub use pool::EntityPool;
pub use sparse_set::SparseSet;
pub use system::{EntityView, Subsystem, SubsystemRegistry};
