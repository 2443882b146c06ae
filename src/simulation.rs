//! A small agent simulation driven through the entity manager.
//!
//! Agents are spawned with a random position, velocity and lifetime, drift across a
//! wrapping square world and are removed when their lifetime runs out.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tessera_ecs::{Aspect, EntityManager, EntityView, Family, Subsystem};
use tracing::warn;

use crate::settings::SimulationSettings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

/// Remaining ticks before the agent is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifetime(pub u32);

/// Creates new agents every tick.
pub struct Spawner {
    rng: StdRng,
    per_tick: u32,
    max_lifetime: u32,
    world_size: f32,
}

impl Spawner {
    pub fn new(settings: &SimulationSettings) -> Self {
        Self {
            rng: StdRng::seed_from_u64(settings.seed),
            per_tick: settings.spawn_per_tick,
            max_lifetime: settings.max_lifetime.max(1),
            world_size: settings.world_size,
        }
    }
}

impl Subsystem for Spawner {
    fn revalidate(&mut self, _entity: &EntityView<'_>) {}

    fn process(&mut self, entities: &mut EntityManager) {
        for _ in 0..self.per_tick {
            let entity = match entities.create() {
                Ok(entity) => entity,
                Err(e) => {
                    warn!("Spawner paused: {}", e);
                    break;
                }
            };
            let position = Position {
                x: self.rng.gen_range(0.0..self.world_size),
                y: self.rng.gen_range(0.0..self.world_size),
            };
            let velocity = Velocity {
                dx: self.rng.gen_range(-1.0..1.0),
                dy: self.rng.gen_range(-1.0..1.0),
            };
            let lifetime = Lifetime(self.rng.gen_range(1..=self.max_lifetime));
            entities.add_components(entity, (position, velocity, lifetime));
        }
    }
}

/// Integrates positions, wrapping at the world edge.
pub struct Movement {
    family: Family,
    world_size: f32,
}

impl Movement {
    pub fn new(settings: &SimulationSettings) -> Self {
        Self {
            family: Family::new(Aspect::new().with::<Position>().with::<Velocity>()),
            world_size: settings.world_size,
        }
    }
}

impl Subsystem for Movement {
    fn revalidate(&mut self, entity: &EntityView<'_>) {
        self.family.revalidate(entity);
    }

    fn process(&mut self, entities: &mut EntityManager) {
        for entity in self.family.entities() {
            let Some(&Velocity { dx, dy }) = entities.get::<Velocity>(entity) else {
                continue;
            };
            if let Some(pos) = entities.get_mut::<Position>(entity) {
                pos.x = wrap(pos.x + dx, self.world_size);
                pos.y = wrap(pos.y + dy, self.world_size);
            }
        }
    }
}

/// `rem_euclid` can round up to `size` itself for tiny negative inputs.
fn wrap(value: f32, size: f32) -> f32 {
    let wrapped = value.rem_euclid(size);
    if wrapped >= size {
        0.0
    } else {
        wrapped
    }
}

/// Counts lifetimes down and removes expired agents.
pub struct Aging {
    family: Family,
}

impl Aging {
    pub fn new() -> Self {
        Self {
            family: Family::new(Aspect::new().with::<Lifetime>()),
        }
    }
}

impl Default for Aging {
    fn default() -> Self {
        Self::new()
    }
}

impl Subsystem for Aging {
    fn revalidate(&mut self, entity: &EntityView<'_>) {
        self.family.revalidate(entity);
    }

    fn process(&mut self, entities: &mut EntityManager) {
        for entity in self.family.entities() {
            let expired = match entities.get_mut::<Lifetime>(entity) {
                Some(lifetime) => {
                    lifetime.0 = lifetime.0.saturating_sub(1);
                    lifetime.0 == 0
                }
                None => false,
            };
            if expired {
                entities.remove(entity);
            }
        }
    }
}
