//! Tessera - runs a deterministic agent simulation on the Tessera ECS.
//!
//! Usage: `tessera [settings.toml]`, or `tessera --init` to write the default
//! settings to the config directory.

mod settings;
mod simulation;

use std::path::PathBuf;

use anyhow::Result;
use tessera_ecs::{Components, Ecs};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use settings::Settings;
use simulation::{Aging, Movement, Spawner};

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let arg = std::env::args().nth(1);
    if arg.as_deref() == Some("--init") {
        return Settings::default().save();
    }

    let settings = Settings::load(arg.map(PathBuf::from).as_deref());
    let sim = &settings.simulation;

    let mut ecs = Ecs::builder()
        .store(Components::new())
        .config(settings.ecs.clone())
        .subsystem(Spawner::new(sim))
        .subsystem(Movement::new(sim))
        .subsystem(Aging::new())
        .build()?;

    info!("Running {} ticks with seed {}", sim.ticks, sim.seed);
    for tick in 0..sim.ticks {
        ecs.process();
        let stats = ecs.entities().stats();
        info!(
            tick,
            alive = stats.alive,
            created = stats.created,
            destroyed = stats.destroyed,
            in_memory = stats.in_memory,
            "tick complete"
        );
    }

    let stats = ecs.entities().stats();
    info!("Final stats:\n{}", toml::to_string_pretty(&stats)?);
    Ok(())
}
