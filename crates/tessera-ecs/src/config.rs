use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EcsError};

/// Sizing of the entity set and its recycling pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcsConfig {
    /// Expected number of live entities. Pre-sizes the active and dirty sets.
    pub initial_capacity: usize,
    /// Hard bound on handles the pool may ever allocate.
    pub max_entities: usize,
    /// Fraction (0.0–1.0) of `initial_capacity` created eagerly at startup.
    pub prewarm_ratio: f32,
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            max_entities: 1 << 20,
            prewarm_ratio: 0.5,
        }
    }
}

impl EcsConfig {
    /// Check the sizing constraints.
    pub fn validate(&self) -> Result<(), EcsError> {
        if self.max_entities == 0 {
            return Err(EcsError::InvalidConfig("max_entities must be positive".into()));
        }
        if self.max_entities > u32::MAX as usize {
            return Err(EcsError::InvalidConfig(format!(
                "max_entities {} exceeds the entity index range",
                self.max_entities
            )));
        }
        if self.initial_capacity > self.max_entities {
            return Err(EcsError::InvalidConfig(format!(
                "initial_capacity {} exceeds max_entities {}",
                self.initial_capacity, self.max_entities
            )));
        }
        if !(0.0..=1.0).contains(&self.prewarm_ratio) {
            return Err(EcsError::InvalidConfig(format!(
                "prewarm_ratio {} is outside 0.0..=1.0",
                self.prewarm_ratio
            )));
        }
        Ok(())
    }

    /// Number of handles to create eagerly.
    pub fn prewarm_count(&self) -> usize {
        (self.initial_capacity as f64 * f64::from(self.prewarm_ratio)) as usize
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }
}
