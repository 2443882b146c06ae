/// Errors reported by the entity lifecycle coordinator.
///
/// Misuse of entity handles (stale handles, double frees) is not represented here;
/// those are caller bugs and panic.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    #[error("missing required collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("entity pool exhausted (capacity {capacity})")]
    PoolExhausted { capacity: usize },
}

/// Errors that can occur while loading an [`EcsConfig`](crate::EcsConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] EcsError),
}
