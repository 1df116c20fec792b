//! # Engine Error Types
//!
//! Missing ids and entities in cleanup operations are not errors: those
//! calls report `false` or a zero count and change nothing. The variants
//! below cover the few operations that cannot degrade to a no-op.

use thiserror::Error;

use crate::ecs::EntityId;

/// Errors that can occur in the engine.
#[derive(Error, Debug)]
pub enum EcsError {
    /// Components were added for an entity handle that is not registered.
    ///
    /// The handle was never issued, or the entity has been removed.
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration file is not valid TOML or has the wrong shape.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),
}

/// Result type for engine operations.
pub type EcsResult<T> = Result<T, EcsError>;
