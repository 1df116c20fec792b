//! # Engine Configuration
//!
//! Loaded once at startup. Every field has a default, so an empty file (or
//! no file at all) yields a working engine.
//!
//! ```toml
//! # tinyecs.toml
//! entity_capacity = 4096
//! component_capacity = 1024
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{EcsError, EcsResult};

/// Default number of entity slots reserved up front.
pub const DEFAULT_ENTITY_CAPACITY: usize = 64;

/// Default number of slots reserved for each new per-type storage.
pub const DEFAULT_COMPONENT_CAPACITY: usize = 64;

/// Largest accepted `entity_capacity`.
pub const MAX_ENTITY_CAPACITY: usize = 1 << 24;

/// Largest accepted `component_capacity`.
pub const MAX_COMPONENT_CAPACITY: usize = 1 << 24;

/// Engine configuration.
///
/// Capacities are reservations, not limits: the engine grows past them.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Entity slots reserved at construction.
    pub entity_capacity: usize,
    /// Slots reserved for each component type's storage when it is first
    /// used.
    pub component_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            entity_capacity: DEFAULT_ENTITY_CAPACITY,
            component_capacity: DEFAULT_COMPONENT_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ConfigParse`] for malformed TOML or unknown keys,
    /// and [`EcsError::InvalidConfig`] if a value is out of range.
    pub fn from_toml_str(source: &str) -> EcsResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ConfigIo`] if the file cannot be read, otherwise
    /// the same errors as [`Self::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> EcsResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Checks that every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if `entity_capacity` exceeds
    /// [`MAX_ENTITY_CAPACITY`] or `component_capacity` exceeds
    /// [`MAX_COMPONENT_CAPACITY`].
    pub fn validate(&self) -> EcsResult<()> {
        check_limit("entity_capacity", self.entity_capacity, MAX_ENTITY_CAPACITY)?;
        check_limit(
            "component_capacity",
            self.component_capacity,
            MAX_COMPONENT_CAPACITY,
        )
    }
}

fn check_limit(field: &str, value: usize, max: usize) -> EcsResult<()> {
    if value > max {
        return Err(EcsError::InvalidConfig(format!(
            "{field} {value} exceeds the limit {max}"
        )));
    }
    Ok(())
}
