//! # TinyECS Core
//!
//! Minimal entity-component storage and query engine:
//! - Components of any `Clone + Send + Sync` type, keyed by a monotonic id
//! - Entities registered by value, addressed by generation-counted handles
//! - Type-filtered scans (`each`, `each_entity`) with explicit write-back
//!   through `set`
//!
//! ## Rules
//!
//! 1. **Ids are never recycled** - a deleted component id stays dead
//! 2. **Visitors get copies** - mutations persist only through `set`
//! 3. **Missing targets are no-ops** - deleting twice is always safe
//!
//! ## Example
//!
//! ```rust
//! use tinyecs_core::{each, each_entity, set, Engine};
//!
//! #[derive(Clone, PartialEq)]
//! struct Player {
//!     name: String,
//! }
//!
//! #[derive(Clone)]
//! struct Health(f32);
//!
//! let engine = Engine::new();
//! let player = engine.add_entity(Player { name: "a1".into() });
//! engine.add_components(player, (Health(100.0),)).unwrap();
//!
//! each(&engine, |id, health: Health| {
//!     set(&engine, id, Health(health.0 - 10.0));
//! });
//!
//! let count = each_entity(&engine, |player: Player, health: Health| {
//!     assert_eq!(player.name, "a1");
//!     assert_eq!(health.0, 90.0);
//! });
//! assert_eq!(count, 1);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::EngineConfig;
pub use ecs::{
    each, each_entity, set, Component, ComponentBundle, ComponentId, ComponentStorage,
    ComponentStore, Engine, EntityData, EntityId, EntityRef, EntityRegistry, LinkTable, Snapshot,
};
pub use error::{EcsError, EcsResult};
