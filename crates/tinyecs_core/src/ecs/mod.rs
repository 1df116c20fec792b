//! # Entity Component System
//!
//! A small ECS built around three containers and one lock.
//!
//! ## Design Philosophy
//!
//! - Components are stored per concrete type, selected at compile time
//! - Component ids come from a monotonic counter and are never reused
//! - Entity handles are slot indices with generation counters
//! - Queries run over snapshots, so visitors may write back freely

mod component;
mod engine;
mod entity;
mod link;
pub mod query;
mod storage;

pub use component::{Component, ComponentBundle, ComponentId};
pub use engine::Engine;
pub use entity::{EntityData, EntityId, EntityRef, EntityRegistry};
pub use link::LinkTable;
pub use query::{each, each_entity, set};
pub use storage::{ComponentStorage, ComponentStore, Snapshot};
