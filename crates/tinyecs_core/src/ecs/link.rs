//! # Entity Links
//!
//! Remembers which entity each linked component was added for, so
//! entity-scoped queries can pair a component with its owner. Links are
//! keyed by [`ComponentId`] and point at an [`EntityId`] handle, never at
//! an entity value.

use std::collections::HashMap;

use super::component::ComponentId;
use super::entity::EntityId;

/// Mapping from component id to owning entity.
#[derive(Clone, Debug, Default)]
pub struct LinkTable {
    links: HashMap<ComponentId, EntityId>,
}

impl LinkTable {
    /// Creates an empty link table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of links.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns `true` if there are no links.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Returns the entity that owns `component`.
    #[inline]
    #[must_use]
    pub fn owner_of(&self, component: ComponentId) -> Option<EntityId> {
        self.links.get(&component).copied()
    }

    /// Iterates over all `(component, owner)` links. Order is unspecified.
    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, EntityId)> + '_ {
        self.links.iter().map(|(&c, &e)| (c, e))
    }

    /// Records `entity` as the owner of `component`.
    ///
    /// Overwrites any existing link, returning the previous owner.
    pub(crate) fn link(&mut self, component: ComponentId, entity: EntityId) -> Option<EntityId> {
        self.links.insert(component, entity)
    }

    /// Drops the link for `component`, returning the owner it pointed at.
    pub(crate) fn unlink(&mut self, component: ComponentId) -> Option<EntityId> {
        self.links.remove(&component)
    }
}
