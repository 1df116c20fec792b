//! # ECS Engine
//!
//! The central container for all entities and components.
//!
//! The engine owns the [`ComponentStore`], the [`LinkTable`] and the
//! [`EntityRegistry`] behind a single reader-writer lock. Every mutation
//! takes the write lock for exactly its own critical section, so a
//! component, its link and its owner's id list always change together.
//! Scans take the read lock only long enough to copy a snapshot.

use std::fmt;
use std::path::Path;

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use tracing::{debug, trace};

use super::component::{Component, ComponentBundle, ComponentId};
use super::entity::{EntityData, EntityId, EntityRegistry};
use super::link::LinkTable;
use super::storage::{ComponentStore, Snapshot};
use crate::config::EngineConfig;
use crate::error::{EcsError, EcsResult};

/// Everything the engine lock protects.
struct EngineState {
    store: ComponentStore,
    links: LinkTable,
    entities: EntityRegistry,
}

impl EngineState {
    /// Deletes `id` from the store, its link, and its owner's id list.
    fn delete_component(&mut self, id: ComponentId) -> bool {
        if !self.store.remove(id) {
            return false;
        }
        if let Some(owner) = self.links.unlink(id) {
            self.entities.release(owner, id);
        }
        true
    }
}

/// The ECS engine - sole owner of all component and entity state.
///
/// Every method takes `&self`; share the engine between threads with an
/// `Arc`. Operations on ids or entities that do not exist are no-ops that
/// report `false` (or zero), so cleanup code can delete twice safely.
///
/// # Example
///
/// ```rust
/// use tinyecs_core::{each, Engine};
///
/// #[derive(Clone, PartialEq)]
/// struct Ship;
///
/// #[derive(Clone)]
/// struct Fuel(f32);
///
/// let engine = Engine::new();
/// let ship = engine.add_entity(Ship);
/// engine.add_component(ship, Fuel(10.0)).unwrap();
///
/// let burned = each(&engine, |id, fuel: Fuel| {
///     engine.set(id, Fuel(fuel.0 - 1.0));
/// });
/// assert_eq!(burned, 1);
/// ```
pub struct Engine {
    state: RwLock<EngineState>,
}

impl Engine {
    /// Creates an engine with empty storage, no entities and the component
    /// id counter at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::build(&EngineConfig::default())
    }

    /// Creates an engine with the given reservations.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the configuration does not
    /// validate.
    pub fn with_config(config: &EngineConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Creates an engine from a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns any error from [`EngineConfig::from_toml_file`].
    pub fn from_config_file(path: impl AsRef<Path>) -> EcsResult<Self> {
        let config = EngineConfig::from_toml_file(path)?;
        Ok(Self::build(&config))
    }

    fn build(config: &EngineConfig) -> Self {
        debug!(
            entity_capacity = config.entity_capacity,
            component_capacity = config.component_capacity,
            "engine created"
        );
        Self {
            state: RwLock::new(EngineState {
                store: ComponentStore::with_storage_capacity(config.component_capacity),
                links: LinkTable::new(),
                entities: EntityRegistry::with_capacity(config.entity_capacity),
            }),
        }
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Registers an entity value and returns its handle.
    ///
    /// Equal values may be registered any number of times; each gets its
    /// own handle.
    pub fn add_entity<E: EntityData>(&self, entity: E) -> EntityId {
        let id = self.state.write().entities.insert(entity);
        debug!(entity = %id, kind = std::any::type_name::<E>(), "entity registered");
        id
    }

    /// Unregisters an entity.
    ///
    /// The entity's components stay in the store along with their links.
    /// Both [`each`](super::query::each) and
    /// [`each_entity`](super::query::each_entity) keep reporting them, the
    /// latter paired with the removed entity's value. Use
    /// [`Self::destroy_entity`] to delete them as well.
    ///
    /// Returns `false` if `id` is not registered.
    pub fn remove_entity(&self, id: EntityId) -> bool {
        let removed = self.state.write().entities.detach(id);
        if removed {
            debug!(entity = %id, "entity removed");
        }
        removed
    }

    /// Unregisters the first entity, in registration order, whose value
    /// equals `entity`.
    ///
    /// This is a linear scan with a full value comparison per entity.
    /// Prefer [`Self::remove_entity`] when the handle is at hand.
    ///
    /// Returns `false` if no registered entity matches.
    pub fn remove_entity_by_value<E: EntityData + PartialEq>(&self, entity: &E) -> bool {
        let mut state = self.state.write();
        let Some(id) = state.entities.find(entity) else {
            return false;
        };
        state.entities.detach(id);
        drop(state);

        debug!(entity = %id, "entity removed by value");
        true
    }

    /// Unregisters an entity and deletes every component it owns.
    ///
    /// Also accepts the handle of an entity already removed with
    /// [`Self::remove_entity`], deleting the components it left behind.
    /// Returns the number of components deleted; 0 if `id` is unknown.
    pub fn destroy_entity(&self, id: EntityId) -> usize {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let Some(removed) = state.entities.remove(id) else {
            return 0;
        };

        let mut deleted = 0;
        for component in removed.components {
            state.links.unlink(component);
            if state.store.remove(component) {
                deleted += 1;
            }
        }
        drop(guard);

        debug!(entity = %id, components = deleted, "entity destroyed");
        deleted
    }

    /// Returns `true` if `id` is registered.
    #[must_use]
    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.state.read().entities.contains(id)
    }

    /// Returns a copy of the value of entity `id`, if registered and of
    /// type `E`.
    #[must_use]
    pub fn entity<E: EntityData>(&self, id: EntityId) -> Option<E> {
        self.state.read().entities.get::<E>(id).cloned()
    }

    /// Returns the number of registered entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.state.read().entities.len()
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Adds components for `entity`, in tuple order.
    ///
    /// All components are stored, linked to `entity` and appended to its
    /// owned list under one lock acquisition. The returned ids are in the
    /// same order as the tuple.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownEntity`] if `entity` is not registered;
    /// nothing is stored in that case.
    pub fn add_components<B: ComponentBundle>(
        &self,
        entity: EntityId,
        bundle: B,
    ) -> EcsResult<Vec<ComponentId>> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        if !state.entities.contains(entity) {
            return Err(EcsError::UnknownEntity(entity));
        }

        let mut ids = Vec::with_capacity(B::LEN);
        bundle.store_all(&mut state.store, &mut ids);
        for &id in &ids {
            state.links.link(id, entity);
        }
        if let Some(owned) = state.entities.components_mut(entity) {
            owned.extend_from_slice(&ids);
        }
        drop(guard);

        trace!(entity = %entity, count = ids.len(), "components added");
        Ok(ids)
    }

    /// Adds a single component for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownEntity`] if `entity` is not registered.
    pub fn add_component<C: Component>(
        &self,
        entity: EntityId,
        component: C,
    ) -> EcsResult<ComponentId> {
        let ids = self.add_components(entity, (component,))?;
        Ok(ids[0])
    }

    /// Stores a component that belongs to no entity.
    ///
    /// Visible to [`each`](super::query::each), never to
    /// [`each_entity`](super::query::each_entity).
    pub fn add_unowned_component<C: Component>(&self, component: C) -> ComponentId {
        let id = self.state.write().store.insert(component);
        trace!(component = %id, "unowned component added");
        id
    }

    /// Overwrites component `id` with `component`.
    ///
    /// The new value may be of a different type than the old one; the id is
    /// kept either way. Returns `false`, storing nothing, if `id` is not
    /// live.
    pub fn set<C: Component>(&self, id: ComponentId, component: C) -> bool {
        let updated = self.state.write().store.update(id, component);
        if updated {
            trace!(component = %id, kind = std::any::type_name::<C>(), "component updated");
        }
        updated
    }

    /// Deletes component `id`, its link and its entry in the owner's list.
    ///
    /// Returns `false` if `id` is not live. Ids are never reused.
    pub fn delete_component(&self, id: ComponentId) -> bool {
        let deleted = self.state.write().delete_component(id);
        if deleted {
            trace!(component = %id, "component deleted");
        }
        deleted
    }

    /// Deletes component `id` only if `entity` owns it.
    ///
    /// Returns `false`, changing nothing, if `entity` is not registered or
    /// does not own `id`.
    pub fn delete_entity_component(&self, entity: EntityId, id: ComponentId) -> bool {
        let mut state = self.state.write();
        let owned = state
            .entities
            .components_of(entity)
            .is_some_and(|ids| ids.contains(&id));
        if !owned {
            return false;
        }
        let deleted = state.delete_component(id);
        drop(state);

        if deleted {
            trace!(entity = %entity, component = %id, "entity component deleted");
        }
        deleted
    }

    /// Deletes every component of type `C` that equals `component`.
    ///
    /// Returns how many were deleted.
    pub fn delete_components_equal<C: Component + PartialEq>(&self, component: &C) -> usize {
        let mut state = self.state.write();
        let matches = state.store.find_equal(component);
        let deleted = matches
            .into_iter()
            .filter(|&id| state.delete_component(id))
            .count();
        drop(state);

        trace!(kind = std::any::type_name::<C>(), count = deleted, "components deleted by value");
        deleted
    }

    /// Returns a copy of component `id`, if live and of type `C`.
    #[must_use]
    pub fn get<C: Component>(&self, id: ComponentId) -> Option<C> {
        self.state.read().store.get::<C>(id).cloned()
    }

    /// Returns `true` if component `id` is live.
    #[must_use]
    pub fn contains_component(&self, id: ComponentId) -> bool {
        self.state.read().store.contains(id)
    }

    /// Returns the entity component `id` was added for.
    ///
    /// The handle may refer to an entity that has since been removed.
    #[must_use]
    pub fn owner_of(&self, id: ComponentId) -> Option<EntityId> {
        self.state.read().links.owner_of(id)
    }

    /// Returns the component ids owned by `entity`, in insertion order.
    ///
    /// Returns `None` if `entity` is not registered.
    #[must_use]
    pub fn entity_components(&self, entity: EntityId) -> Option<Vec<ComponentId>> {
        self.state
            .read()
            .entities
            .components_of(entity)
            .map(<[ComponentId]>::to_vec)
    }

    /// Returns the number of live components across all types.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.state.read().store.len()
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Copies every component of type `C`.
    #[must_use]
    pub fn snapshot<C: Component>(&self) -> Snapshot<C> {
        self.state.read().store.snapshot::<C>()
    }

    /// Copies every `C` whose owner is an entity of type `E`, paired with a
    /// copy of that entity. Owners removed with [`Self::remove_entity`]
    /// still count.
    #[must_use]
    pub fn snapshot_owned<E: EntityData, C: Component>(&self) -> Vec<(E, C)> {
        let state = self.state.read();
        let Some(storage) = state.store.storage::<C>() else {
            return Vec::new();
        };
        storage
            .iter()
            .filter_map(|(id, component)| {
                let owner = state.links.owner_of(id)?;
                let entity = state.entities.owner::<E>(owner)?;
                Some((entity.clone(), component.clone()))
            })
            .collect()
    }

    // =========================================================================
    // Read-only access to the live containers
    // =========================================================================
    //
    // Each guard holds the read lock. Calling a mutating method on the same
    // thread while a guard is alive deadlocks.

    /// Read access to the component store.
    pub fn components(&self) -> MappedRwLockReadGuard<'_, ComponentStore> {
        RwLockReadGuard::map(self.state.read(), |state| &state.store)
    }

    /// Read access to the entity registry.
    pub fn entities(&self) -> MappedRwLockReadGuard<'_, EntityRegistry> {
        RwLockReadGuard::map(self.state.read(), |state| &state.entities)
    }

    /// Read access to the link table.
    pub fn links(&self) -> MappedRwLockReadGuard<'_, LinkTable> {
        RwLockReadGuard::map(self.state.read(), |state| &state.links)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Engine");
        match self.state.try_read() {
            Some(state) => out
                .field("components", &state.store.len())
                .field("entities", &state.entities.len())
                .field("links", &state.links.len())
                .finish(),
            None => out.finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Probe {
        name: &'static str,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Mass(f32);

    #[derive(Clone, Debug, PartialEq)]
    struct Label(&'static str);

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }

    #[test]
    fn test_new_engine_is_empty() {
        let engine = Engine::new();
        assert_eq!(engine.component_count(), 0);
        assert_eq!(engine.entity_count(), 0);
        assert_eq!(engine.components().next_id(), ComponentId::from_raw(0));
        assert!(engine.links().is_empty());
    }

    #[test]
    fn test_with_config_validates() {
        let config = EngineConfig {
            entity_capacity: 8,
            component_capacity: 8,
        };
        assert!(Engine::with_config(&config).is_ok());
    }

    #[test]
    fn test_add_components_links_and_owns() {
        let engine = Engine::new();
        let probe = engine.add_entity(Probe { name: "p" });
        let ids = engine.add_components(probe, (Mass(1.0), Label("x"))).unwrap();

        assert_eq!(engine.entity_components(probe), Some(ids.clone()));
        for &id in &ids {
            assert_eq!(engine.owner_of(id), Some(probe));
        }
        assert_eq!(engine.links().len(), 2);
    }

    #[test]
    fn test_add_to_unknown_entity_stores_nothing() {
        let engine = Engine::new();
        let probe = engine.add_entity(Probe { name: "gone" });
        assert!(engine.remove_entity(probe));

        let err = engine.add_component(probe, Mass(1.0)).unwrap_err();
        assert!(matches!(err, EcsError::UnknownEntity(id) if id == probe));
        assert_eq!(engine.component_count(), 0);
        // The counter did not move either.
        assert_eq!(engine.components().next_id(), ComponentId::from_raw(0));
    }

    #[test]
    fn test_delete_component_cleans_every_container() {
        let engine = Engine::new();
        let probe = engine.add_entity(Probe { name: "p" });
        let ids = engine
            .add_components(probe, (Mass(1.0), Mass(2.0), Mass(3.0)))
            .unwrap();

        assert!(engine.delete_component(ids[1]));
        assert!(!engine.delete_component(ids[1]));

        assert_eq!(engine.entity_components(probe), Some(vec![ids[0], ids[2]]));
        assert_eq!(engine.owner_of(ids[1]), None);
        assert_eq!(engine.get::<Mass>(ids[1]), None);
        assert_eq!(engine.component_count(), 2);
    }

    #[test]
    fn test_delete_entity_component_requires_ownership() {
        let engine = Engine::new();
        let a = engine.add_entity(Probe { name: "a" });
        let b = engine.add_entity(Probe { name: "b" });
        let a_mass = engine.add_component(a, Mass(1.0)).unwrap();

        assert!(!engine.delete_entity_component(b, a_mass));
        assert!(engine.contains_component(a_mass));

        assert!(engine.delete_entity_component(a, a_mass));
        assert!(!engine.contains_component(a_mass));
        assert_eq!(engine.entity_components(a), Some(vec![]));
    }

    #[test]
    fn test_set_retypes_and_ignores_missing() {
        let engine = Engine::new();
        let id = engine.add_unowned_component(Mass(1.0));

        assert!(engine.set(id, Label("now a label")));
        assert_eq!(engine.get::<Mass>(id), None);
        assert_eq!(engine.get::<Label>(id), Some(Label("now a label")));

        assert!(!engine.set(ComponentId::from_raw(99), Mass(0.0)));
        assert_eq!(engine.component_count(), 1);
    }

    #[test]
    fn test_unowned_component_has_no_owner() {
        let engine = Engine::new();
        let id = engine.add_unowned_component(Label("loose"));
        assert_eq!(engine.owner_of(id), None);
        assert!(engine.snapshot_owned::<Probe, Label>().is_empty());
        assert_eq!(engine.snapshot::<Label>().len(), 1);
    }

    #[test]
    fn test_remove_entity_keeps_components() {
        let engine = Engine::new();
        let probe = engine.add_entity(Probe { name: "p" });
        let id = engine.add_component(probe, Mass(4.0)).unwrap();

        assert!(engine.remove_entity(probe));
        assert!(!engine.remove_entity(probe));

        assert_eq!(engine.get::<Mass>(id), Some(Mass(4.0)));
        assert_eq!(engine.owner_of(id), Some(probe));
        assert_eq!(
            engine.snapshot_owned::<Probe, Mass>(),
            vec![(Probe { name: "p" }, Mass(4.0))]
        );
        assert_eq!(engine.entity_components(probe), None);
        assert_eq!(engine.entities().detached_len(), 1);

        // Deleting the last component lets the removed entity go.
        assert!(engine.delete_component(id));
        assert_eq!(engine.entities().detached_len(), 0);
        assert!(engine.snapshot_owned::<Probe, Mass>().is_empty());
    }

    #[test]
    fn test_destroy_after_remove_deletes_leftovers() {
        let engine = Engine::new();
        let probe = engine.add_entity(Probe { name: "p" });
        let kept = engine.add_unowned_component(Mass(9.0));
        engine.add_components(probe, (Mass(1.0), Label("a"))).unwrap();

        assert!(engine.remove_entity(probe));
        assert_eq!(engine.component_count(), 3);

        assert_eq!(engine.destroy_entity(probe), 2);
        assert_eq!(engine.destroy_entity(probe), 0);
        assert_eq!(engine.component_count(), 1);
        assert!(engine.contains_component(kept));
        assert!(engine.links().is_empty());
        assert_eq!(engine.entities().detached_len(), 0);
    }

    #[test]
    fn test_destroy_entity_deletes_owned_components() {
        let engine = Engine::new();
        let probe = engine.add_entity(Probe { name: "p" });
        let other = engine.add_entity(Probe { name: "q" });
        engine.add_components(probe, (Mass(1.0), Label("a"))).unwrap();
        let kept = engine.add_component(other, Mass(2.0)).unwrap();

        assert_eq!(engine.destroy_entity(probe), 2);
        assert_eq!(engine.destroy_entity(probe), 0);

        assert_eq!(engine.component_count(), 1);
        assert!(engine.contains_component(kept));
        assert_eq!(engine.links().len(), 1);
        assert!(!engine.contains_entity(probe));
    }

    #[test]
    fn test_delete_components_equal() {
        let engine = Engine::new();
        let probe = engine.add_entity(Probe { name: "p" });
        let ids = engine
            .add_components(probe, (Label("dup"), Label("keep"), Label("dup")))
            .unwrap();

        assert_eq!(engine.delete_components_equal(&Label("dup")), 2);
        assert_eq!(engine.delete_components_equal(&Label("dup")), 0);
        assert_eq!(engine.entity_components(probe), Some(vec![ids[1]]));
    }

    #[test]
    fn test_remove_entity_by_value_takes_first_match() {
        let engine = Engine::new();
        let first = engine.add_entity(Probe { name: "twin" });
        let second = engine.add_entity(Probe { name: "twin" });

        assert!(engine.remove_entity_by_value(&Probe { name: "twin" }));
        assert!(!engine.contains_entity(first));
        assert!(engine.contains_entity(second));
        assert!(!engine.remove_entity_by_value(&Label("not an entity")));
    }

    #[test]
    fn test_entity_value_copy() {
        let engine = Engine::new();
        let id = engine.add_entity(Probe { name: "copy" });
        assert_eq!(engine.entity::<Probe>(id), Some(Probe { name: "copy" }));
        assert_eq!(engine.entity::<Label>(id), None);
    }

    #[test]
    fn test_debug_reports_counts() {
        let engine = Engine::new();
        engine.add_unowned_component(Mass(1.0));
        let text = format!("{engine:?}");
        assert!(text.contains("components: 1"));
    }
}
