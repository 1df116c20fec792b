//! # Component Storage
//!
//! One homogeneous container per concrete component type.
//!
//! The storage uses a dense array strategy:
//! - Values of one type are packed contiguously for cache-friendly scans
//! - A sparse index maps [`ComponentId`] to the dense slot, O(1) access
//! - Removal is a swap-remove, so slots stay packed
//!
//! [`ComponentStore`] owns one [`ComponentStorage`] per [`TypeId`] plus a
//! location index, so an id can be deleted or retyped without the caller
//! knowing its concrete type.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::component::{Component, ComponentId};

/// Dense storage for a single component type.
///
/// # Type Parameters
///
/// * `C` - The component type to store
///
/// # Example
///
/// ```rust,ignore
/// let mut storage: ComponentStorage<Position> = ComponentStorage::with_capacity(1024);
/// storage.insert(ComponentId::from_raw(0), Position::new(1.0, 2.0, 3.0));
/// ```
#[derive(Clone, Debug)]
pub struct ComponentStorage<C: Component> {
    /// Dense array of component values.
    data: Vec<C>,
    /// `ids[i]` is the id of `data[i]`.
    ids: Vec<ComponentId>,
    /// Maps a component id to its dense slot.
    slots: HashMap<ComponentId, usize>,
}

impl<C: Component> ComponentStorage<C> {
    /// Creates empty storage with room for `capacity` components.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            ids: Vec::with_capacity(capacity),
            slots: HashMap::with_capacity(capacity),
        }
    }

    /// Returns the number of stored components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if no components are stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if `id` is stored here.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ComponentId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Gets a component by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: ComponentId) -> Option<&C> {
        self.slots.get(&id).map(|&slot| &self.data[slot])
    }

    /// Returns all components as a dense slice.
    ///
    /// Slot order is unspecified and changes on removal.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[C] {
        &self.data
    }

    /// Returns the ids of all components, parallel to [`Self::as_slice`].
    #[inline]
    #[must_use]
    pub fn ids(&self) -> &[ComponentId] {
        &self.ids
    }

    /// Iterates over all components with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, &C)> {
        self.ids.iter().copied().zip(self.data.iter())
    }

    /// Stores `value` under `id`, overwriting any previous value.
    pub(crate) fn insert(&mut self, id: ComponentId, value: C) {
        if let Some(&slot) = self.slots.get(&id) {
            self.data[slot] = value;
            return;
        }
        self.slots.insert(id, self.data.len());
        self.ids.push(id);
        self.data.push(value);
    }

    /// Removes the component stored under `id`.
    pub(crate) fn remove(&mut self, id: ComponentId) -> Option<C> {
        let slot = self.slots.remove(&id)?;
        let last = self.data.len() - 1;
        if slot != last {
            // The last element moves into the vacated slot.
            self.slots.insert(self.ids[last], slot);
        }
        self.ids.swap_remove(slot);
        Some(self.data.swap_remove(slot))
    }

    /// Copies every component out of the storage.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<C> {
        Snapshot {
            entries: self.iter().map(|(id, value)| (id, value.clone())).collect(),
        }
    }
}

impl<C: Component> Default for ComponentStorage<C> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

/// Type-erased view of a [`ComponentStorage`].
trait ErasedStorage: Send + Sync {
    /// Removes `id`, returning `true` if it was present.
    fn remove_erased(&mut self, id: ComponentId) -> bool;

    /// Number of stored components.
    fn erased_len(&self) -> usize;

    /// Name of the stored component type.
    fn component_type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> ErasedStorage for ComponentStorage<C> {
    fn remove_erased(&mut self, id: ComponentId) -> bool {
        self.remove(id).is_some()
    }

    fn erased_len(&self) -> usize {
        self.len()
    }

    fn component_type_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// The authoritative mapping from component id to component value.
///
/// Holds the id counter, one [`ComponentStorage`] per component type and a
/// location index recording which storage each live id sits in.
///
/// All mutation goes through the [`Engine`](super::engine::Engine), which
/// serializes it behind its lock. Read access is available through
/// [`Engine::components`](super::engine::Engine::components).
pub struct ComponentStore {
    /// Next id to hand out. Never rolled back.
    next_id: ComponentId,
    /// Per-type storages.
    storages: HashMap<TypeId, Box<dyn ErasedStorage>>,
    /// Which storage each live id lives in.
    locations: HashMap<ComponentId, TypeId>,
    /// Initial capacity for newly created storages.
    storage_capacity: usize,
}

impl ComponentStore {
    /// Creates an empty store whose id counter starts at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::with_storage_capacity(0)
    }

    /// Creates an empty store that pre-sizes each new per-type storage.
    #[must_use]
    pub fn with_storage_capacity(storage_capacity: usize) -> Self {
        Self {
            next_id: ComponentId::default(),
            storages: HashMap::new(),
            locations: HashMap::new(),
            storage_capacity,
        }
    }

    /// Returns the number of live components across all types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Returns `true` if no components are stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Returns the id the next insert will receive.
    #[inline]
    #[must_use]
    pub fn next_id(&self) -> ComponentId {
        self.next_id
    }

    /// Returns `true` if `id` is live.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ComponentId) -> bool {
        self.locations.contains_key(&id)
    }

    /// Returns the [`TypeId`] of the component stored under `id`.
    #[must_use]
    pub fn type_of(&self, id: ComponentId) -> Option<TypeId> {
        self.locations.get(&id).copied()
    }

    /// Returns the type name of the component stored under `id`.
    #[must_use]
    pub fn type_name_of(&self, id: ComponentId) -> Option<&'static str> {
        let type_id = self.locations.get(&id)?;
        self.storages.get(type_id).map(|s| s.component_type_name())
    }

    /// Gets a component by id, if it is live and of type `C`.
    #[must_use]
    pub fn get<C: Component>(&self, id: ComponentId) -> Option<&C> {
        self.storage::<C>()?.get(id)
    }

    /// Returns the storage for type `C`, if any component of that type was
    /// ever stored.
    #[must_use]
    pub fn storage<C: Component>(&self) -> Option<&ComponentStorage<C>> {
        self.storages
            .get(&TypeId::of::<C>())?
            .as_any()
            .downcast_ref::<ComponentStorage<C>>()
    }

    /// Returns the number of live components of type `C`.
    #[must_use]
    pub fn count<C: Component>(&self) -> usize {
        self.storages
            .get(&TypeId::of::<C>())
            .map_or(0, |s| s.erased_len())
    }

    /// Iterates over every live id. Order is unspecified.
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.locations.keys().copied()
    }

    /// Copies every component of type `C` out of the store.
    #[must_use]
    pub fn snapshot<C: Component>(&self) -> Snapshot<C> {
        self.storage::<C>()
            .map(ComponentStorage::snapshot)
            .unwrap_or_default()
    }

    /// Returns the ids of every `C` equal to `value`.
    #[must_use]
    pub fn find_equal<C: Component + PartialEq>(&self, value: &C) -> Vec<ComponentId> {
        self.storage::<C>()
            .map(|storage| {
                storage
                    .iter()
                    .filter(|(_, stored)| *stored == value)
                    .map(|(id, _)| id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Stores `value` under a fresh id and advances the counter.
    pub(crate) fn insert<C: Component>(&mut self, value: C) -> ComponentId {
        let id = self.next_id;
        self.next_id = id.successor();
        self.storage_mut::<C>().insert(id, value);
        self.locations.insert(id, TypeId::of::<C>());
        id
    }

    /// Deletes `id`. Returns `false` if it was not live.
    pub(crate) fn remove(&mut self, id: ComponentId) -> bool {
        let Some(type_id) = self.locations.remove(&id) else {
            return false;
        };
        if let Some(storage) = self.storages.get_mut(&type_id) {
            storage.remove_erased(id);
        }
        true
    }

    /// Overwrites the value stored under `id`.
    ///
    /// If `C` differs from the current type, the id moves to the `C`
    /// storage. Returns `false`, storing nothing, if `id` is not live.
    pub(crate) fn update<C: Component>(&mut self, id: ComponentId, value: C) -> bool {
        let Some(&current) = self.locations.get(&id) else {
            return false;
        };
        let target = TypeId::of::<C>();
        if current != target {
            if let Some(storage) = self.storages.get_mut(&current) {
                storage.remove_erased(id);
            }
            self.locations.insert(id, target);
        }
        self.storage_mut::<C>().insert(id, value);
        true
    }

    fn storage_mut<C: Component>(&mut self) -> &mut ComponentStorage<C> {
        let capacity = self.storage_capacity;
        self.storages
            .entry(TypeId::of::<C>())
            .or_insert_with(|| Box::new(ComponentStorage::<C>::with_capacity(capacity)))
            .as_any_mut()
            .downcast_mut::<ComponentStorage<C>>()
            .expect("storage registered under a foreign TypeId")
    }
}

impl Default for ComponentStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time copy of every component of one type.
///
/// Scans iterate a snapshot rather than the live store, so visitors may
/// mutate the engine without observing their own writes mid-scan.
#[derive(Clone, Debug)]
pub struct Snapshot<C> {
    entries: Vec<(ComponentId, C)>,
}

impl<C> Snapshot<C> {
    /// Number of components captured.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was captured.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the captured `(id, component)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = &(ComponentId, C)> {
        self.entries.iter()
    }
}

impl<C> Default for Snapshot<C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<C> IntoIterator for Snapshot<C> {
    type Item = (ComponentId, C);
    type IntoIter = std::vec::IntoIter<(ComponentId, C)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Tag(&'static str);

    fn pos(x: f32, y: f32) -> Position {
        Position { x, y }
    }

    #[test]
    fn test_storage_insert_get_overwrite() {
        let mut storage: ComponentStorage<Position> = ComponentStorage::with_capacity(4);
        let id = ComponentId::from_raw(9);
        storage.insert(id, pos(1.0, 2.0));
        assert_eq!(storage.get(id), Some(&pos(1.0, 2.0)));

        storage.insert(id, pos(3.0, 4.0));
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.get(id), Some(&pos(3.0, 4.0)));
    }

    #[test]
    fn test_storage_swap_remove_keeps_index_valid() {
        let mut storage: ComponentStorage<Position> = ComponentStorage::default();
        let ids: Vec<_> = (0..4).map(ComponentId::from_raw).collect();
        for (i, &id) in ids.iter().enumerate() {
            storage.insert(id, pos(i as f32, 0.0));
        }

        assert_eq!(storage.remove(ids[0]), Some(pos(0.0, 0.0)));
        assert_eq!(storage.remove(ids[0]), None);
        assert_eq!(storage.len(), 3);

        // The former last element moved into slot 0 and is still reachable.
        assert_eq!(storage.get(ids[3]), Some(&pos(3.0, 0.0)));
        assert_eq!(storage.get(ids[1]), Some(&pos(1.0, 0.0)));
        assert_eq!(storage.ids().len(), storage.as_slice().len());
        for (id, value) in storage.iter() {
            assert_eq!(storage.get(id), Some(value));
        }
    }

    #[test]
    fn test_store_ids_strictly_increase() {
        let mut store = ComponentStore::new();
        let mut last = None;
        for i in 0..100 {
            let id = if i % 2 == 0 {
                store.insert(pos(0.0, 0.0))
            } else {
                store.insert(Tag("t"))
            };
            if let Some(prev) = last {
                assert!(id > prev);
            }
            last = Some(id);
        }
        assert_eq!(store.len(), 100);
        assert_eq!(store.count::<Position>(), 50);
        assert_eq!(store.count::<Tag>(), 50);
    }

    #[test]
    fn test_store_delete_never_reuses_ids() {
        let mut store = ComponentStore::new();
        let a = store.insert(Tag("a"));
        assert!(store.remove(a));
        assert!(!store.remove(a));

        let b = store.insert(Tag("b"));
        assert_ne!(a, b);
        assert_eq!(store.next_id(), b.successor());
        assert!(!store.contains(a));
        assert!(store.contains(b));
    }

    #[test]
    fn test_store_update_same_and_different_type() {
        let mut store = ComponentStore::new();
        let id = store.insert(pos(1.0, 1.0));

        assert!(store.update(id, pos(2.0, 2.0)));
        assert_eq!(store.get::<Position>(id), Some(&pos(2.0, 2.0)));

        assert!(store.update(id, Tag("retyped")));
        assert_eq!(store.get::<Position>(id), None);
        assert_eq!(store.get::<Tag>(id), Some(&Tag("retyped")));
        assert_eq!(store.type_of(id), Some(TypeId::of::<Tag>()));
        assert_eq!(store.count::<Position>(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_update_missing_is_noop() {
        let mut store = ComponentStore::new();
        assert!(!store.update(ComponentId::from_raw(42), Tag("ghost")));
        assert!(store.is_empty());
        assert_eq!(store.count::<Tag>(), 0);
    }

    #[test]
    fn test_store_type_name() {
        let mut store = ComponentStore::new();
        let id = store.insert(Tag("x"));
        let name = store.type_name_of(id).unwrap();
        assert!(name.ends_with("Tag"));
    }

    #[test]
    fn test_snapshot_is_detached_from_store() {
        let mut store = ComponentStore::new();
        let id = store.insert(pos(1.0, 0.0));
        let snapshot = store.snapshot::<Position>();

        store.update(id, pos(9.0, 0.0));
        store.insert(pos(5.0, 0.0));

        assert_eq!(snapshot.len(), 1);
        let (captured_id, captured) = snapshot.iter().next().unwrap();
        assert_eq!(*captured_id, id);
        assert_eq!(captured.x, 1.0);
        assert!(store.snapshot::<Tag>().is_empty());
    }

    #[test]
    fn test_find_equal() {
        let mut store = ComponentStore::new();
        let a = store.insert(Tag("dup"));
        store.insert(Tag("other"));
        let c = store.insert(Tag("dup"));

        let mut found = store.find_equal(&Tag("dup"));
        found.sort();
        assert_eq!(found, vec![a, c]);
        assert!(store.find_equal(&pos(0.0, 0.0)).is_empty());
    }
}
