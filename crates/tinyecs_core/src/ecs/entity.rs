//! # Entity Management
//!
//! An entity is whatever value the caller registers: a unit struct, a struct
//! with a name, anything `Clone + Send + Sync + 'static`. Registration
//! assigns an [`EntityId`] consisting of:
//! - An index into the registry's slot array
//! - A generation counter for safe slot reuse
//!
//! Each registered entity also owns the ordered list of component ids that
//! were added for it.
//!
//! Unregistering an entity that still owns components detaches it: the
//! value is kept under its old handle until the last of those components is
//! deleted, so entity-scoped queries keep pairing them with their owner.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::component::ComponentId;

/// Unique identifier for a registered entity.
///
/// The ID is split into two parts:
/// - Lower 32 bits: Index into the registry's slots
/// - Upper 32 bits: Generation counter for detecting stale references
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new entity ID from index and generation.
    ///
    /// # Arguments
    ///
    /// * `index` - The slot index (0 to 2^32-1)
    /// * `generation` - The generation counter (0 to 2^32-1)
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Returns the packed `u64` representation.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index(), self.generation())
    }
}

/// Marker trait for values that can be registered as entities.
///
/// Implemented automatically. `Clone` is required because entity-scoped
/// queries hand the visitor a copy of the entity value.
pub trait EntityData: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> EntityData for T {}

/// Type-erased entity value.
trait ErasedEntity: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn entity_type_name(&self) -> &'static str;
}

impl<E: EntityData> ErasedEntity for E {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn entity_type_name(&self) -> &'static str {
        std::any::type_name::<E>()
    }
}

/// A registered entity.
struct Occupant {
    /// Registration sequence number, used for ordering.
    sequence: u64,
    value: Box<dyn ErasedEntity>,
    /// Owned component ids in insertion order.
    components: Vec<ComponentId>,
}

/// An unregistered entity whose components are still live.
struct Detached {
    value: Box<dyn ErasedEntity>,
    components: Vec<ComponentId>,
}

/// One registry slot. Dead slots keep their generation.
struct Slot {
    generation: u32,
    occupant: Option<Occupant>,
}

/// An entity removed from the registry.
pub(crate) struct Removed {
    /// The component ids the entity owned.
    pub components: Vec<ComponentId>,
}

/// Registry of entities in registration order.
///
/// Slots are recycled through a free list; the generation is bumped every
/// time a slot is vacated, so an old [`EntityId`] never resolves to the
/// entity that later reuses its slot. A slot whose generation reaches
/// `u32::MAX` is retired instead of recycled.
pub struct EntityRegistry {
    slots: Vec<Slot>,
    /// Vacated slot indices available for reuse.
    free_indices: Vec<u32>,
    /// Registration sequence -> slot index.
    order: BTreeMap<u64, u32>,
    next_sequence: u64,
    /// Unregistered entities that still own live components.
    detached: HashMap<EntityId, Detached>,
}

impl EntityRegistry {
    /// Creates an empty registry with room for `capacity` entities.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_indices: Vec::new(),
            order: BTreeMap::new(),
            next_sequence: 0,
            detached: HashMap::new(),
        }
    }

    /// Returns the number of registered entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no entity is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Checks if `id` refers to a registered entity.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.occupant(id).is_some()
    }

    /// Gets the value of entity `id` if it is registered and of type `E`.
    #[must_use]
    pub fn get<E: EntityData>(&self, id: EntityId) -> Option<&E> {
        self.occupant(id)?.value.as_any().downcast_ref::<E>()
    }

    /// Gets the value of the entity behind `id`, registered or detached,
    /// if it is an `E`.
    ///
    /// Unlike [`Self::get`] this still resolves a handle whose entity was
    /// unregistered while it owned live components.
    #[must_use]
    pub fn owner<E: EntityData>(&self, id: EntityId) -> Option<&E> {
        match self.occupant(id) {
            Some(occupant) => occupant.value.as_any().downcast_ref::<E>(),
            None => self.detached.get(&id)?.value.as_any().downcast_ref::<E>(),
        }
    }

    /// Returns the number of unregistered entities still owning components.
    #[inline]
    #[must_use]
    pub fn detached_len(&self) -> usize {
        self.detached.len()
    }

    /// Returns the component ids owned by `id`, in insertion order.
    #[must_use]
    pub fn components_of(&self, id: EntityId) -> Option<&[ComponentId]> {
        self.occupant(id).map(|o| o.components.as_slice())
    }

    /// Iterates over registered entities in registration order.
    pub fn iter(&self) -> impl Iterator<Item = EntityRef<'_>> + '_ {
        self.order.values().filter_map(move |&index| {
            let slot = &self.slots[index as usize];
            slot.occupant.as_ref().map(|occupant| EntityRef {
                id: EntityId::new(index, slot.generation),
                occupant,
            })
        })
    }

    /// Finds the first entity, in registration order, whose value equals
    /// `value`.
    #[must_use]
    pub fn find<E: EntityData + PartialEq>(&self, value: &E) -> Option<EntityId> {
        self.iter()
            .find(|entity| entity.get::<E>() == Some(value))
            .map(|entity| entity.id())
    }

    /// Registers `value` and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics if the 32-bit slot index space is exhausted.
    pub(crate) fn insert<E: EntityData>(&mut self, value: E) -> EntityId {
        let index = match self.free_indices.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len()).expect("entity slot space exhausted");
                self.slots.push(Slot {
                    generation: 0,
                    occupant: None,
                });
                index
            }
        };

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let slot = &mut self.slots[index as usize];
        slot.occupant = Some(Occupant {
            sequence,
            value: Box::new(value),
            components: Vec::new(),
        });
        self.order.insert(sequence, index);

        EntityId::new(index, slot.generation)
    }

    /// Unregisters `id`, keeping its value reachable through
    /// [`Self::owner`] while it still owns components.
    ///
    /// Returns `false` if `id` was not registered.
    pub(crate) fn detach(&mut self, id: EntityId) -> bool {
        let Some(occupant) = self.vacate(id) else {
            return false;
        };
        if !occupant.components.is_empty() {
            self.detached.insert(
                id,
                Detached {
                    value: occupant.value,
                    components: occupant.components,
                },
            );
        }
        true
    }

    /// Drops `id` entirely, registered or detached, and hands back the
    /// component ids it owned.
    ///
    /// Returns `None` if `id` is neither registered nor detached.
    pub(crate) fn remove(&mut self, id: EntityId) -> Option<Removed> {
        if let Some(occupant) = self.vacate(id) {
            return Some(Removed {
                components: occupant.components,
            });
        }
        self.detached.remove(&id).map(|detached| Removed {
            components: detached.components,
        })
    }

    /// Forgets that `owner` owns `component`.
    ///
    /// A detached owner is dropped once it owns nothing.
    pub(crate) fn release(&mut self, owner: EntityId, component: ComponentId) {
        if let Some(owned) = self.components_mut(owner) {
            remove_first(owned, component);
            return;
        }
        if let Some(detached) = self.detached.get_mut(&owner) {
            remove_first(&mut detached.components, component);
            if detached.components.is_empty() {
                self.detached.remove(&owner);
            }
        }
    }

    /// Mutable access to the owned component list of `id`.
    pub(crate) fn components_mut(&mut self, id: EntityId) -> Option<&mut Vec<ComponentId>> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.occupant.as_mut().map(|o| &mut o.components)
    }

    /// Takes the occupant out of its slot and retires or recycles the slot.
    fn vacate(&mut self, id: EntityId) -> Option<Occupant> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        let occupant = slot.occupant.take()?;
        self.order.remove(&occupant.sequence);

        // Invalidate outstanding handles before the slot is reused. A slot
        // out of generations stays dead for good.
        if let Some(next) = slot.generation.checked_add(1) {
            slot.generation = next;
            self.free_indices.push(id.index());
        }
        Some(occupant)
    }

    fn occupant(&self, id: EntityId) -> Option<&Occupant> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.occupant.as_ref()
    }
}

fn remove_first(owned: &mut Vec<ComponentId>, component: ComponentId) {
    if let Some(position) = owned.iter().position(|&c| c == component) {
        owned.remove(position);
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

/// Borrowed view of one registered entity.
#[derive(Clone, Copy)]
pub struct EntityRef<'a> {
    id: EntityId,
    occupant: &'a Occupant,
}

impl<'a> EntityRef<'a> {
    /// The entity's handle.
    #[inline]
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The entity's value, if it is an `E`.
    #[must_use]
    pub fn get<E: EntityData>(&self) -> Option<&'a E> {
        self.occupant.value.as_any().downcast_ref::<E>()
    }

    /// Returns `true` if the entity's value is an `E`.
    #[must_use]
    pub fn is<E: EntityData>(&self) -> bool {
        self.occupant.value.as_any().is::<E>()
    }

    /// Name of the entity value's type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.occupant.value.entity_type_name()
    }

    /// Owned component ids in insertion order.
    #[must_use]
    pub fn components(&self) -> &'a [ComponentId] {
        &self.occupant.components
    }
}

impl fmt::Debug for EntityRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRef")
            .field("id", &self.id)
            .field("type", &self.type_name())
            .field("components", &self.components())
            .finish()
    }
}
