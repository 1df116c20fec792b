//! # Component System
//!
//! Components are plain data values with no behavior. Any `Clone + Send +
//! Sync + 'static` type qualifies; there is no registration step.
//!
//! Every stored component is identified by a [`ComponentId`] handed out by
//! the engine in strictly increasing order. Ids are never recycled, so a
//! deleted id stays dead for the lifetime of the engine.

use std::fmt;

use super::storage::ComponentStore;

/// Marker trait for ECS components.
///
/// Implemented automatically for every type that is:
/// - `Clone`: queries hand out copies, never live references
/// - `Send + Sync`: the engine may be shared between threads
/// - `'static`: storage is keyed by [`std::any::TypeId`]
///
/// # Example
///
/// ```rust
/// #[derive(Clone, Debug, PartialEq)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// fn assert_component<C: tinyecs_core::Component>() {}
/// assert_component::<Health>();
/// ```
pub trait Component: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Component for T {}

/// Unique identifier for a stored component.
///
/// Assigned from a monotonic counter starting at 0. Treat it as an opaque
/// handle; the numeric value only guarantees ordering by creation time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ComponentId(u64);

impl ComponentId {
    /// Creates a component ID from a raw `u64`.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw `u64` value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns the ID that follows this one.
    ///
    /// # Panics
    ///
    /// Panics if the 64-bit id space is exhausted. Wrapping would hand out
    /// an id that may still be live.
    #[inline]
    #[must_use]
    pub(crate) fn successor(self) -> Self {
        assert!(self.0 < u64::MAX, "component id space exhausted");
        Self(self.0 + 1)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.0)
    }
}

/// An ordered group of components added to an entity in one call.
///
/// Implemented for tuples of one to eight components. Ids are assigned in
/// tuple order, left to right.
///
/// ```rust
/// use tinyecs_core::Engine;
///
/// #[derive(Clone, PartialEq)]
/// struct Ship;
/// #[derive(Clone)]
/// struct Fuel(f32);
/// #[derive(Clone)]
/// struct Hull(u32);
///
/// let engine = Engine::new();
/// let ship = engine.add_entity(Ship);
/// let ids = engine.add_components(ship, (Fuel(1.0), Hull(100))).unwrap();
/// assert!(ids[0] < ids[1]);
/// ```
pub trait ComponentBundle {
    /// Number of components in the bundle.
    const LEN: usize;

    /// Stores every component and pushes the assigned ids onto `ids`.
    ///
    /// Called by the engine while it holds its write lock.
    fn store_all(self, store: &mut ComponentStore, ids: &mut Vec<ComponentId>);
}

macro_rules! impl_component_bundle {
    ($len:expr; $($ty:ident $var:ident),+) => {
        impl<$($ty: Component),+> ComponentBundle for ($($ty,)+) {
            const LEN: usize = $len;

            fn store_all(self, store: &mut ComponentStore, ids: &mut Vec<ComponentId>) {
                let ($($var,)+) = self;
                $(ids.push(store.insert($var));)+
            }
        }
    };
}

impl_component_bundle!(1; A a);
impl_component_bundle!(2; A a, B b);
impl_component_bundle!(3; A a, B b, C c);
impl_component_bundle!(4; A a, B b, C c, D d);
impl_component_bundle!(5; A a, B b, C c, D d, E e);
impl_component_bundle!(6; A a, B b, C c, D d, E e, F f);
impl_component_bundle!(7; A a, B b, C c, D d, E e, F f, G g);
impl_component_bundle!(8; A a, B b, C c, D d, E e, F f, G g, H h);
