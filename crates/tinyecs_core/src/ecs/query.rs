//! # Queries
//!
//! Type-filtered iteration over the engine. The concrete component type is
//! a generic parameter, so only that type's storage is touched; no other
//! component is inspected.
//!
//! Visitors receive copies. To persist a change, call [`set`] with the id
//! handed to the visitor. Each scan works on a snapshot taken when it
//! starts: writes made by the visitor are applied to the engine right away
//! but are not seen by the scan in progress.

use super::component::{Component, ComponentId};
use super::engine::Engine;
use super::entity::EntityData;

/// Calls `visitor` with every component of type `C` and its id.
///
/// Returns the number of components visited. Visit order is unspecified.
///
/// ```rust
/// use tinyecs_core::{each, set, Engine};
///
/// #[derive(Clone, PartialEq)]
/// struct Clock;
///
/// #[derive(Clone)]
/// struct Timer {
///     elapsed: f64,
/// }
///
/// let engine = Engine::new();
/// let clock = engine.add_entity(Clock);
/// engine.add_component(clock, Timer { elapsed: 0.0 }).unwrap();
///
/// each(&engine, |id, mut timer: Timer| {
///     timer.elapsed += 0.35;
///     set(&engine, id, timer);
/// });
/// ```
pub fn each<C, F>(engine: &Engine, mut visitor: F) -> u64
where
    C: Component,
    F: FnMut(ComponentId, C),
{
    let mut visited = 0;
    for (id, component) in engine.snapshot::<C>() {
        visited += 1;
        visitor(id, component);
    }
    visited
}

/// Calls `visitor` with every component of type `C` whose owner is an
/// entity of type `E`, paired with a copy of that entity.
///
/// Removing an entity does not hide its components: they are still paired
/// with the removed value until they are deleted. Components added without
/// an entity are skipped. Returns the number of pairs visited.
pub fn each_entity<E, C, F>(engine: &Engine, mut visitor: F) -> u64
where
    E: EntityData,
    C: Component,
    F: FnMut(E, C),
{
    let mut visited = 0;
    for (entity, component) in engine.snapshot_owned::<E, C>() {
        visited += 1;
        visitor(entity, component);
    }
    visited
}

/// Overwrites component `id`. Returns `false` if `id` is not live.
///
/// Same as [`Engine::set`].
pub fn set<C: Component>(engine: &Engine, id: ComponentId, component: C) -> bool {
    engine.set(id, component)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Walker;

    #[derive(Clone, Debug, PartialEq)]
    struct Flyer;

    #[derive(Clone, Debug, PartialEq)]
    struct Speed(u32);

    #[test]
    fn test_each_on_empty_engine() {
        let engine = Engine::new();
        assert_eq!(each(&engine, |_, _: Speed| panic!("nothing to visit")), 0);
    }

    #[test]
    fn test_set_inside_visitor_does_not_deadlock() {
        let engine = Engine::new();
        let walker = engine.add_entity(Walker);
        engine.add_components(walker, (Speed(1), Speed(2))).unwrap();

        let visited = each(&engine, |id, speed: Speed| {
            assert!(set(&engine, id, Speed(speed.0 * 10)));
        });
        assert_eq!(visited, 2);

        let mut speeds: Vec<u32> = engine.snapshot::<Speed>().into_iter().map(|(_, s)| s.0).collect();
        speeds.sort_unstable();
        assert_eq!(speeds, vec![10, 20]);
    }

    #[test]
    fn test_scan_does_not_see_its_own_inserts() {
        let engine = Engine::new();
        let walker = engine.add_entity(Walker);
        engine.add_component(walker, Speed(1)).unwrap();

        let visited = each(&engine, |_, speed: Speed| {
            engine.add_component(walker, Speed(speed.0 + 1)).unwrap();
        });
        assert_eq!(visited, 1);
        assert_eq!(engine.snapshot::<Speed>().len(), 2);
    }

    #[test]
    fn test_each_entity_filters_by_entity_type() {
        let engine = Engine::new();
        let walker = engine.add_entity(Walker);
        let flyer = engine.add_entity(Flyer);
        engine.add_component(walker, Speed(3)).unwrap();
        engine.add_components(flyer, (Speed(30), Speed(31))).unwrap();

        let mut seen = Vec::new();
        let count = each_entity(&engine, |_: Walker, speed: Speed| seen.push(speed.0));
        assert_eq!(count, 1);
        assert_eq!(seen, vec![3]);

        assert_eq!(each_entity(&engine, |_: Flyer, _: Speed| {}), 2);
    }
}
