//! Iterating entities by component set.
//!
//! A read-only view over `&A`, `(&A, &B)` or `(&A, &B, &C)` walks the dense
//! entity list of the *smallest* participating storage and keeps the entities
//! that own every other component. With no structural changes in between, two
//! walks over the same view visit entities in the same order.
//!
//! Mutable iteration is exposed directly on
//! [`EntityRegistry`](crate::registry::EntityRegistry) as `view_mut` and
//! `view_mut_with`, which take `&mut self` and so cannot overlap a read view.

use std::marker::PhantomData;

use crate::component::Component;
use crate::entity::Entity;
use crate::registry::EntityRegistry;

// ---------------------------------------------------------------------------
// View trait
// ---------------------------------------------------------------------------

/// A set of component types fetched together.
pub trait View {
    /// What one matching entity yields.
    type Item<'w>;

    /// Dense entity list to drive iteration from, or `None` if a component
    /// type is not registered (in which case nothing can match).
    fn driver(registry: &EntityRegistry) -> Option<&[Entity]>;

    /// Fetch the components for `entity`, or `None` if one is missing.
    fn fetch(registry: &EntityRegistry, entity: Entity) -> Option<Self::Item<'_>>;
}

fn smallest<'w>(lists: &[Option<&'w [Entity]>]) -> Option<&'w [Entity]> {
    let mut best: Option<&'w [Entity]> = None;
    for list in lists {
        let list = (*list)?;
        if best.map_or(true, |b| list.len() < b.len()) {
            best = Some(list);
        }
    }
    best
}

impl<A: Component> View for &A {
    type Item<'w> = &'w A;

    fn driver(registry: &EntityRegistry) -> Option<&[Entity]> {
        registry.storage::<A>().map(|s| s.entities())
    }

    fn fetch(registry: &EntityRegistry, entity: Entity) -> Option<Self::Item<'_>> {
        registry.get::<A>(entity)
    }
}

impl<A: Component, B: Component> View for (&A, &B) {
    type Item<'w> = (&'w A, &'w B);

    fn driver(registry: &EntityRegistry) -> Option<&[Entity]> {
        smallest(&[
            registry.storage::<A>().map(|s| s.entities()),
            registry.storage::<B>().map(|s| s.entities()),
        ])
    }

    fn fetch(registry: &EntityRegistry, entity: Entity) -> Option<Self::Item<'_>> {
        Some((registry.get::<A>(entity)?, registry.get::<B>(entity)?))
    }
}

impl<A: Component, B: Component, C: Component> View for (&A, &B, &C) {
    type Item<'w> = (&'w A, &'w B, &'w C);

    fn driver(registry: &EntityRegistry) -> Option<&[Entity]> {
        smallest(&[
            registry.storage::<A>().map(|s| s.entities()),
            registry.storage::<B>().map(|s| s.entities()),
            registry.storage::<C>().map(|s| s.entities()),
        ])
    }

    fn fetch(registry: &EntityRegistry, entity: Entity) -> Option<Self::Item<'_>> {
        Some((
            registry.get::<A>(entity)?,
            registry.get::<B>(entity)?,
            registry.get::<C>(entity)?,
        ))
    }
}

// ---------------------------------------------------------------------------
// ViewIter
// ---------------------------------------------------------------------------

/// Iterator returned by [`EntityRegistry::view`].
pub struct ViewIter<'w, V: View> {
    registry: &'w EntityRegistry,
    entities: std::slice::Iter<'w, Entity>,
    _marker: PhantomData<V>,
}

impl<'w, V: View> ViewIter<'w, V> {
    pub(crate) fn new(registry: &'w EntityRegistry) -> Self {
        Self {
            registry,
            entities: V::driver(registry).unwrap_or(&[]).iter(),
            _marker: PhantomData,
        }
    }
}

impl<'w, V: View> Iterator for ViewIter<'w, V> {
    type Item = (Entity, V::Item<'w>);

    fn next(&mut self) -> Option<Self::Item> {
        for &entity in self.entities.by_ref() {
            if let Some(item) = V::fetch(self.registry, entity) {
                return Some((entity, item));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.entities.len()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::components::{NameComponent, TagComponent};
    use crate::registry::EntityRegistry;

    #[test]
    fn single_view_yields_every_owner() {
        let mut reg = EntityRegistry::new();
        let a = reg.create_named("a");
        let b = reg.create_named("b");
        let _plain = reg.create();

        let seen: Vec<_> = reg.view::<&NameComponent>().map(|(e, _)| e).collect();
        assert_eq!(seen, vec![a, b]);
    }

    #[test]
    fn pair_view_intersects() {
        let mut reg = EntityRegistry::new();
        let a = reg.create_named("a");
        let b = reg.create_named("b");
        let c = reg.create();
        reg.add(b, TagComponent::new("enemy")).unwrap();
        reg.add(c, TagComponent::new("enemy")).unwrap();

        let seen: Vec<_> = reg
            .view::<(&NameComponent, &TagComponent)>()
            .map(|(e, (name, tag))| (e, name.name.clone(), tag.tag.clone()))
            .collect();
        assert_eq!(seen, vec![(b, "b".to_owned(), "enemy".to_owned())]);
        assert!(reg.has::<NameComponent>(a));
    }

    #[test]
    fn repeated_walks_are_stable() {
        let mut reg = EntityRegistry::new();
        for i in 0..16 {
            let e = reg.create_named(format!("e{i}"));
            if i % 3 == 0 {
                reg.add(e, TagComponent::new("third")).unwrap();
            }
        }
        let first: Vec<_> = reg.view::<(&NameComponent, &TagComponent)>().map(|(e, _)| e).collect();
        let second: Vec<_> = reg.view::<(&NameComponent, &TagComponent)>().map(|(e, _)| e).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 6);
    }
}
