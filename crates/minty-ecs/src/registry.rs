//! The [`EntityRegistry`]: entity lifetimes, component storage and the
//! persisted entity layout.
//!
//! # Node layout
//!
//! ```text
//! Entity
//! 	Name
//! 		name: Player
//! 	Tag
//! 		tag: Hero
//! Entity
//! 	...
//! ```
//!
//! Entities are written in slot-index order. Each entity node holds one child
//! per persistent component, named by its registered name and written in
//! registration order.

use std::any::Any;
use std::fmt;

use minty_serialize::node::Node;
use minty_serialize::reader::Reader;
use minty_serialize::serializable::Serializable;
use minty_serialize::writer::Writer;
use minty_serialize::DeserializeError;

use crate::component::{Component, ComponentId, ComponentRegistry};
use crate::components::{DestroyEntityComponent, DirtyComponent, NameComponent, TagComponent};
use crate::entity::{Entity, EntityAllocator};
use crate::storage::{ErasedStorage, SparseSet};
use crate::view::{View, ViewIter};
use crate::EcsError;

/// Name of each entity node under a registry node.
pub const ENTITY_NODE: &str = "Entity";

// ---------------------------------------------------------------------------
// EntityScope
// ---------------------------------------------------------------------------

/// A serialization payload that can be narrowed to one entity.
///
/// While an entity's components are written or read, the registry hands
/// them `scope.for_entity(entity)` as the side-channel payload, so a
/// component can learn which entity it belongs to.
pub trait EntityScope: Any {
    fn for_entity(&self, entity: Entity) -> Self
    where
        Self: Sized;
}

impl EntityScope for () {
    fn for_entity(&self, _entity: Entity) -> Self {}
}

// ---------------------------------------------------------------------------
// LoadReport
// ---------------------------------------------------------------------------

/// A component that failed to decode while its entity still loaded.
#[derive(Debug, Clone)]
pub struct LoadIssue {
    /// Position of the entity node among its siblings.
    pub entity_index: usize,
    pub entity: Entity,
    pub entity_name: Option<String>,
    pub component: String,
    pub error: DeserializeError,
}

impl fmt::Display for LoadIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entity_name {
            Some(name) => write!(
                f,
                "entity #{} '{}' component '{}': {}",
                self.entity_index, name, self.component, self.error
            ),
            None => write!(
                f,
                "entity #{} component '{}': {}",
                self.entity_index, self.component, self.error
            ),
        }
    }
}

/// Outcome of loading entities from a node.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Entities created, in node order.
    pub entities: Vec<Entity>,
    pub issues: Vec<LoadIssue>,
}

impl LoadReport {
    /// Whether every component decoded without error.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

// ---------------------------------------------------------------------------
// EntityRegistry
// ---------------------------------------------------------------------------

/// Owns every entity of a scene and all of their components.
///
/// Operations on a destroyed or never-issued entity are handled uniformly:
/// mutations (`add`, `remove`, `destroy`, ...) return
/// [`EcsError::InvalidEntity`], lookups (`get`, `has`) return `None`/`false`.
pub struct EntityRegistry {
    allocator: EntityAllocator,
    components: ComponentRegistry,
    /// Indexed by `ComponentId`.
    storages: Vec<Box<dyn ErasedStorage>>,
    last_report: Option<LoadReport>,
}

impl EntityRegistry {
    /// Create a registry with the built-in components registered.
    pub fn new() -> Self {
        let mut registry = Self {
            allocator: EntityAllocator::new(),
            components: ComponentRegistry::new(),
            storages: Vec::new(),
            last_report: None,
        };
        registry.register_component::<NameComponent>("Name");
        registry.register_component::<TagComponent>("Tag");
        registry.register_transient::<DirtyComponent>("Dirty");
        registry.register_transient::<DestroyEntityComponent>("DestroyEntity");
        registry
    }

    /// An empty registry with the same component registrations.
    pub fn empty_like(&self) -> Self {
        Self {
            allocator: EntityAllocator::new(),
            components: self.components.clone(),
            storages: self.storages.iter().map(|s| s.empty_clone()).collect(),
            last_report: None,
        }
    }

    // -- registration -------------------------------------------------------

    /// Register a persistent component type under `name`. Registering the
    /// same type again returns its existing id.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already taken by a different type. Use
    /// [`try_register_component`](Self::try_register_component) to handle
    /// that case.
    pub fn register_component<T: Component>(&mut self, name: &str) -> ComponentId {
        match self.register_with::<T>(name, true) {
            Ok(id) => id,
            Err(err) => panic!("{err}"),
        }
    }

    /// Like [`register_component`](Self::register_component), returning
    /// [`EcsError::DuplicateComponentName`] on a name collision.
    pub fn try_register_component<T: Component>(&mut self, name: &str) -> Result<ComponentId, EcsError> {
        self.register_with::<T>(name, true)
    }

    /// Register a component that lives only at runtime and is never written.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already taken by a different type.
    pub fn register_transient<T: Component>(&mut self, name: &str) -> ComponentId {
        match self.register_with::<T>(name, false) {
            Ok(id) => id,
            Err(err) => panic!("{err}"),
        }
    }

    fn register_with<T: Component>(&mut self, name: &str, persistent: bool) -> Result<ComponentId, EcsError> {
        let (id, storage) = self.components.register::<T>(name, persistent)?;
        if let Some(storage) = storage {
            debug_assert_eq!(id.index(), self.storages.len());
            self.storages.push(storage);
        }
        Ok(id)
    }

    #[inline]
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub(crate) fn storage<T: Component>(&self) -> Option<&SparseSet<T>> {
        let id = self.components.lookup::<T>()?;
        self.storages[id.index()].as_any().downcast_ref()
    }

    fn storage_mut<T: Component>(&mut self) -> Option<&mut SparseSet<T>> {
        let id = self.components.lookup::<T>()?;
        self.storages[id.index()].as_any_mut().downcast_mut()
    }

    fn require_storage_mut<T: Component>(&mut self) -> Result<&mut SparseSet<T>, EcsError> {
        let name = std::any::type_name::<T>();
        let Some(id) = self.components.lookup::<T>() else {
            return Err(EcsError::UnknownComponent {
                name: name.to_owned(),
                entity_index: None,
                registered: self.components.registered_names().join(", "),
            });
        };
        self.storages[id.index()]
            .as_any_mut()
            .downcast_mut()
            .ok_or_else(|| EcsError::UnknownComponent {
                name: name.to_owned(),
                entity_index: None,
                registered: String::new(),
            })
    }

    fn check_alive(&self, entity: Entity) -> Result<(), EcsError> {
        if self.allocator.is_alive(entity) {
            Ok(())
        } else {
            Err(EcsError::InvalidEntity { entity })
        }
    }

    // -- entity lifetime ----------------------------------------------------

    /// Create an entity with no components.
    pub fn create(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        tracing::trace!(entity = %entity, "created entity");
        entity
    }

    /// Create an entity carrying a [`NameComponent`].
    pub fn create_named(&mut self, name: impl Into<String>) -> Entity {
        let entity = self.create();
        if let Some(names) = self.storage_mut::<NameComponent>() {
            names.insert(entity, NameComponent::new(name));
        }
        entity
    }

    /// Erase every component of `entity` and recycle its slot.
    pub fn destroy(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.check_alive(entity)?;
        for storage in &mut self.storages {
            storage.erase(entity);
        }
        self.allocator.deallocate(entity);
        tracing::trace!(entity = %entity, "destroyed entity");
        Ok(())
    }

    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Number of live entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.allocator.alive_count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live entities in slot-index order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.allocator.iter_alive()
    }

    /// Destroy every entity. Registrations are kept.
    pub fn clear(&mut self) {
        for storage in &mut self.storages {
            storage.clear();
        }
        self.allocator.clear();
    }

    // -- components ---------------------------------------------------------

    /// Attach `value` to `entity`, replacing any existing `T`.
    pub fn add<T: Component>(&mut self, entity: Entity, value: T) -> Result<&mut T, EcsError> {
        self.check_alive(entity)?;
        Ok(self.require_storage_mut::<T>()?.insert(entity, value))
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.storage::<T>()?.get(entity)
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.storage_mut::<T>()?.get_mut(entity)
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.storage::<T>().is_some_and(|s| s.contains(entity))
    }

    /// Detach and return `T` from `entity`. `Ok(None)` if it had none.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Result<Option<T>, EcsError> {
        self.check_alive(entity)?;
        Ok(self.storage_mut::<T>().and_then(|s| s.remove(entity)))
    }

    /// Remove `T` from every entity.
    pub fn clear_component<T: Component>(&mut self) {
        if let Some(storage) = self.storage_mut::<T>() {
            storage.clear();
        }
    }

    /// Number of entities carrying `T`.
    pub fn count<T: Component>(&self) -> usize {
        self.storage::<T>().map_or(0, SparseSet::len)
    }

    // -- views --------------------------------------------------------------

    /// Iterate every entity owning all of the components in `V`.
    ///
    /// ```
    /// # use minty_ecs::prelude::*;
    /// let mut registry = EntityRegistry::new();
    /// let hero = registry.create_named("Hero");
    /// registry.add(hero, TagComponent::new("Player")).unwrap();
    ///
    /// for (entity, (name, tag)) in registry.view::<(&NameComponent, &TagComponent)>() {
    ///     assert_eq!(entity, hero);
    ///     assert_eq!((name.name.as_str(), tag.tag.as_str()), ("Hero", "Player"));
    /// }
    /// ```
    pub fn view<V: View>(&self) -> ViewIter<'_, V> {
        ViewIter::new(self)
    }

    /// Iterate every `A`, mutably.
    pub fn view_mut<A: Component>(&mut self) -> impl Iterator<Item = (Entity, &mut A)> + '_ {
        self.storage_mut::<A>()
            .into_iter()
            .flat_map(|storage| storage.iter_mut())
    }

    /// Iterate every entity owning both `A` and `B`, with `A` mutable.
    ///
    /// # Panics
    ///
    /// Panics if `A` and `B` are the same type.
    pub fn view_mut_with<A: Component, B: Component>(
        &mut self,
    ) -> impl Iterator<Item = (Entity, &mut A, &B)> + '_ {
        self.pair_mut::<A, B>().into_iter().flat_map(|(a, b)| {
            a.iter_mut()
                .filter_map(move |(entity, va)| b.get(entity).map(|vb| (entity, va, vb)))
        })
    }

    fn pair_mut<A: Component, B: Component>(&mut self) -> Option<(&mut SparseSet<A>, &SparseSet<B>)> {
        let a = self.components.lookup::<A>()?.index();
        let b = self.components.lookup::<B>()?.index();
        assert_ne!(a, b, "view_mut_with needs two distinct component types");
        let (sa, sb) = if a < b {
            let (lo, hi) = self.storages.split_at_mut(b);
            (&mut lo[a], &hi[0])
        } else {
            let (lo, hi) = self.storages.split_at_mut(a);
            (&mut hi[0], &lo[b])
        };
        Some((sa.as_any_mut().downcast_mut()?, sb.as_any().downcast_ref()?))
    }

    // -- frame markers ------------------------------------------------------

    /// Mark `entity` for destruction at the end of the frame.
    pub fn queue_destroy(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.add(entity, DestroyEntityComponent).map(|_| ())
    }

    /// Destroy every entity marked with [`DestroyEntityComponent`]. Returns
    /// how many were destroyed.
    pub fn destroy_queued(&mut self) -> usize {
        let queued: Vec<Entity> = self
            .storage::<DestroyEntityComponent>()
            .map(|s| s.entities().to_vec())
            .unwrap_or_default();
        let mut destroyed = 0;
        for entity in queued {
            if self.destroy(entity).is_ok() {
                destroyed += 1;
            }
        }
        if destroyed > 0 {
            tracing::debug!(count = destroyed, "destroyed queued entities");
        }
        destroyed
    }

    /// Flag `entity` as changed this frame.
    pub fn dirty(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.add(entity, DirtyComponent).map(|_| ())
    }

    // -- names and tags -----------------------------------------------------

    /// The first entity (in storage order) whose name equals `name`.
    pub fn find_by_name(&self, name: &str) -> Option<Entity> {
        self.view::<&NameComponent>()
            .find(|(_, n)| n.name == name)
            .map(|(entity, _)| entity)
    }

    /// Every entity tagged `tag`.
    pub fn find_by_tag(&self, tag: &str) -> Vec<Entity> {
        self.view::<&TagComponent>()
            .filter(|(_, t)| t.tag == tag)
            .map(|(entity, _)| entity)
            .collect()
    }

    pub fn name_of(&self, entity: Entity) -> Option<&str> {
        self.get::<NameComponent>(entity).map(|n| n.name.as_str())
    }

    /// Set or replace the name of `entity`.
    pub fn set_name(&mut self, entity: Entity, name: impl Into<String>) -> Result<(), EcsError> {
        self.add(entity, NameComponent::new(name)).map(|_| ())
    }

    // -- serialization ------------------------------------------------------

    /// Write every persistent component of `entity` into `writer`'s node.
    pub fn serialize_entity(&self, entity: Entity, writer: &mut Writer<'_>) {
        for info in self.components.iter().filter(|info| info.persistent) {
            let storage = &self.storages[info.id.index()];
            if !storage.contains(entity) {
                continue;
            }
            let data = writer.payload();
            let mut node = Node::new(info.name.as_str());
            let mut component_writer = match data {
                Some(data) => Writer::with_data(&mut node, data),
                None => Writer::new(&mut node),
            };
            storage.serialize_one(entity, &mut component_writer);
            writer.write_node(node);
        }
    }

    /// Write all entities, narrowing `scope` to each entity in turn.
    pub fn serialize_scoped<P: EntityScope>(&self, writer: &mut Writer<'_>, scope: &P) {
        for entity in self.entities() {
            let scoped = scope.for_entity(entity);
            let mut node = Node::new(ENTITY_NODE);
            self.serialize_entity(entity, &mut Writer::with_data(&mut node, &scoped));
            writer.write_node(node);
        }
    }

    /// Report of the most recent successful load into this registry,
    /// including loads made through [`Serializable::deserialize`].
    pub fn last_load_report(&self) -> Option<&LoadReport> {
        self.last_report.as_ref()
    }

    /// Create entities from the entity nodes under `reader`, handing each
    /// component `reader`'s payload unchanged.
    pub fn load_entities(&mut self, reader: &Reader<'_>) -> Result<LoadReport, EcsError> {
        self.load_inner::<()>(reader.node(), None, reader.payload())
    }

    /// Like [`load_entities`](Self::load_entities), narrowing `scope` to each
    /// new entity for its components.
    pub fn load_entities_scoped<P: EntityScope>(
        &mut self,
        reader: &Reader<'_>,
        scope: &P,
    ) -> Result<LoadReport, EcsError> {
        self.load_inner(reader.node(), Some(scope), None)
    }

    /// Check that every component name is registered and appears at most
    /// once per entity. Nothing is created if this fails.
    fn validate(&self, node: &Node) -> Result<Vec<Vec<ComponentId>>, EcsError> {
        let mut plan = Vec::new();
        for (entity_index, entity_node) in node.find_all(ENTITY_NODE).enumerate() {
            let mut ids: Vec<ComponentId> = Vec::with_capacity(entity_node.children().len());
            for component_node in entity_node.children() {
                let name = component_node.name();
                let id = self.components.lookup_by_name(name).ok_or_else(|| {
                    EcsError::UnknownComponent {
                        name: name.to_owned(),
                        entity_index: Some(entity_index),
                        registered: self.components.registered_names().join(", "),
                    }
                })?;
                if ids.contains(&id) {
                    return Err(EcsError::DuplicateComponent {
                        entity: entity_index,
                        component: name.to_owned(),
                    });
                }
                ids.push(id);
            }
            plan.push(ids);
        }
        Ok(plan)
    }

    fn load_inner<P: EntityScope>(
        &mut self,
        node: &Node,
        scope: Option<&P>,
        passthrough: Option<&dyn Any>,
    ) -> Result<LoadReport, EcsError> {
        for other in node.children().iter().filter(|c| c.name() != ENTITY_NODE) {
            tracing::warn!(node = other.name(), "skipping non-entity node");
        }
        let plan = self.validate(node)?;

        let mut report = LoadReport::default();
        for (entity_index, (entity_node, ids)) in node.find_all(ENTITY_NODE).zip(plan).enumerate() {
            let entity = self.create();
            report.entities.push(entity);

            let scoped = scope.map(|s| s.for_entity(entity));
            let data: Option<&dyn Any> = match &scoped {
                Some(scoped) => Some(scoped as &dyn Any),
                None => passthrough,
            };

            let mut failed: Vec<(String, DeserializeError)> = Vec::new();
            for (component_node, id) in entity_node.children().iter().zip(ids) {
                let reader = match data {
                    Some(data) => Reader::with_data(component_node, data),
                    None => Reader::new(component_node),
                };
                if let Err(error) = self.storages[id.index()].deserialize_one(entity, &reader) {
                    failed.push((component_node.name().to_owned(), error));
                }
            }

            let entity_name = self.name_of(entity).map(str::to_owned);
            for (component, error) in failed {
                tracing::warn!(
                    entity = %entity,
                    entity_index,
                    entity_name = entity_name.as_deref().unwrap_or(""),
                    component = component.as_str(),
                    error = %error,
                    "component failed to load"
                );
                report.issues.push(LoadIssue {
                    entity_index,
                    entity,
                    entity_name: entity_name.clone(),
                    component,
                    error,
                });
            }
        }

        tracing::debug!(
            entities = report.entities.len(),
            issues = report.issues.len(),
            "loaded entities"
        );
        self.last_report = Some(report.clone());
        Ok(report)
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("entities", &self.len())
            .field("components", &self.components.registered_names())
            .finish()
    }
}

/// Writes every entity with the writer's payload as-is. Decoding replaces the
/// registry's entities only if the node is structurally valid.
impl Serializable for EntityRegistry {
    fn serialize(&self, writer: &mut Writer<'_>) {
        for entity in self.entities() {
            let data = writer.payload();
            let mut node = Node::new(ENTITY_NODE);
            let mut entity_writer = match data {
                Some(data) => Writer::with_data(&mut node, data),
                None => Writer::new(&mut node),
            };
            self.serialize_entity(entity, &mut entity_writer);
            writer.write_node(node);
        }
    }

    fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
        let mut fresh = self.empty_like();
        fresh
            .load_entities(reader)
            .map_err(|err| DeserializeError::Invalid {
                field: ENTITY_NODE.to_owned(),
                details: err.to_string(),
            })?;
        *self = fresh;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
