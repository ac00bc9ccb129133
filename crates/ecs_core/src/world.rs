use std::collections::HashMap;

use crate::archetype::{ArchetypeGraph, ArchetypeId, ColumnId};
use crate::config::WorldConfig;
use crate::entity::{Entity, EntityManager};
use crate::error::EcsError;
use crate::event::Events;
use crate::observer::ObserverRegistry;
use crate::resource::Resources;
use crate::table::DenseTable;
use crate::table::SparseRelationTable;
use crate::type_registry::{registry, RelationFlags, TypeId, TypeKind};

const UNREGISTERED: TypeId = TypeId::MAX;

/// The central store: entities, their archetype-partitioned components,
/// sparse relations, resources, and buffered events (§4.6). Mutation methods
/// here are immediate; `commands::CommandBuffer` defers them for use from
/// inside a running system.
pub struct World {
    config: WorldConfig,
    entities: EntityManager,
    archetypes: ArchetypeGraph,
    tables: HashMap<ArchetypeId, DenseTable>,
    locations: HashMap<Entity, (ArchetypeId, usize)>,
    relations: HashMap<TypeId, SparseRelationTable>,
    resources: Resources,
    events: Events,
    observers: ObserverRegistry,
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        let archetypes = ArchetypeGraph::new();
        let empty = archetypes.empty();
        let mut tables = HashMap::new();
        tables.insert(empty, DenseTable::new(archetypes.archetype(empty)));
        Self {
            config,
            entities: EntityManager::new(),
            archetypes,
            tables,
            locations: HashMap::new(),
            relations: HashMap::new(),
            resources: Resources::new(),
            events: Events::new(),
            observers: ObserverRegistry::new(),
        }
    }

    pub fn config(&self) -> WorldConfig {
        self.config
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut Resources {
        &mut self.resources
    }

    /// Inserts `value` as the world's singleton `T`, registering `T` in the
    /// type registry under `TypeKind::Resource` so it gets a stable `TypeId`
    /// like components and relations do (§3, §4.6). Errors if `T` is already
    /// registered as some other kind.
    pub fn insert_resource<T: ecs_reflect::Reflect + Send + Sync>(
        &mut self,
        value: T,
    ) -> Result<(), EcsError> {
        let type_id = registry().register::<T>(TypeKind::Resource, RelationFlags::default());
        registry().require_kind(type_id, TypeKind::Resource)?;
        self.resources.insert(value);
        Ok(())
    }

    /// Removes and returns the world's singleton `T`, if present.
    pub fn remove_resource<T: ecs_reflect::Reflect + Send + Sync>(&mut self) -> Option<T> {
        self.resources.remove::<T>()
    }

    pub fn events(&self) -> &Events {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut Events {
        &mut self.events
    }

    pub fn observers_mut(&mut self) -> &mut ObserverRegistry {
        &mut self.observers
    }

    pub fn archetypes(&self) -> &ArchetypeGraph {
        &self.archetypes
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.alive(entity)
    }

    pub fn location(&self, entity: Entity) -> Option<(ArchetypeId, usize)> {
        self.locations.get(&entity).copied()
    }

    pub fn table(&self, archetype: ArchetypeId) -> Option<&DenseTable> {
        self.tables.get(&archetype)
    }

    fn require_alive(&self, entity: Entity) -> Result<(), EcsError> {
        if self.entities.alive(entity) {
            Ok(())
        } else {
            Err(EcsError::EntityNotAlive(entity))
        }
    }

    pub fn create(&mut self) -> Entity {
        let entity = self.entities.create();
        let empty = self.archetypes.empty();
        let table = self
            .tables
            .get_mut(&empty)
            .expect("empty archetype always has a table");
        let row = table.push(entity);
        self.locations.insert(entity, (empty, row));
        entity
    }

    pub fn destroy(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.require_alive(entity)?;
        let (archetype, _) = self.locations[&entity];
        let columns = self.archetypes.archetype(archetype).columns.clone();
        for &column in &columns {
            self.fire_remove(column, entity);
        }

        let (archetype, row) = self
            .locations
            .remove(&entity)
            .expect("alive entity always has a location");
        let table = self
            .tables
            .get_mut(&archetype)
            .expect("location references a live table");
        if let Some((moved_entity, new_row)) = table.swap_erase(row) {
            self.locations.insert(moved_entity, (archetype, new_row));
        }

        for relation in self.relations.values_mut() {
            relation.erase_from(entity);
            relation.erase_to(entity);
        }

        self.entities.destroy(entity);
        Ok(())
    }

    pub fn has<T: ecs_reflect::Reflect>(&self, entity: Entity) -> bool {
        let Some(type_id) = registry().id_of::<T>() else {
            return false;
        };
        self.has_column(entity, ColumnId::component(type_id))
    }

    fn has_column(&self, entity: Entity, column: ColumnId) -> bool {
        let Some(&(archetype, _)) = self.locations.get(&entity) else {
            return false;
        };
        self.archetypes.contains(archetype, column)
    }

    pub fn get<T: ecs_reflect::Reflect>(&self, entity: Entity) -> Result<&T, EcsError> {
        let type_id = registry()
            .id_of::<T>()
            .ok_or(EcsError::TypeNotRegistered(UNREGISTERED))?;
        let column = ColumnId::component(type_id);
        let &(archetype, row) = self
            .locations
            .get(&entity)
            .ok_or(EcsError::EntityNotAlive(entity))?;
        let table = self
            .tables
            .get(&archetype)
            .expect("location references a live table");
        let ptr = table
            .column_ptr(column, row)
            .ok_or(EcsError::ComponentMissing { entity, type_id })?;
        Ok(unsafe { &*(ptr as *const T) })
    }

    pub fn get_mut<T: ecs_reflect::Reflect>(&mut self, entity: Entity) -> Result<&mut T, EcsError> {
        let type_id = registry()
            .id_of::<T>()
            .ok_or(EcsError::TypeNotRegistered(UNREGISTERED))?;
        let column = ColumnId::component(type_id);
        let &(archetype, row) = self
            .locations
            .get(&entity)
            .ok_or(EcsError::EntityNotAlive(entity))?;
        let table = self
            .tables
            .get_mut(&archetype)
            .expect("location references a live table");
        let ptr = table
            .column_ptr_mut(column, row)
            .ok_or(EcsError::ComponentMissing { entity, type_id })?;
        Ok(unsafe { &mut *(ptr as *mut T) })
    }

    /// Inserts `value` as a component of `entity`, moving it to a new
    /// archetype if it doesn't already carry that column, or overwriting the
    /// existing value in place otherwise. Fires `on_add` only on insertion.
    pub fn add<T: ecs_reflect::Reflect>(&mut self, entity: Entity, value: T) -> Result<(), EcsError> {
        self.require_alive(entity)?;
        let type_id = registry().register::<T>(TypeKind::Component, RelationFlags::default());
        registry().require_kind(type_id, TypeKind::Component)?;
        let column = ColumnId::component(type_id);
        let (archetype, row) = self.locations[&entity];

        if self.archetypes.contains(archetype, column) {
            let table = self.tables.get_mut(&archetype).unwrap();
            let ptr = table.column_ptr_mut(column, row).unwrap();
            unsafe {
                std::ptr::drop_in_place(ptr as *mut T);
                std::ptr::write(ptr as *mut T, value);
            }
            return Ok(());
        }

        let dest_archetype = self.archetypes.with(archetype, column);
        self.ensure_table(dest_archetype);
        let dest_row = self.move_row(entity, archetype, row, dest_archetype);
        let dest_table = self.tables.get_mut(&dest_archetype).unwrap();
        let ptr = dest_table.column_ptr_mut(column, dest_row).unwrap();
        unsafe {
            std::ptr::write(ptr as *mut T, value);
        }
        self.fire_add(column, entity);
        Ok(())
    }

    /// Like `add`, but copies `bytes` into the column via the type's
    /// reflected copy constructor instead of moving a typed Rust value in.
    /// Used by code that only has a `ColumnId` and raw bytes to work with,
    /// such as blueprint instantiation and the reflection wire protocol.
    pub fn add_raw(&mut self, entity: Entity, column: ColumnId, bytes: &[u8]) -> Result<(), EcsError> {
        self.require_alive(entity)?;
        let descriptor = registry().descriptor(column.type_id)?;
        let (archetype, row) = self.locations[&entity];

        let already_present = self.archetypes.contains(archetype, column);
        let dest_row = if already_present {
            row
        } else {
            let dest_archetype = self.archetypes.with(archetype, column);
            self.ensure_table(dest_archetype);
            self.move_row(entity, archetype, row, dest_archetype)
        };

        let (archetype, _) = self.locations[&entity];
        let table = self.tables.get_mut(&archetype).unwrap();
        let ptr = table.column_ptr_mut(column, dest_row).unwrap();
        unsafe {
            if already_present {
                descriptor.destruct(ptr);
            }
            if !descriptor.construct_copy(bytes.as_ptr(), ptr) {
                std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, descriptor.size);
            }
        }
        if !already_present {
            self.fire_add(column, entity);
        }
        Ok(())
    }

    /// Removes `T` from `entity` if present. A no-op, not an error, if the
    /// entity never carried it (§4.9 mirrors this for buffered commands).
    pub fn remove<T: ecs_reflect::Reflect>(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.require_alive(entity)?;
        let Some(type_id) = registry().id_of::<T>() else {
            return Ok(());
        };
        let column = ColumnId::component(type_id);
        let (archetype, _) = self.locations[&entity];
        if !self.archetypes.contains(archetype, column) {
            return Ok(());
        }
        self.fire_remove(column, entity);

        let (archetype, row) = self.locations[&entity];
        let dest_archetype = self.archetypes.without(archetype, column);
        self.ensure_table(dest_archetype);
        self.move_row(entity, archetype, row, dest_archetype);
        Ok(())
    }

    fn ensure_table(&mut self, archetype: ArchetypeId) {
        if !self.tables.contains_key(&archetype) {
            let table = DenseTable::new(self.archetypes.archetype(archetype));
            self.tables.insert(archetype, table);
        }
    }

    /// Moves `entity`'s row from `src_archetype` to `dest_archetype`, carrying
    /// over every column shared by both via `move_column_into` and destructing
    /// any column `dest` doesn't have. Columns only `dest` has are left
    /// zero-initialized for the caller to write into. Updates `locations` for
    /// both `entity` and whatever row got swapped into its old slot.
    fn move_row(
        &mut self,
        entity: Entity,
        src_archetype: ArchetypeId,
        src_row: usize,
        dest_archetype: ArchetypeId,
    ) -> usize {
        if src_archetype == dest_archetype {
            return src_row;
        }

        let shared: Vec<ColumnId> = self
            .archetypes
            .archetype(src_archetype)
            .columns
            .iter()
            .copied()
            .filter(|&c| self.archetypes.contains(dest_archetype, c))
            .collect();
        let dropped: Vec<ColumnId> = self
            .archetypes
            .archetype(src_archetype)
            .columns
            .iter()
            .copied()
            .filter(|c| !shared.contains(c))
            .collect();

        // Both tables are pulled out of the map so the borrow checker sees
        // two distinct owned values instead of one aliased HashMap entry.
        let mut src_table = self.tables.remove(&src_archetype).expect("src table exists");
        let mut dest_table = self
            .tables
            .remove(&dest_archetype)
            .expect("dest table ensured by caller");

        let dest_row = dest_table.push_uninit(entity);
        for &col in &shared {
            src_table.move_column_into(col, src_row, &mut dest_table, dest_row);
        }
        for &col in &dropped {
            src_table.destruct_column(col, src_row);
        }
        if let Some((moved_entity, new_row)) = src_table.remove_row_moved_out(src_row) {
            self.locations.insert(moved_entity, (src_archetype, new_row));
        }

        self.tables.insert(src_archetype, src_table);
        self.tables.insert(dest_archetype, dest_table);
        self.locations.insert(entity, (dest_archetype, dest_row));
        dest_row
    }

    fn fire_add(&mut self, column: ColumnId, entity: Entity) {
        let observers = self.observers.add_observers(column);
        for observer in observers {
            observer(self, entity);
        }
    }

    fn fire_remove(&mut self, column: ColumnId, entity: Entity) {
        let observers = self.observers.remove_observers(column);
        for observer in observers {
            observer(self, entity);
        }
    }

    // --- relations ---

    pub fn register_relation<T: ecs_reflect::Reflect>(&mut self, flags: RelationFlags) -> TypeId {
        registry().register::<T>(TypeKind::Relation, flags)
    }

    /// Relates `from` to `to` with payload `value`. Relation row bytes are
    /// stored and moved as raw bytes and are never run through the reflected
    /// destructor on erase, so relation payloads should be trivially
    /// droppable (plain data or zero-sized markers); see DESIGN.md.
    pub fn relate<T: ecs_reflect::Reflect>(
        &mut self,
        from: Entity,
        to: Entity,
        value: T,
    ) -> Result<(), EcsError> {
        self.require_alive(from)?;
        self.require_alive(to)?;
        let type_id = registry()
            .id_of::<T>()
            .ok_or(EcsError::TypeNotRegistered(UNREGISTERED))?;
        let meta = registry().require_kind(type_id, TypeKind::Relation)?;
        let descriptor = registry().descriptor(meta.id)?;
        let bytes =
            unsafe { std::slice::from_raw_parts(&value as *const T as *const u8, descriptor.size) };
        let table = self.relation_table(meta.id, descriptor.size, meta.flags);
        let result = table.insert(from, to, bytes);
        std::mem::forget(value);
        result.map(|_| ())
    }

    pub fn unrelate<T: ecs_reflect::Reflect>(&mut self, from: Entity, to: Entity) -> Result<bool, EcsError> {
        let type_id = registry()
            .id_of::<T>()
            .ok_or(EcsError::TypeNotRegistered(UNREGISTERED))?;
        Ok(self
            .relations
            .get_mut(&type_id)
            .map(|t| t.erase(from, to))
            .unwrap_or(false))
    }

    pub fn related<T: ecs_reflect::Reflect>(&self, from: Entity, to: Entity) -> bool {
        let Some(type_id) = registry().id_of::<T>() else {
            return false;
        };
        self.relations
            .get(&type_id)
            .map(|t| t.related(from, to))
            .unwrap_or(false)
    }

    pub fn ancestors<T: ecs_reflect::Reflect>(&self, of: Entity) -> Vec<(Entity, u32)> {
        let Some(type_id) = registry().id_of::<T>() else {
            return Vec::new();
        };
        self.relations
            .get(&type_id)
            .map(|t| t.ancestors(of))
            .unwrap_or_default()
    }

    /// Type-erased relation lookup, keyed by the ECS-level `TypeId` a
    /// `ColumnId` carries. Used by `query::QueryState` to evaluate
    /// `Term::Relation` terms, which only ever see a relation as a column id,
    /// never the Rust type that registered it (§4.7).
    pub fn relation_to(&self, type_id: TypeId, from: Entity, to: Entity) -> bool {
        self.relations
            .get(&type_id)
            .map(|t| t.related(from, to))
            .unwrap_or(false)
    }

    /// Type-erased counterpart to `relation_to` for a `Target::Any` on the
    /// `to` side: whether `entity` plays the `from` role in at least one row.
    pub fn relation_has_from(&self, type_id: TypeId, entity: Entity) -> bool {
        self.relations
            .get(&type_id)
            .map(|t| t.has_edge_from(entity))
            .unwrap_or(false)
    }

    /// Type-erased counterpart to `relation_to` for a `Target::Any` on the
    /// `from` side: whether `entity` plays the `to` role in at least one row.
    pub fn relation_has_to(&self, type_id: TypeId, entity: Entity) -> bool {
        self.relations
            .get(&type_id)
            .map(|t| t.has_edge_to(entity))
            .unwrap_or(false)
    }

    /// Every partner entity related to `entity` with `entity` in the `from`
    /// role. Used by `QueryState::pin_pairs` to bind a `Target::Any` on the
    /// `to` side to concrete entities rather than just checking for one.
    pub fn relation_partners_from(&self, type_id: TypeId, entity: Entity) -> Vec<Entity> {
        self.relations
            .get(&type_id)
            .map(|t| t.partners_from(entity))
            .unwrap_or_default()
    }

    /// `Target::Any`-on-`from` counterpart to `relation_partners_from`.
    pub fn relation_partners_to(&self, type_id: TypeId, entity: Entity) -> Vec<Entity> {
        self.relations
            .get(&type_id)
            .map(|t| t.partners_to(entity))
            .unwrap_or_default()
    }

    fn relation_table(
        &mut self,
        type_id: TypeId,
        elem_size: usize,
        flags: RelationFlags,
    ) -> &mut SparseRelationTable {
        self.relations
            .entry(type_id)
            .or_insert_with(|| SparseRelationTable::new(type_id, elem_size, flags.symmetric, flags.tree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Clone, Copy)]
    struct Position {
        x: f32,
        y: f32,
    }

    impl ecs_reflect::Reflect for Position {
        const NAME: &'static str = "WorldTestPosition";
        fn build_descriptor(id: ecs_reflect::ReflectId) -> ecs_reflect::TypeDescriptor {
            unsafe fn destruct(_ptr: *mut u8) {}
            ecs_reflect::TypeDescriptor {
                id,
                name: Self::NAME,
                size: std::mem::size_of::<Position>(),
                align: std::mem::align_of::<Position>(),
                constructible: Some(ecs_reflect::ConstructibleTrait {
                    default_construct: None,
                    copy_construct: None,
                    move_construct: None,
                    destruct,
                }),
                fields: None,
                array: None,
                dictionary: None,
                string_conversion: None,
                nullable: None,
            }
        }
    }

    #[derive(Debug, PartialEq, Clone, Copy)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }

    impl ecs_reflect::Reflect for Velocity {
        const NAME: &'static str = "WorldTestVelocity";
        fn build_descriptor(id: ecs_reflect::ReflectId) -> ecs_reflect::TypeDescriptor {
            unsafe fn destruct(_ptr: *mut u8) {}
            ecs_reflect::TypeDescriptor {
                id,
                name: Self::NAME,
                size: std::mem::size_of::<Velocity>(),
                align: std::mem::align_of::<Velocity>(),
                constructible: Some(ecs_reflect::ConstructibleTrait {
                    default_construct: None,
                    copy_construct: None,
                    move_construct: None,
                    destruct,
                }),
                fields: None,
                array: None,
                dictionary: None,
                string_conversion: None,
                nullable: None,
            }
        }
    }

    #[test]
    fn create_add_get_remove_round_trip() {
        let mut world = World::new(WorldConfig::default());
        let e = world.create();
        assert!(world.is_alive(e));
        assert!(!world.has::<Position>(e));

        world.add(e, Position { x: 1.0, y: 2.0 }).unwrap();
        assert!(world.has::<Position>(e));
        assert_eq!(*world.get::<Position>(e).unwrap(), Position { x: 1.0, y: 2.0 });

        world.add(e, Velocity { dx: 0.5, dy: -0.5 }).unwrap();
        assert_eq!(*world.get::<Position>(e).unwrap(), Position { x: 1.0, y: 2.0 });
        assert_eq!(*world.get::<Velocity>(e).unwrap(), Velocity { dx: 0.5, dy: -0.5 });

        world.remove::<Position>(e).unwrap();
        assert!(!world.has::<Position>(e));
        assert_eq!(*world.get::<Velocity>(e).unwrap(), Velocity { dx: 0.5, dy: -0.5 });
    }

    #[test]
    fn add_overwrites_existing_value_without_moving_archetype() {
        let mut world = World::new(WorldConfig::default());
        let e = world.create();
        world.add(e, Position { x: 0.0, y: 0.0 }).unwrap();
        let (archetype_before, _) = world.location(e).unwrap();
        world.add(e, Position { x: 9.0, y: 9.0 }).unwrap();
        let (archetype_after, _) = world.location(e).unwrap();
        assert_eq!(archetype_before, archetype_after);
        assert_eq!(*world.get::<Position>(e).unwrap(), Position { x: 9.0, y: 9.0 });
    }

    #[test]
    fn destroy_recycles_swapped_row_location() {
        let mut world = World::new(WorldConfig::default());
        let a = world.create();
        let b = world.create();
        world.add(a, Position { x: 1.0, y: 1.0 }).unwrap();
        world.add(b, Position { x: 2.0, y: 2.0 }).unwrap();

        world.destroy(a).unwrap();
        assert!(!world.is_alive(a));
        assert!(world.is_alive(b));
        assert_eq!(*world.get::<Position>(b).unwrap(), Position { x: 2.0, y: 2.0 });
    }

    #[test]
    fn destroy_unknown_entity_is_an_error() {
        let mut world = World::new(WorldConfig::default());
        let e = world.create();
        world.destroy(e).unwrap();
        assert_eq!(world.destroy(e), Err(EcsError::EntityNotAlive(e)));
    }

    #[test]
    fn relation_lifecycle_and_symmetric_cleanup_on_destroy() {
        #[derive(Clone, Copy)]
        struct ChildOf;
        impl ecs_reflect::Reflect for ChildOf {
            const NAME: &'static str = "WorldTestChildOf";
            fn build_descriptor(id: ecs_reflect::ReflectId) -> ecs_reflect::TypeDescriptor {
                unsafe fn destruct(_ptr: *mut u8) {}
                ecs_reflect::TypeDescriptor {
                    id,
                    name: Self::NAME,
                    size: 0,
                    align: 1,
                    constructible: Some(ecs_reflect::ConstructibleTrait {
                        default_construct: None,
                        copy_construct: None,
                        move_construct: None,
                        destruct,
                    }),
                    fields: None,
                    array: None,
                    dictionary: None,
                    string_conversion: None,
                    nullable: None,
                }
            }
        }

        let mut world = World::new(WorldConfig::default());
        world.register_relation::<ChildOf>(RelationFlags {
            symmetric: false,
            tree: true,
        });
        let parent = world.create();
        let child = world.create();
        world.relate(parent, child, ChildOf).unwrap();
        assert!(world.related::<ChildOf>(parent, child));

        world.destroy(parent).unwrap();
        assert!(!world.related::<ChildOf>(parent, child));
    }
}
