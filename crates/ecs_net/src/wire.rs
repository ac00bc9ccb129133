//! Reflection wire protocol: lets a remote inspector ask a running world for
//! a type's shape and for an entity's current component bytes, without
//! sharing the Rust types involved (§6).

use serde::{Deserialize, Serialize};

use ecs_core::{Entity, TypeId, World};
use ecs_reflect::ReflectId;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub type_id: ReflectId,
    pub offset: usize,
}

/// A type's wire-visible shape: layout plus its field table, if it reflects
/// one. Constructors/destructors never cross the wire; they are meaningless
/// outside the process that registered them.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TypeInfo {
    pub reflect_id: ReflectId,
    pub name: String,
    pub size: usize,
    pub align: usize,
    pub fields: Vec<FieldInfo>,
}

impl TypeInfo {
    pub fn describe(descriptor: &ecs_reflect::TypeDescriptor) -> Self {
        let fields = descriptor
            .fields
            .map(|f| {
                f.fields
                    .iter()
                    .map(|entry| FieldInfo {
                        name: entry.name.to_string(),
                        type_id: entry.type_id,
                        offset: entry.offset,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            reflect_id: descriptor.id,
            name: descriptor.name.to_string(),
            size: descriptor.size,
            align: descriptor.align,
            fields,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct TypeRequest {
    pub reflect_id: ReflectId,
}

/// The type server's reply; `info` is `None` when the id isn't registered on
/// this side of the connection.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TypeResponse {
    pub reflect_id: ReflectId,
    pub info: Option<TypeInfo>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ComponentSnapshot {
    pub type_id: TypeId,
    pub bytes: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EntitySnapshot {
    pub entity_index: u32,
    pub entity_generation: u32,
    pub components: Vec<ComponentSnapshot>,
}

/// Copies every component `entity` currently carries into a wire-ready
/// snapshot. Returns `None` if the entity has no location (already dead).
pub fn snapshot_entity(world: &World, entity: Entity) -> Option<EntitySnapshot> {
    let (archetype, row) = world.location(entity)?;
    let table = world.table(archetype)?;
    let columns = world.archetypes().archetype(archetype).columns.clone();

    let mut components = Vec::with_capacity(columns.len());
    for column in columns {
        let ptr = table.column_ptr(column, row)?;
        let size = ecs_core::registry().descriptor(column.type_id).ok()?.size;
        let bytes = unsafe { std::slice::from_raw_parts(ptr, size) }.to_vec();
        components.push(ComponentSnapshot {
            type_id: column.type_id,
            bytes,
        });
    }

    Some(EntitySnapshot {
        entity_index: entity.index(),
        entity_generation: entity.generation(),
        components,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecs_core::{RelationFlags, TypeKind, WorldConfig};

    #[derive(Clone, Copy)]
    struct Position {
        x: f32,
        y: f32,
    }

    impl ecs_reflect::Reflect for Position {
        const NAME: &'static str = "NetTestPosition";
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

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut world = World::new(WorldConfig::default());
        ecs_core::registry().register::<Position>(TypeKind::Component, RelationFlags::default());
        let entity = world.create();
        world.add(entity, Position { x: 1.0, y: 2.0 }).unwrap();

        let snapshot = snapshot_entity(&world, entity).unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: EntitySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.components.len(), 1);
        assert_eq!(back.components[0].bytes.len(), std::mem::size_of::<Position>());
    }
}
