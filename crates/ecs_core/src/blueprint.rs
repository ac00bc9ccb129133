use std::collections::HashMap;

use crate::config::WorldConfig;
use crate::entity::Entity;
use crate::world::World;

/// A small, detached `World` used as a template, plus a name table over its
/// entities. Instantiating a blueprint into a target world spawns a fresh
/// entity for each name and copies its components across by reflected copy
/// construction, so a blueprint never has to know the target's entity ids up
/// front — its own entity handles only ever need to resolve relative to
/// itself and its name table (§4.12).
pub struct Blueprint {
    world: World,
    names: HashMap<String, Entity>,
}

impl Blueprint {
    pub fn new() -> Self {
        Self {
            world: World::new(WorldConfig::default()),
            names: HashMap::new(),
        }
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn spawn_named(&mut self, name: impl Into<String>) -> Entity {
        let entity = self.world.create();
        self.names.insert(name.into(), entity);
        entity
    }

    pub fn named(&self, name: &str) -> Option<Entity> {
        self.names.get(name).copied()
    }

    /// Spawns one fresh entity per named entity in `target` and copies every
    /// reflected, copy-constructible component across. Unnamed entities in
    /// the blueprint (if any were spawned via its raw `world_mut()`) are not
    /// instantiated: a blueprint's public surface is its named entities.
    /// Any field a component's `FieldsTrait` reports as `Entity`-typed is
    /// rewritten, if its value names another blueprint entity, to that
    /// entity's freshly spawned counterpart (§4.12) — otherwise the copied
    /// value would still point at the blueprint's own, unrelated handle.
    /// Returns the name -> new-entity mapping so the caller can rewire
    /// further cross-references itself (e.g. relate newly spawned parts).
    pub fn instantiate(&self, target: &mut World) -> HashMap<String, Entity> {
        let mapping: HashMap<String, Entity> = self
            .names
            .keys()
            .map(|name| (name.clone(), target.create()))
            .collect();
        let source_by_entity: HashMap<Entity, &str> =
            self.names.iter().map(|(name, &e)| (e, name.as_str())).collect();
        let entity_reflect_id = ecs_reflect::lookup::<Entity>();

        for (name, &source) in &self.names {
            let Some((archetype, row)) = self.world.location(source) else {
                continue;
            };
            let &dest = mapping.get(name).expect("just inserted above");
            let columns = self.world.archetypes().archetype(archetype).columns.clone();
            let Some(table) = self.world.table(archetype) else {
                continue;
            };
            for column in columns {
                let Some(src_ptr) = table.column_ptr(column, row) else {
                    continue;
                };
                let Ok(descriptor) = crate::type_registry::registry().descriptor(column.type_id) else {
                    continue;
                };
                let mut bytes = unsafe { std::slice::from_raw_parts(src_ptr, descriptor.size) }.to_vec();
                if let (Some(fields), Some(entity_reflect_id)) = (descriptor.fields, entity_reflect_id) {
                    for field in fields.fields {
                        if field.type_id != entity_reflect_id {
                            continue;
                        }
                        let entity_size = std::mem::size_of::<Entity>();
                        if field.offset + entity_size > bytes.len() {
                            continue;
                        }
                        let referenced =
                            unsafe { std::ptr::read(bytes.as_ptr().add(field.offset) as *const Entity) };
                        if let Some(rewritten) = source_by_entity
                            .get(&referenced)
                            .and_then(|name| mapping.get(*name))
                        {
                            unsafe {
                                std::ptr::write(bytes.as_mut_ptr().add(field.offset) as *mut Entity, *rewritten);
                            }
                        }
                    }
                }
                let _ = target.add_raw(dest, column, &bytes);
            }
        }
        mapping
    }
}

impl Default for Blueprint {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_registry::{registry, RelationFlags, TypeKind};

    #[derive(Clone, Copy, PartialEq, Debug)]
    struct Health(i32);

    impl ecs_reflect::Reflect for Health {
        const NAME: &'static str = "BlueprintTestHealth";
        fn build_descriptor(id: ecs_reflect::ReflectId) -> ecs_reflect::TypeDescriptor {
            unsafe fn destruct(_ptr: *mut u8) {}
            unsafe fn copy_construct(src: *const u8, dst: *mut u8) {
                std::ptr::copy_nonoverlapping(src, dst, std::mem::size_of::<Health>());
            }
            ecs_reflect::TypeDescriptor {
                id,
                name: Self::NAME,
                size: std::mem::size_of::<Health>(),
                align: std::mem::align_of::<Health>(),
                constructible: Some(ecs_reflect::ConstructibleTrait {
                    default_construct: None,
                    copy_construct: Some(copy_construct),
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
    fn instantiate_copies_named_entity_components() {
        registry().register::<Health>(TypeKind::Component, RelationFlags::default());

        let mut blueprint = Blueprint::new();
        let hero = blueprint.spawn_named("hero");
        blueprint.world_mut().add(hero, Health(10)).unwrap();

        let mut target = World::new(WorldConfig::default());
        let mapping = blueprint.instantiate(&mut target);
        let hero_in_target = mapping["hero"];
        assert_eq!(*target.get::<Health>(hero_in_target).unwrap(), Health(10));
    }

    #[derive(Clone, Copy)]
    struct LinkedTo(Entity);

    impl ecs_reflect::Reflect for LinkedTo {
        const NAME: &'static str = "BlueprintTestLinkedTo";
        fn build_descriptor(id: ecs_reflect::ReflectId) -> ecs_reflect::TypeDescriptor {
            unsafe fn destruct(_ptr: *mut u8) {}
            unsafe fn copy_construct(src: *const u8, dst: *mut u8) {
                std::ptr::copy_nonoverlapping(src, dst, std::mem::size_of::<LinkedTo>());
            }
            let entity_type = ecs_reflect::register::<Entity>();
            let fields: &'static [ecs_reflect::FieldEntry] = Box::leak(Box::new([ecs_reflect::FieldEntry {
                name: "target",
                type_id: entity_type,
                offset: 0,
            }]));
            ecs_reflect::TypeDescriptor {
                id,
                name: Self::NAME,
                size: std::mem::size_of::<LinkedTo>(),
                align: std::mem::align_of::<LinkedTo>(),
                constructible: Some(ecs_reflect::ConstructibleTrait {
                    default_construct: None,
                    copy_construct: Some(copy_construct),
                    move_construct: None,
                    destruct,
                }),
                fields: Some(ecs_reflect::FieldsTrait { fields }),
                array: None,
                dictionary: None,
                string_conversion: None,
                nullable: None,
            }
        }
    }

    #[test]
    fn instantiate_rewrites_internal_entity_cross_reference_per_instance() {
        registry().register::<LinkedTo>(TypeKind::Component, RelationFlags::default());

        let mut blueprint = Blueprint::new();
        let a = blueprint.spawn_named("a");
        let b = blueprint.spawn_named("b");
        blueprint.world_mut().add(a, LinkedTo(b)).unwrap();
        blueprint.world_mut().add(b, LinkedTo(a)).unwrap();

        let mut target = World::new(WorldConfig::default());
        let first = blueprint.instantiate(&mut target);
        let second = blueprint.instantiate(&mut target);

        let (a1, b1) = (first["a"], first["b"]);
        let (a2, b2) = (second["a"], second["b"]);
        assert_ne!(a1, a2);
        assert_ne!(b1, b2);

        assert_eq!(target.get::<LinkedTo>(a1).unwrap().0, b1);
        assert_eq!(target.get::<LinkedTo>(b1).unwrap().0, a1);
        assert_eq!(target.get::<LinkedTo>(a2).unwrap().0, b2);
        assert_eq!(target.get::<LinkedTo>(b2).unwrap().0, a2);
    }
}
