use std::collections::HashMap;
use std::sync::Arc;

use crate::archetype::ColumnId;
use crate::entity::Entity;
use crate::world::World;

/// An observer callback. Boxed behind `Arc` so firing can clone the callback
/// list out of the registry before calling back into `&mut World`, rather
/// than holding a borrow of `self.observers` across the call (§4.8).
pub type ObserverFn = Arc<dyn Fn(&mut World, Entity) + Send + Sync>;

/// Hooks fired synchronously during a command buffer commit, in registration
/// order, whenever a column is added to or removed from an entity (§4.8).
#[derive(Default)]
pub struct ObserverRegistry {
    on_add: HashMap<ColumnId, Vec<ObserverFn>>,
    on_remove: HashMap<ColumnId, Vec<ObserverFn>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_add<F>(&mut self, column: ColumnId, observer: F)
    where
        F: Fn(&mut World, Entity) + Send + Sync + 'static,
    {
        self.on_add.entry(column).or_default().push(Arc::new(observer));
    }

    pub fn on_remove<F>(&mut self, column: ColumnId, observer: F)
    where
        F: Fn(&mut World, Entity) + Send + Sync + 'static,
    {
        self.on_remove.entry(column).or_default().push(Arc::new(observer));
    }

    pub(crate) fn add_observers(&self, column: ColumnId) -> Vec<ObserverFn> {
        self.on_add.get(&column).cloned().unwrap_or_default()
    }

    pub(crate) fn remove_observers(&self, column: ColumnId) -> Vec<ObserverFn> {
        self.on_remove.get(&column).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::type_registry::{registry, RelationFlags, TypeKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Marker;
    impl ecs_reflect::Reflect for Marker {
        const NAME: &'static str = "ObserverMarker";
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

    #[test]
    fn on_add_fires_once_on_insertion() {
        let mut world = World::new(WorldConfig::default());
        let type_id = registry().register::<Marker>(TypeKind::Component, RelationFlags::default());
        let column = ColumnId::component(type_id);
        let calls = std::sync::Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        world
            .observers_mut()
            .on_add(column, move |_world, _entity| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            });
        let entity = world.create();
        world.add(entity, Marker).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
