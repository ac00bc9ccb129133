use std::any::TypeId as RustTypeId;
use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::descriptor::{Reflect, ReflectId, TypeDescriptor};
use crate::error::ReflectError;

struct Registry {
    by_rust_type: HashMap<RustTypeId, ReflectId>,
    descriptors: Vec<TypeDescriptor>,
}

impl Registry {
    fn new() -> Self {
        Self {
            by_rust_type: HashMap::new(),
            descriptors: Vec::new(),
        }
    }
}

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::new()));

/// Registers `T`, returning its stable id. Idempotent: registering the same
/// Rust type twice returns the id assigned the first time.
pub fn register<T: Reflect>() -> ReflectId {
    if let Some(id) = lookup::<T>() {
        return id;
    }

    let mut reg = REGISTRY.write().unwrap();
    // Re-check under the write lock in case of a registration race.
    if let Some(&id) = reg.by_rust_type.get(&RustTypeId::of::<T>()) {
        return id;
    }

    let id = reg.descriptors.len() as ReflectId;
    let descriptor = T::build_descriptor(id);
    tracing::debug!(name = T::NAME, id, "reflect type registered");
    reg.descriptors.push(descriptor);
    reg.by_rust_type.insert(RustTypeId::of::<T>(), id);
    id
}

/// Looks up the id previously assigned to `T`, if it has been registered.
pub fn lookup<T: 'static>() -> Option<ReflectId> {
    REGISTRY
        .read()
        .unwrap()
        .by_rust_type
        .get(&RustTypeId::of::<T>())
        .copied()
}

/// Fetches the descriptor for a previously registered id.
pub fn descriptor(id: ReflectId) -> Result<TypeDescriptor, ReflectError> {
    REGISTRY
        .read()
        .unwrap()
        .descriptors
        .get(id as usize)
        .copied()
        .ok_or(ReflectError::UnknownReflectId(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ConstructibleTrait;

    struct Pod {
        x: i32,
        y: i32,
    }

    impl Reflect for Pod {
        const NAME: &'static str = "Pod";

        fn build_descriptor(id: ReflectId) -> TypeDescriptor {
            unsafe fn default_ctor(dst: *mut u8) {
                std::ptr::write(dst as *mut Pod, Pod { x: 0, y: 0 });
            }
            unsafe fn destruct(ptr: *mut u8) {
                std::ptr::drop_in_place(ptr as *mut Pod);
            }

            TypeDescriptor {
                id,
                name: Self::NAME,
                size: std::mem::size_of::<Pod>(),
                align: std::mem::align_of::<Pod>(),
                constructible: Some(ConstructibleTrait {
                    default_construct: Some(default_ctor),
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
    fn register_is_idempotent() {
        let a = register::<Pod>();
        let b = register::<Pod>();
        assert_eq!(a, b);
    }

    #[test]
    fn descriptor_round_trips_layout() {
        let id = register::<Pod>();
        let d = descriptor(id).unwrap();
        assert_eq!(d.size, std::mem::size_of::<Pod>());
        assert_eq!(d.align, std::mem::align_of::<Pod>());
    }

    #[test]
    fn unknown_id_errors() {
        assert!(matches!(
            descriptor(ReflectId::MAX),
            Err(ReflectError::UnknownReflectId(_))
        ));
    }
}
