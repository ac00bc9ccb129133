use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Singleton values keyed by Rust type, one read/write lock per slot (§3, §5).
#[derive(Default)]
pub struct Resources {
    slots: HashMap<TypeId, RwLock<Box<dyn Any + Send + Sync>>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.slots
            .insert(TypeId::of::<T>(), RwLock::new(Box::new(value)));
    }

    pub fn remove<T: Any + Send + Sync>(&mut self) -> Option<T> {
        self.slots.remove(&TypeId::of::<T>()).map(|lock| {
            *lock
                .into_inner()
                .unwrap()
                .downcast::<T>()
                .expect("resource type mismatch")
        })
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.slots.contains_key(&TypeId::of::<T>())
    }

    pub fn read<T: Any + Send + Sync>(&self) -> Option<ResourceReadGuard<'_, T>> {
        let lock = self.slots.get(&TypeId::of::<T>())?;
        Some(ResourceReadGuard {
            guard: lock.read().unwrap(),
            _marker: std::marker::PhantomData,
        })
    }

    pub fn write<T: Any + Send + Sync>(&self) -> Option<ResourceWriteGuard<'_, T>> {
        let lock = self.slots.get(&TypeId::of::<T>())?;
        Some(ResourceWriteGuard {
            guard: lock.write().unwrap(),
            _marker: std::marker::PhantomData,
        })
    }
}

pub struct ResourceReadGuard<'a, T> {
    guard: RwLockReadGuard<'a, Box<dyn Any + Send + Sync>>,
    _marker: std::marker::PhantomData<T>,
}

impl<'a, T: Any + Send + Sync> std::ops::Deref for ResourceReadGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.guard.downcast_ref::<T>().expect("resource type mismatch")
    }
}

pub struct ResourceWriteGuard<'a, T> {
    guard: RwLockWriteGuard<'a, Box<dyn Any + Send + Sync>>,
    _marker: std::marker::PhantomData<T>,
}

impl<'a, T: Any + Send + Sync> std::ops::Deref for ResourceWriteGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.guard.downcast_ref::<T>().expect("resource type mismatch")
    }
}

impl<'a, T: Any + Send + Sync> std::ops::DerefMut for ResourceWriteGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.guard.downcast_mut::<T>().expect("resource type mismatch")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Score(u32);

    #[test]
    fn insert_read_write_remove() {
        let mut resources = Resources::new();
        resources.insert(Score(0));
        {
            let mut w = resources.write::<Score>().unwrap();
            w.0 = 10;
        }
        assert_eq!(*resources.read::<Score>().unwrap(), Score(10));
        assert_eq!(resources.remove::<Score>(), Some(Score(10)));
        assert!(!resources.contains::<Score>());
    }
}
