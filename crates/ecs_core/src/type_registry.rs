use std::any::TypeId as RustTypeId;
use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::error::EcsError;

pub type TypeId = u32;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TypeKind {
    Component,
    Relation,
    Resource,
}

/// Relation-only flags (meaningless for components/resources). Symmetric
/// relations canonicalize (a, b) with a > b to (b, a); tree relations allow
/// at most one outgoing edge per entity and reject cycles (§3, §4.6).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelationFlags {
    pub symmetric: bool,
    pub tree: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct TypeMeta {
    pub id: TypeId,
    pub reflect_id: ecs_reflect::ReflectId,
    pub kind: TypeKind,
    pub flags: RelationFlags,
}

struct Inner {
    by_rust_type: HashMap<RustTypeId, TypeId>,
    metas: Vec<TypeMeta>,
}

/// The ECS's own type registry: on top of `ecs_reflect`'s layout/traits
/// descriptors, this tracks whether a type is used as a component, a
/// relation, or a resource, plus relation-only flags. Append-only; ids are
/// never reused (§4.2).
pub struct TypeRegistry {
    inner: RwLock<Inner>,
}

impl TypeRegistry {
    fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                by_rust_type: HashMap::new(),
                metas: Vec::new(),
            }),
        }
    }

    pub fn register<T: ecs_reflect::Reflect>(
        &self,
        kind: TypeKind,
        flags: RelationFlags,
    ) -> TypeId {
        if let Some(id) = self.id_of::<T>() {
            return id;
        }
        let reflect_id = ecs_reflect::register::<T>();
        let mut inner = self.inner.write().unwrap();
        if let Some(&id) = inner.by_rust_type.get(&RustTypeId::of::<T>()) {
            return id;
        }
        let id = inner.metas.len() as TypeId;
        inner.metas.push(TypeMeta {
            id,
            reflect_id,
            kind,
            flags,
        });
        inner.by_rust_type.insert(RustTypeId::of::<T>(), id);
        tracing::debug!(type_id = id, reflect_id, ?kind, "ecs type registered");
        id
    }

    pub fn id_of<T: 'static>(&self) -> Option<TypeId> {
        self.inner
            .read()
            .unwrap()
            .by_rust_type
            .get(&RustTypeId::of::<T>())
            .copied()
    }

    pub fn meta(&self, id: TypeId) -> Result<TypeMeta, EcsError> {
        self.inner
            .read()
            .unwrap()
            .metas
            .get(id as usize)
            .copied()
            .ok_or(EcsError::TypeNotRegistered(id))
    }

    pub fn is_kind(&self, id: TypeId, kind: TypeKind) -> Result<bool, EcsError> {
        Ok(self.meta(id)?.kind == kind)
    }

    pub fn require_kind(&self, id: TypeId, kind: TypeKind) -> Result<TypeMeta, EcsError> {
        let meta = self.meta(id)?;
        if meta.kind != kind {
            return Err(EcsError::TypeKindMismatch(id));
        }
        Ok(meta)
    }

    pub fn descriptor(&self, id: TypeId) -> Result<ecs_reflect::TypeDescriptor, EcsError> {
        let meta = self.meta(id)?;
        ecs_reflect::descriptor(meta.reflect_id).map_err(|_| EcsError::TypeNotRegistered(id))
    }
}

static REGISTRY: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);

pub fn registry() -> &'static TypeRegistry {
    &REGISTRY
}
