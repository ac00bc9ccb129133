use crate::traits::{
    ArrayTrait, ConstructibleTrait, DictionaryTrait, FieldsTrait, NullableTrait,
    StringConversionTrait,
};

/// Stable id assigned to a type the first time it is reflected. Never reused.
pub type ReflectId = u32;

/// Everything the ECS needs to know about a type at runtime without
/// monomorphizing over it: layout, and whichever optional traits it implements.
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    pub id: ReflectId,
    pub name: &'static str,
    pub size: usize,
    pub align: usize,
    pub constructible: Option<ConstructibleTrait>,
    pub fields: Option<FieldsTrait>,
    pub array: Option<ArrayTrait>,
    pub dictionary: Option<DictionaryTrait>,
    pub string_conversion: Option<StringConversionTrait>,
    pub nullable: Option<NullableTrait>,
}

impl TypeDescriptor {
    /// Zero-initializes `dst` when no default constructor is reflected, matching
    /// the dense table's fallback for plain-data columns (§4.4).
    ///
    /// # Safety
    /// `dst` must point to at least `self.size` writable, correctly aligned bytes.
    pub unsafe fn construct_default(&self, dst: *mut u8) {
        match self.constructible.and_then(|c| c.default_construct) {
            Some(ctor) => ctor(dst),
            None => std::ptr::write_bytes(dst, 0, self.size),
        }
    }

    /// # Safety
    /// `src`/`dst` must each point to `self.size` bytes of type-correct storage,
    /// non-overlapping, and the type must reflect a copy constructor.
    pub unsafe fn construct_copy(&self, src: *const u8, dst: *mut u8) -> bool {
        match self.constructible.and_then(|c| c.copy_construct) {
            Some(ctor) => {
                ctor(src, dst);
                true
            }
            None => false,
        }
    }

    /// # Safety
    /// Same as [`Self::construct_copy`], but `src` is left in a moved-from state;
    /// callers must not destruct `src` afterwards.
    pub unsafe fn construct_move(&self, src: *mut u8, dst: *mut u8) -> bool {
        match self.constructible.and_then(|c| c.move_construct) {
            Some(ctor) => {
                ctor(src, dst);
                true
            }
            None => false,
        }
    }

    /// # Safety
    /// `ptr` must point at a live, initialized instance of this type.
    pub unsafe fn destruct(&self, ptr: *mut u8) {
        if let Some(c) = self.constructible {
            (c.destruct)(ptr);
        }
    }
}

/// Implemented by Rust types that want to participate in the reflection system.
/// A blanket `define_reflect!` macro (see `registry`) generates this for plain
/// POD structs; types with array/dictionary/string semantics implement it by
/// hand to wire up the relevant optional trait.
pub trait Reflect: 'static + Sized {
    const NAME: &'static str;

    /// Builds this type's descriptor. Called once, at first registration, with
    /// the id the registry has reserved for it.
    fn build_descriptor(id: ReflectId) -> TypeDescriptor;
}
