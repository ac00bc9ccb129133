//! Optional reflection traits. Each is a table of function pointers operating on
//! opaque byte addresses; presence is queried on `TypeDescriptor` rather than on a
//! Rust trait object, mirroring how the engine's reflected fields/array/dictionary
//! accessors work over `void*` in the original tooling.

/// Default/copy/move construction and destruction, over an opaque address.
///
/// Any of the constructors may be absent (e.g. a type with no sensible default);
/// `destruct` is always present for a registered type.
#[derive(Clone, Copy)]
pub struct ConstructibleTrait {
    pub default_construct: Option<unsafe fn(*mut u8)>,
    pub copy_construct: Option<unsafe fn(*const u8, *mut u8)>,
    pub move_construct: Option<unsafe fn(*mut u8, *mut u8)>,
    pub destruct: unsafe fn(*mut u8),
}

/// One entry in a `FieldsTrait` field table.
#[derive(Clone, Copy)]
pub struct FieldEntry {
    pub name: &'static str,
    pub type_id: crate::ReflectId,
    pub offset: usize,
}

/// Ordered field list with byte offsets, enough to visit every field of an
/// instance generically (used by the inspector and by copy-field-by-field
/// fallbacks when no whole-value copy constructor exists).
#[derive(Clone, Copy)]
pub struct FieldsTrait {
    pub fields: &'static [FieldEntry],
}

/// Homogeneous sequence trait (Vec-like container reflection).
#[derive(Clone, Copy)]
pub struct ArrayTrait {
    pub element_type: crate::ReflectId,
    pub len: unsafe fn(*const u8) -> usize,
    pub get: unsafe fn(*const u8, usize) -> *const u8,
    pub get_mut: unsafe fn(*mut u8, usize) -> *mut u8,
    pub push_default: unsafe fn(*mut u8),
    pub push_copy: unsafe fn(*mut u8, *const u8),
    pub push_move: unsafe fn(*mut u8, *mut u8),
    pub erase: unsafe fn(*mut u8, usize),
    pub insert_default: unsafe fn(*mut u8, usize),
}

/// Opaque iterator position into a dictionary container. Only the type that
/// produced it knows how to interpret the payload.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DictIter(pub usize);

/// Map-like container trait (HashMap-like reflection).
#[derive(Clone, Copy)]
pub struct DictionaryTrait {
    pub key_type: crate::ReflectId,
    pub value_type: crate::ReflectId,
    pub len: unsafe fn(*const u8) -> usize,
    pub iter_begin: unsafe fn(*const u8) -> Option<DictIter>,
    pub iter_advance: unsafe fn(*const u8, DictIter) -> Option<DictIter>,
    pub key_at: unsafe fn(*const u8, DictIter) -> *const u8,
    pub value_at: unsafe fn(*const u8, DictIter) -> *const u8,
    pub value_at_mut: unsafe fn(*mut u8, DictIter) -> *mut u8,
    pub find: unsafe fn(*const u8, *const u8) -> Option<DictIter>,
    pub insert_default: unsafe fn(*mut u8, *const u8),
    pub insert_copy: unsafe fn(*mut u8, *const u8, *const u8),
    pub insert_move: unsafe fn(*mut u8, *const u8, *mut u8),
    pub erase: unsafe fn(*mut u8, DictIter),
}

/// Conversion to/from a human-readable string; `from_string` reports failure
/// rather than panicking on malformed input (e.g. the inspector's text field).
#[derive(Clone, Copy)]
pub struct StringConversionTrait {
    pub to_string: unsafe fn(*const u8) -> String,
    pub from_string: unsafe fn(*mut u8, &str) -> bool,
}

/// Lets the inspector offer a "clear" action for optional-like values.
#[derive(Clone, Copy)]
pub struct NullableTrait {
    pub is_null: unsafe fn(*const u8) -> bool,
    pub set_null: unsafe fn(*mut u8),
}
