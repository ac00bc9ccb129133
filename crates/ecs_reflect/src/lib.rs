//! Runtime reflection for the ECS: type descriptors that let generic code move,
//! copy, inspect, and convert values whose concrete Rust type is erased.

pub mod descriptor;
pub mod error;
pub mod registry;
pub mod traits;

pub use descriptor::{Reflect, ReflectId, TypeDescriptor};
pub use error::ReflectError;
pub use registry::{descriptor, lookup, register};
pub use traits::{
    ArrayTrait, ConstructibleTrait, DictIter, DictionaryTrait, FieldEntry, FieldsTrait,
    NullableTrait, StringConversionTrait,
};
