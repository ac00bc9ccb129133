pub mod param;
pub mod registry;

pub use param::{Res, ResMut, SystemParam};
pub use registry::{SystemDescriptor, SystemFn, SystemHandle, SystemRegistrationError, SystemRegistry};
