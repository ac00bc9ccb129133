//! External interfaces for a running ECS world: the reflection wire
//! protocol, for inspecting types and entities remotely, and the debugger
//! control channel, for pausing/stepping a simulation from a separate
//! process (§6).

pub mod debugger;
pub mod error;
pub mod wire;

pub use debugger::{DebuggerCommand, DebuggerSession, RunState};
pub use error::NetError;
pub use wire::{snapshot_entity, ComponentSnapshot, EntitySnapshot, FieldInfo, TypeInfo, TypeRequest, TypeResponse};
