//! The entity-component-system core: entities, reflected components,
//! archetype-partitioned dense storage, sparse relations, queries, systems,
//! a tag-based planner, and a deferred command buffer.

pub mod archetype;
pub mod blueprint;
pub mod commands;
pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod observer;
pub mod planner;
pub mod pool;
pub mod query;
pub mod resource;
pub mod schedule;
pub mod system;
pub mod table;
pub mod type_registry;
pub mod world;

pub use blueprint::Blueprint;
pub use commands::{BlueprintInstantiation, CommandBuffer, PendingEntity};
pub use config::{SchedulerConfig, WorldConfig};
pub use entity::{Entity, EntityIndex, Generation};
pub use error::EcsError;
pub use event::Events;
pub use observer::ObserverRegistry;
pub use planner::{ConditionFn, PlannerBuilder, Schedule, ScheduleNode, Stage, TagId, TagKind};
pub use query::{AccessSet, QueryState, Target, Term};
pub use resource::Resources;
pub use schedule::ScheduleRunner;
pub use system::{Res, ResMut, SystemDescriptor, SystemHandle, SystemParam, SystemRegistrationError, SystemRegistry};
pub use type_registry::{registry, RelationFlags, TypeId, TypeKind};
pub use world::World;

pub use ecs_reflect::{Reflect, ReflectId, TypeDescriptor};
