use thiserror::Error;

use crate::entity::Entity;
use crate::type_registry::TypeId;

/// Every fallible outcome the ECS core can produce. Construction-time failures
/// (registration, planner build) come back through `Result`; the propagation
/// policy for the rest is documented per-variant.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EcsError {
    #[error("entity {0:?} is not alive")]
    EntityNotAlive(Entity),

    #[error("entity {entity:?} has no component of type {type_id:?}")]
    ComponentMissing { entity: Entity, type_id: TypeId },

    #[error("type {0:?} was never registered")]
    TypeNotRegistered(TypeId),

    #[error("type {0:?} was used as the wrong kind (component/relation/resource mismatch)")]
    TypeKindMismatch(TypeId),

    #[error("inserting this tree relation would close a cycle")]
    RelationWouldCycle,

    #[error("entity already has an outgoing edge for this tree relation")]
    TreeRelationConflict,

    #[error("system declares conflicting reads/writes over the same resource or component")]
    QueryAccessConflict,

    #[error("the planner's ordering constraints contain a cycle")]
    OrderingCycle,

    #[error("a tag belongs to two repeating parents, neither an ancestor of the other")]
    MultipleRepeatParents,

    #[error("a buffered command targeted entity {0:?}, which died before commit")]
    CommandTargetDead(Entity),
}
