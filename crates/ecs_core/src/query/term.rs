use crate::archetype::ColumnId;
use crate::entity::Entity;

/// How one end of a relation term is bound (§4.7).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// The entity the query iterates over.
    This,
    /// An unbound partner, discovered per matching row by enumerating the
    /// relation's rows rather than checked against a value already in hand.
    Any,
    /// A fixed entity, usable for terms like "related to this specific hub".
    Fixed(Entity),
}

/// One clause of a query: either a plain archetype membership check or a
/// relation traversal between `from` and `to`, each bound independently
/// (§4.7). At least one side is normally `Target::This`, anchoring the term
/// to the entity under test; the other side can be a fixed partner or
/// `Target::Any` to match (or, via `QueryState::pin_pairs`, enumerate) any
/// partner at all.
#[derive(Clone, Copy, Debug)]
pub enum Term {
    With(ColumnId),
    Without(ColumnId),
    Relation {
        relation: ColumnId,
        from: Target,
        to: Target,
    },
}

impl Term {
    pub fn column(&self) -> Option<ColumnId> {
        match self {
            Term::With(c) | Term::Without(c) => Some(*c),
            Term::Relation { relation, .. } => Some(*relation),
        }
    }
}
