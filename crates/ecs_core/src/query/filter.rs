use std::collections::HashSet;

use crate::archetype::{ArchetypeId, ColumnId};
use crate::entity::Entity;
use crate::world::World;

use super::term::{Target, Term};

/// Read/write column sets a query or system declares up front, used by the
/// planner and by ad hoc conflict checks (§4.7, §5).
#[derive(Clone, Debug, Default)]
pub struct AccessSet {
    pub reads: Vec<ColumnId>,
    pub writes: Vec<ColumnId>,
}

impl AccessSet {
    pub fn conflicts_with(&self, other: &AccessSet) -> bool {
        let self_writes: HashSet<_> = self.writes.iter().collect();
        let other_writes: HashSet<_> = other.writes.iter().collect();
        let self_reads: HashSet<_> = self.reads.iter().collect();
        let other_reads: HashSet<_> = other.reads.iter().collect();
        !self_writes.is_disjoint(&other_writes)
            || !self_writes.is_disjoint(&other_reads)
            || !other_writes.is_disjoint(&self_reads)
    }
}

/// A term list compiled into an incrementally-updated set of matching
/// archetypes. `cursor` records how far into the archetype graph this query
/// has already scanned, mirroring the original engine's
/// `archetypeGraph().collect()` pattern: archetypes created after
/// construction are picked up on the next `refresh` without re-checking ones
/// already seen (§4.3, §4.7).
pub struct QueryState {
    terms: Vec<Term>,
    matching: Vec<ArchetypeId>,
    cursor: usize,
}

impl QueryState {
    pub fn new(terms: Vec<Term>) -> Self {
        Self {
            terms,
            matching: Vec::new(),
            cursor: 0,
        }
    }

    /// Declared access: every `With`/`Relation` term is a read of that column.
    /// Callers that also mutate components fetched from the result should
    /// widen this with their own writes before handing it to the planner.
    pub fn access(&self) -> AccessSet {
        let mut access = AccessSet::default();
        for term in &self.terms {
            match term {
                Term::With(c) => access.reads.push(*c),
                Term::Without(_) => {}
                Term::Relation { relation, .. } => access.reads.push(*relation),
            }
        }
        access
    }

    /// Archetype-level filter: `With`/`Without` only. Relations live in
    /// `World`'s sparse tables, never as archetype columns, so a `Relation`
    /// term can't narrow the archetype scan; it's checked per-entity in
    /// `satisfies_relations` once `pin` has a concrete entity to test.
    fn matches(&self, world: &World, archetype: ArchetypeId) -> bool {
        self.terms.iter().all(|term| match term {
            Term::With(c) => world.archetypes().contains(archetype, *c),
            Term::Without(c) => !world.archetypes().contains(archetype, *c),
            Term::Relation { .. } => true,
        })
    }

    fn satisfies_relations(&self, world: &World, entity: Entity) -> bool {
        self.terms.iter().all(|term| match term {
            Term::With(_) | Term::Without(_) => true,
            Term::Relation { relation, from, to } => {
                Self::relation_term_holds(world, relation.type_id, entity, *from, *to)
            }
        })
    }

    /// Evaluates one `Relation` term against `entity`, the query's anchor.
    /// `Target::Any` is checked for mere existence here; `pin_pairs` is the
    /// entry point that actually binds it to concrete partner entities.
    fn relation_term_holds(
        world: &World,
        type_id: crate::type_registry::TypeId,
        entity: Entity,
        from: Target,
        to: Target,
    ) -> bool {
        match (from, to) {
            (Target::This, Target::Fixed(to)) => world.relation_to(type_id, entity, to),
            (Target::Fixed(from), Target::This) => world.relation_to(type_id, from, entity),
            (Target::This, Target::This) => world.relation_to(type_id, entity, entity),
            (Target::This, Target::Any) => world.relation_has_from(type_id, entity),
            (Target::Any, Target::This) => world.relation_has_to(type_id, entity),
            (Target::Fixed(from), Target::Fixed(to)) => world.relation_to(type_id, from, to),
            (Target::Any, Target::Fixed(_))
            | (Target::Fixed(_), Target::Any)
            | (Target::Any, Target::Any) => false,
        }
    }

    /// Rescans the archetype graph for archetypes interned since the last
    /// call and folds any that satisfy every term into the cached matching
    /// set. The base of the scan is the empty archetype, i.e. every
    /// archetype; narrower bases (e.g. the first `With` column) are a
    /// possible future optimization, not a correctness requirement.
    pub fn refresh(&mut self, world: &World) {
        let base = world.archetypes().empty();
        let mut discovered = Vec::new();
        self.cursor = world.archetypes().collect(base, &mut discovered, self.cursor);
        for archetype in discovered {
            if self.matches(world, archetype) {
                self.matching.push(archetype);
            }
        }
    }

    pub fn matching_archetypes(&self) -> &[ArchetypeId] {
        &self.matching
    }

    /// Refreshes and returns a snapshot of matching entities. Snapshotting
    /// ("pinning") means structural changes made while iterating this result
    /// don't invalidate it mid-loop; it simply won't see brand new entities
    /// until the next `pin` call (§4.7).
    pub fn pin(&mut self, world: &World) -> Vec<Entity> {
        self.refresh(world);
        let mut out = Vec::new();
        for &archetype in &self.matching {
            if let Some(table) = world.table(archetype) {
                for row in 0..table.size() {
                    let entity = table.entity(row);
                    if self.satisfies_relations(world, entity) {
                        out.push(entity);
                    }
                }
            }
        }
        out
    }

    /// Like `pin`, but for queries that need to actually bind a free
    /// (`Target::Any`) relation partner rather than merely check that one
    /// exists. Returns one `(anchor, partner)` pair per matching edge; an
    /// entity with multiple partners appears once per edge, mirroring the
    /// sparse relation table's own one-row-per-edge layout. Terms with no
    /// `Target::Any` side are evaluated exactly as in `pin` and don't expand
    /// the result.
    pub fn pin_pairs(&mut self, world: &World) -> Vec<(Entity, Entity)> {
        self.refresh(world);
        let mut out = Vec::new();
        for &archetype in &self.matching {
            let Some(table) = world.table(archetype) else {
                continue;
            };
            for row in 0..table.size() {
                let entity = table.entity(row);
                self.expand_pairs(world, entity, &mut out);
            }
        }
        out
    }

    fn expand_pairs(&self, world: &World, entity: Entity, out: &mut Vec<(Entity, Entity)>) {
        let mut partners: Option<Vec<Entity>> = None;
        for term in &self.terms {
            let Term::Relation { relation, from, to } = term else {
                continue;
            };
            match (from, to) {
                (Target::This, Target::Any) => {
                    let found = world.relation_partners_from(relation.type_id, entity);
                    if found.is_empty() {
                        return;
                    }
                    partners = Some(found);
                }
                (Target::Any, Target::This) => {
                    let found = world.relation_partners_to(relation.type_id, entity);
                    if found.is_empty() {
                        return;
                    }
                    partners = Some(found);
                }
                _ => {
                    if !Self::relation_term_holds(world, relation.type_id, entity, *from, *to) {
                        return;
                    }
                }
            }
        }
        match partners {
            Some(found) => out.extend(found.into_iter().map(|partner| (entity, partner))),
            None => out.push((entity, entity)),
        }
    }
}
