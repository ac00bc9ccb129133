use std::collections::HashMap;

use crate::type_registry::TypeId;

/// Pairs a data type id with a small tag. Components always use tag 0; the
/// tag is reserved for future per-slot columns (see GLOSSARY).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ColumnId {
    pub type_id: TypeId,
    pub tag: u16,
}

impl ColumnId {
    pub fn component(type_id: TypeId) -> Self {
        Self { type_id, tag: 0 }
    }
}

pub type ArchetypeId = u32;

#[derive(Clone, Debug)]
pub struct Archetype {
    pub id: ArchetypeId,
    /// Sorted, deduplicated column set. Sortedness gives archetypes a
    /// canonical form for interning and lets `first`/`next` walk columns in a
    /// stable order.
    pub columns: Vec<ColumnId>,
}

impl Archetype {
    fn contains(&self, c: ColumnId) -> bool {
        self.columns.binary_search(&c).is_ok()
    }
}

/// Interns column sets into archetype ids and caches the add/remove-column
/// edges between them, mirroring the original engine's archetype graph
/// (`archetypeGraph().collect()` in `query/filter.cpp`).
pub struct ArchetypeGraph {
    interned: HashMap<Vec<ColumnId>, ArchetypeId>,
    archetypes: Vec<Archetype>,
    edges_with: HashMap<(ArchetypeId, ColumnId), ArchetypeId>,
    edges_without: HashMap<(ArchetypeId, ColumnId), ArchetypeId>,
}

impl Default for ArchetypeGraph {
    fn default() -> Self {
        let mut graph = Self {
            interned: HashMap::new(),
            archetypes: Vec::new(),
            edges_with: HashMap::new(),
            edges_without: HashMap::new(),
        };
        graph.intern(Vec::new());
        graph
    }
}

impl ArchetypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty(&self) -> ArchetypeId {
        0
    }

    fn intern(&mut self, mut columns: Vec<ColumnId>) -> ArchetypeId {
        columns.sort_unstable();
        columns.dedup();
        if let Some(&id) = self.interned.get(&columns) {
            return id;
        }
        let id = self.archetypes.len() as ArchetypeId;
        self.interned.insert(columns.clone(), id);
        self.archetypes.push(Archetype { id, columns });
        id
    }

    pub fn archetype(&self, id: ArchetypeId) -> &Archetype {
        &self.archetypes[id as usize]
    }

    pub fn contains(&self, a: ArchetypeId, c: ColumnId) -> bool {
        self.archetype(a).contains(c)
    }

    pub fn with(&mut self, a: ArchetypeId, c: ColumnId) -> ArchetypeId {
        if self.contains(a, c) {
            return a;
        }
        if let Some(&cached) = self.edges_with.get(&(a, c)) {
            return cached;
        }
        let mut columns = self.archetype(a).columns.clone();
        columns.push(c);
        let result = self.intern(columns);
        self.edges_with.insert((a, c), result);
        self.edges_without.insert((result, c), a);
        result
    }

    pub fn without(&mut self, a: ArchetypeId, c: ColumnId) -> ArchetypeId {
        if !self.contains(a, c) {
            return a;
        }
        if let Some(&cached) = self.edges_without.get(&(a, c)) {
            return cached;
        }
        let mut columns = self.archetype(a).columns.clone();
        columns.retain(|&x| x != c);
        let result = self.intern(columns);
        self.edges_without.insert((a, c), result);
        self.edges_with.insert((result, c), a);
        result
    }

    pub fn first(&self, a: ArchetypeId) -> Option<ColumnId> {
        self.archetype(a).columns.first().copied()
    }

    pub fn next(&self, a: ArchetypeId, after: ColumnId) -> Option<ColumnId> {
        let columns = &self.archetype(a).columns;
        let pos = columns.binary_search(&after).ok()?;
        columns.get(pos + 1).copied()
    }

    /// Appends every archetype that is a superset of `base`'s column set and
    /// was interned at or after cursor `seen`, returning the new cursor. Lets
    /// a live query incrementally discover archetypes created after it began
    /// iterating without ever re-reporting one (§4.3).
    pub fn collect(&self, base: ArchetypeId, out: &mut Vec<ArchetypeId>, seen: usize) -> usize {
        let base_columns = &self.archetype(base).columns;
        for archetype in &self.archetypes[seen.min(self.archetypes.len())..] {
            if base_columns
                .iter()
                .all(|c| archetype.columns.binary_search(c).is_ok())
            {
                out.push(archetype.id);
            }
        }
        self.archetypes.len()
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }
}
