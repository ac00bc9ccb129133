use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::EcsError;
use crate::system::{SystemDescriptor, SystemHandle};
use crate::world::World;

/// A predicate evaluated against the live world, used to gate `only_if` tags
/// and to decide whether a `repeat_while` tag's subtree runs again. Stored as
/// an `Arc` (matching `observer.rs`'s `ObserverFn`) so `PlannerBuilder::build`
/// can hand out clones without consuming the builder.
pub type ConditionFn = Arc<dyn Fn(&World) -> bool + Send + Sync>;

/// A tag groups systems for ordering purposes. `Leaf` tags carry no further
/// structure; `Grouping` tags stand in for every tag/system nested under
/// them, so a constraint on the group applies to all its members; `Repeating`
/// tags mark a subgraph meant to be scheduled as a unit under a single
/// enclosing group, and it is an error for one to be reachable from two
/// unrelated repeating ancestors (§4.11).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TagKind {
    Leaf,
    Repeating,
    Grouping,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TagId(u32);

struct TagNode {
    kind: TagKind,
    parent: Option<TagId>,
}

/// One executable stage of the built schedule: every system in it has no
/// remaining ordering dependency on anything not yet run, and none of them
/// conflict with each other over component/resource access.
pub type Stage = Vec<SystemHandle>;

/// One unit of a built schedule: either a plain stage run once, or a
/// `Repeating`-tagged subtree run as a block, looping its stages while its
/// `repeat_while` condition holds (defaulting to a single pass if the tag
/// never had one registered).
pub enum ScheduleNode {
    Stage(Stage),
    Repeat {
        tag: TagId,
        condition: ConditionFn,
        stages: Vec<Stage>,
    },
}

pub struct Schedule {
    pub nodes: Vec<ScheduleNode>,
    gates: HashMap<SystemHandle, Vec<ConditionFn>>,
}

impl Schedule {
    /// Whether `handle`'s `only_if` gates (if any) all currently hold.
    /// Ungated systems always run.
    pub(crate) fn should_run(&self, handle: SystemHandle, world: &World) -> bool {
        self.gates
            .get(&handle)
            .map(|conds| conds.iter().all(|cond| cond(world)))
            .unwrap_or(true)
    }
}

/// Accumulates tags, per-system tag membership, and before/after constraints,
/// then builds an ordered `Schedule` via the same five-phase process the
/// original engine's planner used: collapse nested groups into direct
/// membership, expand repeating tags and check for conflicting repeat
/// parents, translate tag-level ordering into system-level edges, emit nodes
/// in topological layers, and reject leftover cycles (§4.11).
pub struct PlannerBuilder {
    tags: Vec<TagNode>,
    tag_names: HashMap<String, TagId>,
    system_tags: HashMap<SystemHandle, Vec<TagId>>,
    before: Vec<(TagId, TagId)>,
    after: Vec<(TagId, TagId)>,
    only_if: HashMap<TagId, ConditionFn>,
    repeat_while: HashMap<TagId, ConditionFn>,
}

impl PlannerBuilder {
    pub fn new() -> Self {
        Self {
            tags: Vec::new(),
            tag_names: HashMap::new(),
            system_tags: HashMap::new(),
            before: Vec::new(),
            after: Vec::new(),
            only_if: HashMap::new(),
            repeat_while: HashMap::new(),
        }
    }

    /// Gates every system under `tag` on `condition`: a system that carries
    /// `tag` (directly or through a grouping ancestor) is skipped for a given
    /// `ScheduleRunner::run` pass when `condition` is false. Does not affect
    /// ordering; a gated-off system still occupies its planned stage, it
    /// simply isn't invoked this pass.
    pub fn only_if(&mut self, tag: TagId, condition: ConditionFn) {
        self.only_if.insert(tag, condition);
    }

    /// Registers the loop condition for a `Repeating` tag's subtree: its
    /// stages run at least once, then again each time `condition` still
    /// holds after the previous pass. A `Repeating` tag with no registered
    /// condition runs its subtree exactly once.
    pub fn repeat_while(&mut self, tag: TagId, condition: ConditionFn) {
        debug_assert_eq!(
            self.tags[tag.0 as usize].kind,
            TagKind::Repeating,
            "repeat_while only applies to a Repeating tag"
        );
        self.repeat_while.insert(tag, condition);
    }

    pub fn tag(&mut self, name: impl Into<String>, kind: TagKind, parent: Option<TagId>) -> TagId {
        let name = name.into();
        if let Some(&id) = self.tag_names.get(&name) {
            return id;
        }
        let id = TagId(self.tags.len() as u32);
        self.tags.push(TagNode { kind, parent });
        self.tag_names.insert(name, id);
        id
    }

    pub fn add_system(&mut self, system: SystemHandle, tags: Vec<TagId>) {
        self.system_tags.entry(system).or_default().extend(tags);
    }

    pub fn before(&mut self, a: TagId, b: TagId) {
        self.before.push((a, b));
    }

    pub fn after(&mut self, a: TagId, b: TagId) {
        self.after.push((a, b));
    }

    fn ancestors(&self, tag: TagId) -> Vec<TagId> {
        let mut out = Vec::new();
        let mut cur = Some(tag);
        while let Some(t) = cur {
            out.push(t);
            cur = self.tags[t.0 as usize].parent;
        }
        out
    }

    /// For every repeating tag reachable from a system, finds its nearest
    /// enclosing repeating ancestor (if any) and checks all of a system's
    /// repeating tags resolve to ancestor-related chains, not two unrelated
    /// ones.
    fn check_repeat_parents(&self) -> Result<(), EcsError> {
        for tags in self.system_tags.values() {
            let mut repeating_chains: Vec<HashSet<TagId>> = Vec::new();
            for &tag in tags {
                let chain: HashSet<TagId> = self
                    .ancestors(tag)
                    .into_iter()
                    .filter(|t| self.tags[t.0 as usize].kind == TagKind::Repeating)
                    .collect();
                if chain.is_empty() {
                    continue;
                }
                let related = repeating_chains
                    .iter()
                    .any(|existing| !existing.is_disjoint(&chain));
                if !related && !repeating_chains.is_empty() {
                    return Err(EcsError::MultipleRepeatParents);
                }
                repeating_chains.push(chain);
            }
        }
        Ok(())
    }

    /// Phase 1 (collapse) + phase 2 (expand): resolves each system's direct
    /// and inherited tag set into a flat list of every tag whose constraints
    /// bind it, walking grouping parents upward.
    fn collapse_and_expand(&self) -> HashMap<SystemHandle, HashSet<TagId>> {
        let mut resolved = HashMap::new();
        for (&system, tags) in &self.system_tags {
            let mut set = HashSet::new();
            for &tag in tags {
                for ancestor in self.ancestors(tag) {
                    set.insert(ancestor);
                }
            }
            resolved.insert(system, set);
        }
        resolved
    }

    /// Phase 3 (direct-ordering): expands tag-level before/after constraints
    /// into system-level edges by taking the cross product of each tag's
    /// resolved membership.
    fn direct_ordering(
        &self,
        resolved: &HashMap<SystemHandle, HashSet<TagId>>,
    ) -> Vec<(SystemHandle, SystemHandle)> {
        let members_of = |tag: TagId| -> Vec<SystemHandle> {
            resolved
                .iter()
                .filter(|(_, tags)| tags.contains(&tag))
                .map(|(&s, _)| s)
                .collect()
        };

        let mut edges = Vec::new();
        for &(a, b) in &self.before {
            for &sa in &members_of(a) {
                for &sb in &members_of(b) {
                    if sa != sb {
                        edges.push((sa, sb));
                    }
                }
            }
        }
        for &(a, b) in &self.after {
            for &sa in &members_of(a) {
                for &sb in &members_of(b) {
                    if sa != sb {
                        edges.push((sb, sa));
                    }
                }
            }
        }
        edges
    }

    /// The outermost `Repeating` tag among `resolved`, if any, i.e. the one
    /// with no other member of `resolved` as an ancestor. `check_repeat_parents`
    /// has already ruled out two unrelated repeating ancestors, so within a
    /// single chain this is simply the one closest to the root; repeating
    /// tags nested inside another repeating tag are grouped under the outer
    /// one rather than forming their own separately-looped subtree.
    fn outer_repeat_tag(&self, resolved: &HashSet<TagId>) -> Option<TagId> {
        let repeating: HashSet<TagId> = resolved
            .iter()
            .copied()
            .filter(|t| self.tags[t.0 as usize].kind == TagKind::Repeating)
            .collect();
        repeating.iter().copied().find(|&t| {
            self.ancestors(t)
                .into_iter()
                .skip(1)
                .all(|a| !repeating.contains(&a))
        })
    }

    /// Phases 4 and 5 (emit-nodes, cycle-check) restricted to one group of
    /// systems: Kahn's algorithm over `edges` (filtered to pairs within this
    /// group) plus an implicit edge (in registration order) between any two
    /// of `systems` whose declared access conflicts, so that systems sharing
    /// a stage are always safe to run without synchronizing with each other.
    /// Leftover unordered nodes after the sort mean the explicit constraints
    /// contain a cycle.
    fn build_stage_list(
        &self,
        systems: &[(SystemHandle, SystemDescriptor)],
        edges: &[(SystemHandle, SystemHandle)],
    ) -> Result<Vec<Stage>, EcsError> {
        let members: HashSet<SystemHandle> = systems.iter().map(|(h, _)| *h).collect();
        let mut edges: Vec<(SystemHandle, SystemHandle)> = edges
            .iter()
            .copied()
            .filter(|(a, b)| members.contains(a) && members.contains(b))
            .collect();

        for (i, (handle_a, desc_a)) in systems.iter().enumerate() {
            for (handle_b, desc_b) in &systems[i + 1..] {
                if desc_a.conflicts_with(desc_b) {
                    edges.push((*handle_a, *handle_b));
                }
            }
        }

        let handles: Vec<SystemHandle> = systems.iter().map(|(h, _)| *h).collect();
        let mut indegree: HashMap<SystemHandle, usize> = handles.iter().map(|&h| (h, 0)).collect();
        let mut successors: HashMap<SystemHandle, Vec<SystemHandle>> =
            handles.iter().map(|&h| (h, Vec::new())).collect();
        for (a, b) in &edges {
            successors.entry(*a).or_default().push(*b);
            *indegree.entry(*b).or_insert(0) += 1;
        }

        let mut stages = Vec::new();
        let mut remaining: HashSet<SystemHandle> = handles.iter().copied().collect();
        while !remaining.is_empty() {
            let mut ready: Vec<SystemHandle> = remaining
                .iter()
                .copied()
                .filter(|h| indegree.get(h).copied().unwrap_or(0) == 0)
                .collect();
            if ready.is_empty() {
                return Err(EcsError::OrderingCycle);
            }
            ready.sort_by_key(|h| h.index());
            for &h in &ready {
                remaining.remove(&h);
                if let Some(succs) = successors.get(&h) {
                    for &s in succs {
                        if let Some(d) = indegree.get_mut(&s) {
                            *d = d.saturating_sub(1);
                        }
                    }
                }
            }
            stages.push(ready);
        }

        Ok(stages)
    }

    /// Builds the full schedule: partitions `systems` by their outermost
    /// `Repeating` tag (none, for most systems), schedules each partition
    /// independently via `build_stage_list`, and records each `only_if`
    /// gate. Explicit `before`/`after` constraints that reach across a
    /// partition boundary (from outside a repeating subtree to inside it, or
    /// vice versa) are not applied; only constraints between members of the
    /// same partition take effect.
    pub fn build(
        &self,
        systems: &[(SystemHandle, SystemDescriptor)],
    ) -> Result<Schedule, EcsError> {
        self.check_repeat_parents()?;
        let resolved = self.collapse_and_expand();
        let edges = self.direct_ordering(&resolved);

        let mut groups: HashMap<Option<TagId>, Vec<(SystemHandle, SystemDescriptor)>> =
            HashMap::new();
        for (handle, desc) in systems {
            let tags = resolved.get(handle).cloned().unwrap_or_default();
            groups
                .entry(self.outer_repeat_tag(&tags))
                .or_default()
                .push((*handle, desc.clone()));
        }

        let mut nodes = Vec::new();
        if let Some(top_level) = groups.remove(&None) {
            for stage in self.build_stage_list(&top_level, &edges)? {
                nodes.push(ScheduleNode::Stage(stage));
            }
        }

        let mut repeat_tags: Vec<TagId> = groups.keys().filter_map(|k| *k).collect();
        repeat_tags.sort_by_key(|t| t.0);
        for tag in repeat_tags {
            let members = groups
                .remove(&Some(tag))
                .expect("tag was just collected from groups' own keys");
            let stages = self.build_stage_list(&members, &edges)?;
            let condition = self
                .repeat_while
                .get(&tag)
                .cloned()
                .unwrap_or_else(|| Arc::new(|_: &World| false) as ConditionFn);
            nodes.push(ScheduleNode::Repeat {
                tag,
                condition,
                stages,
            });
        }

        let mut gates: HashMap<SystemHandle, Vec<ConditionFn>> = HashMap::new();
        for (handle, _) in systems {
            let tags = resolved.get(handle).cloned().unwrap_or_default();
            let conditions: Vec<ConditionFn> = tags
                .iter()
                .filter_map(|tag| self.only_if.get(tag).cloned())
                .collect();
            if !conditions.is_empty() {
                gates.insert(*handle, conditions);
            }
        }

        Ok(Schedule { nodes, gates })
    }
}

impl Default for PlannerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::ColumnId;
    use crate::config::WorldConfig;

    fn col(n: u32) -> ColumnId {
        ColumnId::component(n)
    }

    fn top_level_stages(schedule: &Schedule) -> Vec<&Stage> {
        schedule
            .nodes
            .iter()
            .filter_map(|node| match node {
                ScheduleNode::Stage(stage) => Some(stage),
                ScheduleNode::Repeat { .. } => None,
            })
            .collect()
    }

    #[test]
    fn independent_systems_land_in_one_stage() {
        let builder = PlannerBuilder::new();
        let systems = vec![
            (SystemHandle::new_for_test(0), SystemDescriptor::new("a").writes([col(1)])),
            (SystemHandle::new_for_test(1), SystemDescriptor::new("b").writes([col(2)])),
        ];
        let schedule = builder.build(&systems).unwrap();
        let stages = top_level_stages(&schedule);
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].len(), 2);
    }

    #[test]
    fn conflicting_systems_are_serialized() {
        let builder = PlannerBuilder::new();
        let systems = vec![
            (SystemHandle::new_for_test(0), SystemDescriptor::new("a").writes([col(1)])),
            (SystemHandle::new_for_test(1), SystemDescriptor::new("b").writes([col(1)])),
        ];
        let schedule = builder.build(&systems).unwrap();
        assert_eq!(top_level_stages(&schedule).len(), 2);
    }

    #[test]
    fn before_after_cycle_is_rejected() {
        let mut builder = PlannerBuilder::new();
        let tag_a = builder.tag("a", TagKind::Leaf, None);
        let tag_b = builder.tag("b", TagKind::Leaf, None);
        let sys_a = SystemHandle::new_for_test(0);
        let sys_b = SystemHandle::new_for_test(1);
        builder.add_system(sys_a, vec![tag_a]);
        builder.add_system(sys_b, vec![tag_b]);
        builder.before(tag_a, tag_b);
        builder.before(tag_b, tag_a);

        let systems = vec![
            (sys_a, SystemDescriptor::new("a").writes([col(1)])),
            (sys_b, SystemDescriptor::new("b").writes([col(2)])),
        ];
        assert_eq!(builder.build(&systems), Err(EcsError::OrderingCycle));
    }

    #[test]
    fn repeating_tag_is_split_into_its_own_schedule_node() {
        let mut builder = PlannerBuilder::new();
        let settle = builder.tag("settle", TagKind::Repeating, None);
        let sys_a = SystemHandle::new_for_test(0);
        let sys_b = SystemHandle::new_for_test(1);
        builder.add_system(sys_a, vec![settle]);
        builder.repeat_while(settle, Arc::new(|_: &World| false));

        let systems = vec![
            (sys_a, SystemDescriptor::new("a").writes([col(1)])),
            (sys_b, SystemDescriptor::new("b").writes([col(2)])),
        ];
        let schedule = builder.build(&systems).unwrap();

        assert_eq!(top_level_stages(&schedule).len(), 1);
        let repeat = schedule
            .nodes
            .iter()
            .find_map(|node| match node {
                ScheduleNode::Repeat { tag, stages, .. } if *tag == settle => Some(stages),
                _ => None,
            })
            .expect("settle tag produced a Repeat node");
        assert_eq!(repeat.len(), 1);
        assert_eq!(repeat[0], vec![sys_a]);
    }

    #[test]
    fn only_if_gate_reports_as_unsatisfied_when_condition_is_false() {
        let mut builder = PlannerBuilder::new();
        let disabled = builder.tag("disabled", TagKind::Leaf, None);
        let sys_a = SystemHandle::new_for_test(0);
        builder.add_system(sys_a, vec![disabled]);
        builder.only_if(disabled, Arc::new(|_: &World| false));

        let systems = vec![(sys_a, SystemDescriptor::new("a").writes([col(1)]))];
        let schedule = builder.build(&systems).unwrap();
        let world = World::new(WorldConfig::default());
        assert!(!schedule.should_run(sys_a, &world));
    }
}
