use crate::config::SchedulerConfig;
use crate::planner::{Schedule, ScheduleNode, Stage};
use crate::system::SystemRegistry;
use crate::world::World;

/// Runs a built `Schedule` against a `World` and its `SystemRegistry`, one
/// node at a time, in the order the planner emitted them (§4.11).
///
/// Systems within a stage are guaranteed conflict-free by construction (the
/// planner serializes any two with overlapping access into separate stages),
/// so a truly parallel executor could run a stage's systems concurrently.
/// This executor always runs them sequentially regardless of
/// `SchedulerConfig`: a safe concurrent dispatch needs each system to borrow
/// only the slice of `World` its descriptor grants, which this crate does
/// not build (see `system/param.rs`, DESIGN.md). `SchedulerConfig.
/// worker_count`/`force_sequential` are kept on the type for forward
/// compatibility and are read but not yet acted on.
pub struct ScheduleRunner {
    #[allow(dead_code)]
    config: SchedulerConfig,
}

impl ScheduleRunner {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, schedule: &Schedule, registry: &mut SystemRegistry, world: &mut World) {
        for node in &schedule.nodes {
            match node {
                ScheduleNode::Stage(stage) => self.run_stage(stage, schedule, registry, world),
                ScheduleNode::Repeat {
                    condition, stages, ..
                } => loop {
                    for stage in stages {
                        self.run_stage(stage, schedule, registry, world);
                    }
                    if !condition(world) {
                        break;
                    }
                },
            }
        }
    }

    fn run_stage(
        &self,
        stage: &Stage,
        schedule: &Schedule,
        registry: &mut SystemRegistry,
        world: &mut World,
    ) {
        for &handle in stage {
            if schedule.should_run(handle, world) {
                registry.run(handle, world);
            }
        }
    }
}
