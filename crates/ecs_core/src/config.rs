/// Ambient, embedder-supplied knobs for a `World`.
#[derive(Clone, Copy, Debug)]
pub struct WorldConfig {
    /// Rows per page for the dense-table/relation-table paged allocators.
    pub pool_page_rows: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            pool_page_rows: 256,
        }
    }
}

/// Knobs for the schedule executor. `ScheduleRunner` currently always runs
/// stages sequentially (see its doc comment), so neither field changes
/// behavior yet; they stay on the config surface for the concurrent
/// dispatch path a safe per-system `World` split would enable.
#[derive(Clone, Copy, Debug)]
pub struct SchedulerConfig {
    /// Intended worker count for a future parallel path. `None` would defer
    /// to the ambient global thread pool's default (logical core count).
    pub worker_count: Option<usize>,
    /// When true, the executor never parallelizes even when the planner
    /// judges two nodes compatible; used by the unit test suite to keep
    /// assertions deterministic (§5).
    pub force_sequential: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: None,
            force_sequential: true,
        }
    }
}
