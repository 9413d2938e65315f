use crate::work_unit::NanoRange;

/// One fully-resolved point in the benchmark matrix: a single measurement
/// duration, thread count, and LOCKED/UNLOCKED work-unit spec, as produced
/// by expanding the CLI's cartesian product of CSV/range arguments.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Wall-clock measurement window, in nanoseconds.
    pub measure_nanos: u64,
    /// Number of worker threads to spawn.
    pub num_threads: usize,
    /// Simulated work performed inside the critical section.
    pub locked: NanoRange,
    /// Simulated work performed outside the critical section.
    pub unlocked: NanoRange,
}
