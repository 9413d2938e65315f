//! CLI grammar, matrix expansion, and output formatting for the `bench`
//! binary, kept in a library crate so integration tests can drive it
//! directly rather than spawning a subprocess.

#![warn(missing_docs, rust_2018_idioms)]

pub mod args;
pub mod format;

use args::{parse_measure_csv, parse_nano_range_csv, parse_threads_csv, resolve_locks, ArgsError};
use clap::Parser;
use lockbench_driver::{benchmark, Calibration, Config, LockResult, NanoRange};
use lockbench_locks::LockKind;

/// `bench MEASURE THREADS LOCKED UNLOCKED [--locks LOCK_LIST]`
///
/// Each positional is a non-empty CSV of items; see [`args`] for the exact
/// grammar each one accepts.
#[derive(Parser, Debug)]
#[command(author, version, about = "Benchmarks userspace lock algorithms under controlled contention")]
pub struct Cli {
    /// CSV of measurement durations, each `<integer>(ns|us|ms|s)`. No ranges.
    pub measure: String,
    /// CSV of thread counts, each `<integer>` or `<lo>-<hi>` (inclusive).
    pub threads: String,
    /// CSV of in-critical-section work, each `<time>` or `<time>-<time>`.
    pub locked: String,
    /// CSV of outside-critical-section work, each `<time>` or `<time>-<time>`.
    pub unlocked: String,
    /// Restrict the run to these lock names (default: every kind available
    /// on this platform).
    #[arg(long, value_delimiter = ',')]
    pub locks: Option<Vec<String>>,
}

/// One resolved point in the benchmark matrix together with every selected
/// lock algorithm's result at that point.
#[derive(Debug, Clone)]
pub struct ConfigBlock {
    /// Wall-clock measurement window, in nanoseconds.
    pub measure_nanos: u64,
    /// Number of worker threads.
    pub threads: usize,
    /// In-critical-section work unit for this point.
    pub locked: NanoRange,
    /// Outside-critical-section work unit for this point.
    pub unlocked: NanoRange,
    /// One result per selected lock algorithm, in selection order.
    pub results: Vec<LockResult>,
}

/// Parses every positional and `--locks`, expanding the cartesian product
/// of (UNLOCKED x LOCKED x THREADS x MEASURE) into a flat list of
/// [`Config`]s, alongside the resolved set of lock kinds to run.
pub fn resolve(cli: &Cli) -> Result<(Vec<Config>, Vec<LockKind>), ArgsError> {
    let measures = parse_measure_csv(&cli.measure)?;
    let threads = parse_threads_csv(&cli.threads)?;
    let locked = parse_nano_range_csv(&cli.locked)?;
    let unlocked = parse_nano_range_csv(&cli.unlocked)?;
    let kinds = resolve_locks(cli.locks.as_deref())?;

    let mut configs = Vec::with_capacity(measures.len() * threads.len() * locked.len() * unlocked.len());
    for &unlocked in &unlocked {
        for &locked in &locked {
            for &num_threads in &threads {
                for &measure_nanos in &measures {
                    configs.push(Config { measure_nanos, num_threads, locked, unlocked });
                }
            }
        }
    }
    Ok((configs, kinds))
}

/// Runs every selected lock algorithm against every resolved [`Config`],
/// producing one [`ConfigBlock`] per point in the matrix.
pub fn run_matrix(configs: &[Config], kinds: &[LockKind], calibration: &Calibration) -> Vec<ConfigBlock> {
    configs
        .iter()
        .map(|config| {
            let results = kinds.iter().map(|&kind| benchmark(kind, config, calibration)).collect();
            ConfigBlock {
                measure_nanos: config.measure_nanos,
                threads: config.num_threads,
                locked: config.locked,
                unlocked: config.unlocked,
                results,
            }
        })
        .collect()
}

/// Parses `cli`, runs the full matrix, and prints every block to stdout in
/// the benchmark's reporting format.
pub fn run(cli: &Cli) -> Result<(), ArgsError> {
    let (configs, kinds) = resolve(cli)?;
    let calibration = Calibration::measure();
    for block in run_matrix(&configs, &kinds, &calibration) {
        format::print_config_header(block.measure_nanos, block.threads, block.locked, block.unlocked);
        for result in &block.results {
            format::print_result_row(result);
        }
        println!();
    }
    Ok(())
}
