use crate::barrier::Barrier;
use crate::calibration::Calibration;
use crate::config::Config;
use crate::stats::LockResult;
use crate::work_unit::WorkUnit;
use crate::worker::{derive_seed, run_worker};
use lockbench_locks::{LockKind, RawLock};
use std::sync::Arc;
use std::time::Duration;

/// Runs one (lock algorithm, configuration) point of the benchmark matrix:
/// spawns `config.num_threads` workers, releases them together, sleeps for
/// `config.measure_nanos`, stops them together, and aggregates the results.
///
/// Dispatches on `kind` to a monomorphized call per concrete lock type
/// rather than going through `dyn RawLock`, so the per-algorithm fast paths
/// run exactly as they would standalone -- indirection here would skew the
/// very latencies this harness exists to measure.
pub fn benchmark(kind: LockKind, config: &Config, calibration: &Calibration) -> LockResult {
    match kind {
        LockKind::Spin => run_generic::<lockbench_locks::SpinLock>(config, calibration),
        LockKind::Ticket => run_generic::<lockbench_locks::TicketLock>(config, calibration),
        LockKind::Mcs => run_generic::<lockbench_locks::McsLock>(config, calibration),
        LockKind::Word => run_generic::<lockbench_locks::WordLock>(config, calibration),
        LockKind::Stack => run_generic::<lockbench_locks::StackLock>(config, calibration),
        LockKind::Futex => run_generic::<lockbench_locks::FutexLock>(config, calibration),
        LockKind::ParkingLot => run_generic::<lockbench_locks::ParkingLotLock>(config, calibration),
        #[cfg(target_os = "linux")]
        LockKind::Pi => run_generic::<lockbench_locks::PiLock>(config, calibration),
        #[cfg(not(target_os = "linux"))]
        LockKind::Pi => {
            unreachable!("LockKind::Pi is not available on this platform; the CLI must filter it out")
        }
        #[cfg(windows)]
        LockKind::KeyedEvent => run_generic::<lockbench_locks::KeyedEventLock>(config, calibration),
        #[cfg(not(windows))]
        LockKind::KeyedEvent => {
            unreachable!("LockKind::KeyedEvent is not available on this platform; the CLI must filter it out")
        }
    }
}

fn run_generic<R: RawLock>(config: &Config, calibration: &Calibration) -> LockResult {
    let lock = Arc::new(R::new());
    let barrier = Arc::new(Barrier::new());
    let unlocked = WorkUnit::from_nanos(calibration, config.unlocked);
    let locked = WorkUnit::from_nanos(calibration, config.locked);

    log::debug!(
        "spawning {} workers for {} (measure={}ns)",
        config.num_threads,
        R::name(),
        config.measure_nanos
    );

    let handles: Vec<_> = (0..config.num_threads)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let barrier = Arc::clone(&barrier);
            std::thread::Builder::new()
                .spawn(move || {
                    let seed = derive_seed(&*lock);
                    run_worker(&*lock, &barrier, unlocked, locked, seed)
                })
                .unwrap_or_else(|err| {
                    log::error!("failed to spawn worker thread: {err}");
                    panic!("thread spawn failure is fatal: {err}");
                })
        })
        .collect();

    barrier.start();
    std::thread::sleep(Duration::from_nanos(config.measure_nanos));
    barrier.stop();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| {
            handle.join().unwrap_or_else(|_| {
                log::error!("worker thread for {} panicked", R::name());
                panic!("worker thread panicked during {} benchmark", R::name());
            })
        })
        .collect();

    log::trace!("joined all workers for {}", R::name());
    LockResult::aggregate(R::name(), &results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work_unit::NanoRange;

    #[test]
    fn spin_lock_single_thread_has_zero_stdev() {
        let calibration = Calibration::measure();
        let config = Config {
            measure_nanos: 20_000_000,
            num_threads: 1,
            locked: NanoRange::Fixed(0),
            unlocked: NanoRange::Fixed(0),
        };
        let result = benchmark(LockKind::Spin, &config, &calibration);
        assert_eq!(result.stdev, 0.0);
        assert_eq!(result.min, result.max);
        assert_eq!(result.sum, result.min);
        assert!(result.sum > 0);
    }

    #[test]
    fn futex_lock_four_threads_merges_all_latency_streams() {
        let calibration = Calibration::measure();
        let config = Config {
            measure_nanos: 50_000_000,
            num_threads: 4,
            locked: NanoRange::Fixed(1_000),
            unlocked: NanoRange::Fixed(10),
        };
        let result = benchmark(LockKind::Futex, &config, &calibration);
        assert!(result.sum > 0);
        assert!(result.lat_p50_ns <= result.lat_p99_ns);
        assert!(result.mean > 0.0);
    }
}
