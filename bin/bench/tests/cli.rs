use bench::args::ArgsError;
use bench::{resolve, run_matrix, Cli};
use lockbench_driver::Calibration;

fn cli(measure: &str, threads: &str, locked: &str, unlocked: &str, locks: Option<&[&str]>) -> Cli {
    Cli {
        measure: measure.to_string(),
        threads: threads.to_string(),
        locked: locked.to_string(),
        unlocked: unlocked.to_string(),
        locks: locks.map(|names| names.iter().map(|s| s.to_string()).collect()),
    }
}

#[test]
fn e1_single_thread_spin_has_zero_spread() {
    let cli = cli("100ms", "1", "0ns", "0ns", Some(&["spin"]));
    let (configs, kinds) = resolve(&cli).expect("valid grammar");
    assert_eq!(configs.len(), 1);
    let calibration = Calibration::measure();
    let blocks = run_matrix(&configs, &kinds, &calibration);
    assert_eq!(blocks.len(), 1);
    let result = &blocks[0].results[0];
    assert_eq!(result.stdev, 0.0);
    assert_eq!(result.min, result.max);
    assert_eq!(result.sum, result.min);
    assert_eq!(result.mean, result.min as f64);
}

#[test]
fn e2_four_threads_futex_merges_latency_streams() {
    let cli = cli("500ms", "4", "1us", "10ns", Some(&["futex_3state"]));
    let (configs, kinds) = resolve(&cli).expect("valid grammar");
    let calibration = Calibration::measure();
    let blocks = run_matrix(&configs, &kinds, &calibration);
    let result = &blocks[0].results[0];
    assert!((result.mean - result.sum as f64 / 4.0).abs() < f64::EPSILON);
    assert!(result.lat_p50_ns <= result.lat_p99_ns);
    assert!(result.sum > 0);
    assert!(result.mean > 0.0);
}

#[test]
fn e3_thread_range_produces_one_block_per_thread_count() {
    let cli = cli("1s", "2-3", "100ns-500ns", "100ns", Some(&["word_lock"]));
    let (configs, kinds) = resolve(&cli).expect("valid grammar");
    assert_eq!(configs.len(), 2);
    let calibration = Calibration::measure();
    let blocks = run_matrix(&configs, &kinds, &calibration);
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].threads, 2);
    assert_eq!(blocks[1].threads, 3);
    for block in &blocks {
        assert_eq!(block.results.len(), kinds.len());
    }
}

#[test]
fn e4_measure_missing_unit_is_an_error() {
    let cli = cli("1", "1", "1ns", "1ns", None);
    assert!(matches!(resolve(&cli), Err(ArgsError::InvalidTime(_))));
}

#[test]
fn e5_inverted_thread_range_is_an_error() {
    let cli = cli("1s", "5-3", "1us", "1us", None);
    assert!(matches!(resolve(&cli), Err(ArgsError::InvertedThreadRange(_))));
}

#[test]
fn e6_mcs_fifo_stamps_are_strictly_increasing() {
    use lockbench_locks::RawLock;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Barrier, Mutex};

    let lock = Arc::new(lockbench_locks::McsLock::new());
    let stamp = Arc::new(AtomicU64::new(0));
    let observed = Arc::new(Mutex::new(Vec::new()));
    let start = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let stamp = Arc::clone(&stamp);
            let observed = Arc::clone(&observed);
            let start = Arc::clone(&start);
            std::thread::spawn(move || {
                start.wait();
                lock.lock();
                let mine = stamp.fetch_add(1, Ordering::SeqCst);
                observed.lock().unwrap().push(mine);
                unsafe { lock.unlock() };
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    // `observed` is in acquisition order (each thread pushes while still
    // holding the MCS lock), so asserting monotonicity here -- without
    // sorting first -- is what actually demonstrates FIFO order. Sorting
    // would make this pass for any 8 distinct stamps regardless of the
    // order they were acquired in.
    let stamps = observed.lock().unwrap().clone();
    assert_eq!(stamps.len(), 8);
    for window in stamps.windows(2) {
        assert!(window[0] < window[1]);
    }
}

#[test]
fn driver_output_invariants_hold_across_a_small_matrix() {
    let cli = cli("50ms", "1,2", "0ns-50ns", "0ns-50ns", Some(&["ticket", "mcs"]));
    let (configs, kinds) = resolve(&cli).expect("valid grammar");
    let calibration = Calibration::measure();
    for block in run_matrix(&configs, &kinds, &calibration) {
        for result in &block.results {
            assert!(result.min as f64 <= result.mean && result.mean <= result.max as f64);
            assert!(result.lat_p50_ns <= result.lat_p99_ns);
            if block.threads == 1 {
                assert_eq!(result.stdev, 0.0);
            }
        }
    }
}
