use crate::barrier::Barrier;
use crate::calibration::spin_iterations;
use crate::work_unit::{xorshift64, WorkUnit};
use lockbench_locks::RawLock;
use std::time::Instant;

/// How many critical-section iterations pass between work-unit resamples:
/// amortizes the xorshift draw's cost across many acquisitions instead of
/// paying it every time.
const RESAMPLE_INTERVAL: u64 = 32;

/// One worker thread's raw output: total iterations completed and the
/// acquire-latency (request to grant, in nanoseconds) of every one of them.
#[derive(Debug, Default, Clone)]
pub struct WorkerResult {
    /// Number of acquire/release cycles this worker completed.
    pub iterations: u64,
    /// Nanoseconds from just before `lock()` to just after it returns, one
    /// entry per iteration.
    pub latencies_ns: Vec<u64>,
}

/// Runs the hot loop against `lock` until `barrier` leaves its running
/// state: simulate outside-CS work, time the acquire, simulate in-CS work,
/// release, record the latency, repeat.
pub fn run_worker<R: RawLock>(
    lock: &R,
    barrier: &Barrier,
    unlocked: WorkUnit,
    locked: WorkUnit,
    seed: u64,
) -> WorkerResult {
    let mut rng_state = seed;
    let mut unlocked_iters = unlocked.sample_iterations(&mut rng_state);
    let mut locked_iters = locked.sample_iterations(&mut rng_state);

    let mut result = WorkerResult::default();
    barrier.wait_for_start();

    let mut since_resample: u64 = 0;
    while barrier.is_running() {
        spin_iterations(unlocked_iters);

        let t0 = Instant::now();
        lock.lock();
        let t1 = Instant::now();

        spin_iterations(locked_iters);

        // SAFETY: this thread acquired `lock` immediately above and is
        // releasing it exactly once, from the same thread.
        unsafe { lock.unlock() };

        result.latencies_ns.push(t1.saturating_duration_since(t0).as_nanos() as u64);
        result.iterations += 1;

        since_resample += 1;
        if since_resample >= RESAMPLE_INTERVAL {
            since_resample = 0;
            unlocked_iters = unlocked.sample_iterations(&mut rng_state);
            locked_iters = locked.sample_iterations(&mut rng_state);
        }
    }

    result
}

/// Derives a worker's xorshift seed from its own stack address XOR the
/// shared lock's address, per the spec's `worker_ptr XOR lock_ptr` scheme --
/// cheap, and different across workers without any shared RNG state.
pub fn derive_seed<R>(lock: &R) -> u64 {
    let marker = 0u8;
    let worker_ptr = std::ptr::addr_of!(marker) as u64;
    let lock_ptr = lock as *const R as *const () as u64;
    let seed = worker_ptr ^ lock_ptr;
    // `xorshift64` treats 0 as "unseeded" and substitutes a fixed constant;
    // folding that in here keeps `derive_seed` itself infallible.
    let mut state = seed;
    xorshift64(&mut state);
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbench_locks::SpinLock;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn worker_reports_latencies_matching_its_iteration_count() {
        let lock = Arc::new(SpinLock::new());
        let barrier = Arc::new(Barrier::new());

        let handle = {
            let lock = Arc::clone(&lock);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let seed = derive_seed(&*lock);
                run_worker(&*lock, &barrier, WorkUnit::Fixed(0), WorkUnit::Fixed(0), seed)
            })
        };

        thread::sleep(Duration::from_millis(5));
        barrier.start();
        thread::sleep(Duration::from_millis(20));
        barrier.stop();

        let result = handle.join().unwrap();
        assert_eq!(result.iterations as usize, result.latencies_ns.len());
        assert!(result.iterations > 0);
    }
}
