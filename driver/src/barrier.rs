use lockbench_platform::Futex;
use std::sync::atomic::{AtomicU32, Ordering};

const WAITING: u32 = 0;
const RUNNING: u32 = 1;
const STOPPED: u32 = 2;

/// Coordinates the start/stop of a benchmark run: every worker blocks in
/// [`Barrier::wait_for_start`] until the driver calls [`Barrier::start`],
/// then polls [`Barrier::is_running`] in its hot loop until the driver calls
/// [`Barrier::stop`]. Built directly on [`Futex`] rather than
/// `std::sync::Barrier`, since workers need to re-check a running flag on
/// every iteration, not just rendezvous once.
#[derive(Debug, Default)]
pub struct Barrier {
    state: AtomicU32,
}

impl Barrier {
    /// Creates a barrier in its initial `WAITING` state.
    pub fn new() -> Self {
        Barrier { state: AtomicU32::new(WAITING) }
    }

    /// Blocks the calling thread until [`Barrier::start`] is called.
    /// Returns immediately if `start` (or `stop`) has already happened.
    pub fn wait_for_start(&self) {
        while self.state.load(Ordering::Acquire) == WAITING {
            Futex::wait(&self.state, WAITING);
        }
    }

    /// Whether the barrier is still in its `RUNNING` state. Workers loop
    /// while this holds.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Relaxed) == RUNNING
    }

    /// Releases every thread parked in [`Barrier::wait_for_start`].
    pub fn start(&self) {
        self.state.store(RUNNING, Ordering::Release);
        Futex::wake(&self.state, i32::MAX);
    }

    /// Signals every worker's hot loop to stop.
    pub fn stop(&self) {
        self.state.store(STOPPED, Ordering::Release);
        Futex::wake(&self.state, i32::MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn workers_block_until_start_then_stop() {
        let barrier = Arc::new(Barrier::new());
        let worker = {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait_for_start();
                let mut iterations = 0u64;
                while barrier.is_running() {
                    iterations += 1;
                }
                iterations
            })
        };

        thread::sleep(Duration::from_millis(20));
        barrier.start();
        thread::sleep(Duration::from_millis(20));
        barrier.stop();

        let iterations = worker.join().unwrap();
        assert!(iterations > 0);
    }
}
