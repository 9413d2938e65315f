use crate::raw_lock::RawLock;
use crate::spin_wait::SpinWait;
use lockbench_platform::yield_cpu;
use std::sync::atomic::{AtomicBool, Ordering};

/// The simplest possible lock: one atomic bool, CAS to acquire, store to
/// release. No ordering guarantee between waiters and no bound on how long a
/// thread may starve -- this is the baseline every other algorithm in this
/// crate is measured against.
#[derive(Debug, Default)]
pub struct SpinLock {
    locked: AtomicBool,
}

unsafe impl RawLock for SpinLock {
    fn new() -> Self {
        SpinLock { locked: AtomicBool::new(false) }
    }

    fn lock(&self) {
        // Fast path: try once before paying for the slow path's SpinWait
        // setup.
        if self.locked.fetch_or(true, Ordering::Acquire) {
            self.lock_slow();
        }
    }

    fn try_lock(&self) -> bool {
        !self.locked.fetch_or(true, Ordering::Acquire)
    }

    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    fn name() -> &'static str {
        "spin"
    }
}

impl SpinLock {
    #[cold]
    fn lock_slow(&self) {
        let mut spin = SpinWait::new_tight();
        loop {
            // Spin on a plain load rather than retrying the CAS: a failed
            // CAS still invalidates the cache line for every other spinning
            // thread, while a load that just keeps observing "locked" stays
            // entirely in the local cache.
            while self.locked.load(Ordering::Relaxed) {
                if !spin.spin() {
                    yield_cpu();
                }
            }

            if !self.locked.fetch_or(true, Ordering::Acquire) {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncontended_roundtrip() {
        let lock = SpinLock::new();
        lock.lock();
        unsafe { lock.unlock() };
    }

    #[test]
    fn try_lock_fails_while_held() {
        let lock = SpinLock::new();
        lock.lock();
        assert!(!lock.try_lock());
        unsafe { lock.unlock() };
        assert!(lock.try_lock());
    }
}
