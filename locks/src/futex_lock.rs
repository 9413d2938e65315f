use crate::raw_lock::RawLock;
use crate::spin_wait::SpinWait;
use lockbench_platform::Futex;
use std::sync::atomic::{AtomicU32, Ordering};

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;
const CONTENDED: u32 = 2;

/// Three-state futex lock in the mold of glibc's `pthread_mutex` fast path:
/// UNLOCKED / LOCKED / CONTENDED packed into one `AtomicU32`, with no
/// userspace waiter queue at all -- the kernel's futex wait list is the
/// queue. Deliberately pessimistic: any thread that had to block marks the
/// lock CONTENDED on release too, trading an extra wake syscall on an
/// uncontended release for a guarantee that a waiter is never missed.
#[derive(Debug, Default)]
pub struct FutexLock {
    state: AtomicU32,
}

unsafe impl RawLock for FutexLock {
    fn new() -> Self {
        FutexLock { state: AtomicU32::new(UNLOCKED) }
    }

    fn lock(&self) {
        if self.state.compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed).is_ok() {
            return;
        }
        self.lock_slow();
    }

    fn try_lock(&self) -> bool {
        self.state.compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed).is_ok()
    }

    unsafe fn unlock(&self) {
        if self.state.swap(UNLOCKED, Ordering::Release) == CONTENDED {
            Futex::wake(&self.state, 1);
        }
    }

    fn name() -> &'static str {
        "futex_3state"
    }
}

impl FutexLock {
    #[cold]
    fn lock_slow(&self) {
        let mut spin = SpinWait::new();
        // Small bounded adaptive spin while the lock isn't yet known to have
        // a parked waiter: cheaper than a syscall if the owner releases
        // quickly.
        while self.state.load(Ordering::Relaxed) != CONTENDED {
            if self.state.compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed).is_ok() {
                return;
            }
            if !spin.spin() {
                break;
            }
        }

        loop {
            if self.state.swap(CONTENDED, Ordering::Acquire) == UNLOCKED {
                return;
            }
            Futex::wait(&self.state, CONTENDED);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn uncontended_roundtrip() {
        let lock = FutexLock::new();
        lock.lock();
        unsafe { lock.unlock() };
        assert_eq!(lock.state.load(Ordering::Relaxed), UNLOCKED);
    }

    #[test]
    fn try_lock_fails_while_held() {
        let lock = FutexLock::new();
        lock.lock();
        assert!(!lock.try_lock());
        unsafe { lock.unlock() };
        assert!(lock.try_lock());
    }

    #[test]
    fn mutual_exclusion_under_contention() {
        let lock = Arc::new(FutexLock::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        lock.lock();
                        counter.fetch_add(1, Ordering::Relaxed);
                        unsafe { lock.unlock() };
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::Relaxed), 8_000);
    }

    #[test]
    fn blocked_waiter_is_eventually_woken() {
        let lock = Arc::new(FutexLock::new());
        lock.lock();

        let woken = Arc::new(AtomicUsize::new(0));
        let waiter = {
            let lock = Arc::clone(&lock);
            let woken = Arc::clone(&woken);
            thread::spawn(move || {
                lock.lock();
                woken.fetch_add(1, Ordering::SeqCst);
                unsafe { lock.unlock() };
            })
        };

        thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(woken.load(Ordering::SeqCst), 0);

        unsafe { lock.unlock() };
        waiter.join().unwrap();
        assert_eq!(woken.load(Ordering::SeqCst), 1);
    }
}
