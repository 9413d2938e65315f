use crate::raw_lock::RawLock;
use crate::spin_wait::SpinWait;
use lockbench_platform::current_thread_id;
use std::sync::atomic::{AtomicU32, Ordering};

const FUTEX_WAITERS: u32 = 0x8000_0000;

/// A priority-inheriting lock built directly on the kernel's `FUTEX_LOCK_PI`
/// / `FUTEX_UNLOCK_PI` operations. The futex word holds either 0 (unlocked)
/// or the owning thread's kernel tid, with the kernel setting
/// `FUTEX_WAITERS` in the top bit whenever a thread is blocked in the
/// kernel's priority-inheritance wait list.
///
/// Unlike every other lock in this crate, blocking here hands control to the
/// kernel's PI futex machinery, which temporarily boosts the owner's
/// scheduling priority to the highest-priority blocked waiter's -- this
/// crate implements no priority tracking of its own, it only invokes the
/// syscalls that do. Linux-only: `FUTEX_LOCK_PI` has no portable analogue,
/// matching the pack's existing `target_os = "linux"` / `x86_64-unknown-*`
/// platform gates for kernel-specific code.
#[derive(Debug, Default)]
pub struct PiLock {
    futex: AtomicU32,
}

unsafe impl RawLock for PiLock {
    fn new() -> Self {
        PiLock { futex: AtomicU32::new(0) }
    }

    fn lock(&self) {
        let tid = current_thread_id();
        if self.futex.compare_exchange(0, tid, Ordering::Acquire, Ordering::Relaxed).is_ok() {
            return;
        }
        self.lock_slow(tid);
    }

    fn try_lock(&self) -> bool {
        let tid = current_thread_id();
        self.futex.compare_exchange(0, tid, Ordering::Acquire, Ordering::Relaxed).is_ok()
    }

    unsafe fn unlock(&self) {
        let tid = current_thread_id();
        if self.futex.compare_exchange(tid, 0, Ordering::Release, Ordering::Relaxed).is_ok() {
            return;
        }
        self.unlock_slow();
    }

    fn name() -> &'static str {
        "pi_lock"
    }
}

impl PiLock {
    #[cold]
    fn lock_slow(&self, tid: u32) {
        let mut spin = SpinWait::new();
        // A chance without kernel help while no one has registered as a
        // waiter yet.
        while self.futex.load(Ordering::Relaxed) & FUTEX_WAITERS == 0 {
            if self.futex.compare_exchange(0, tid, Ordering::Acquire, Ordering::Relaxed).is_ok() {
                return;
            }
            if !spin.spin() {
                break;
            }
        }

        loop {
            // SAFETY: `self.futex` is a valid, live futex word this lock
            // owns exclusively; `FUTEX_LOCK_PI` blocks until it can store
            // our tid (optionally OR'd with FUTEX_WAITERS by the kernel).
            let ret = unsafe {
                libc::syscall(
                    libc::SYS_futex,
                    &self.futex as *const AtomicU32 as *const u32,
                    libc::FUTEX_LOCK_PI | libc::FUTEX_PRIVATE_FLAG,
                    0,
                    std::ptr::null::<libc::timespec>(),
                )
            };
            if ret == 0 {
                return;
            }
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EAGAIN) || err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            panic!("FUTEX_LOCK_PI failed: {err}");
        }
    }

    #[cold]
    unsafe fn unlock_slow(&self) {
        // SAFETY: `self.futex` holds our tid or `tid | FUTEX_WAITERS`
        // (checked by the fast path's failed CAS); `FUTEX_UNLOCK_PI` clears
        // ownership and wakes the highest-priority waiter if any.
        let ret = unsafe {
            libc::syscall(
                libc::SYS_futex,
                &self.futex as *const AtomicU32 as *const u32,
                libc::FUTEX_UNLOCK_PI | libc::FUTEX_PRIVATE_FLAG,
                0,
            )
        };
        if ret != 0 {
            let err = std::io::Error::last_os_error();
            panic!("FUTEX_UNLOCK_PI failed: {err}");
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
        let lock = PiLock::new();
        lock.lock();
        unsafe { lock.unlock() };
        assert_eq!(lock.futex.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn try_lock_fails_while_held() {
        let lock = PiLock::new();
        lock.lock();
        assert!(!lock.try_lock());
        unsafe { lock.unlock() };
        assert!(lock.try_lock());
        unsafe { lock.unlock() };
    }

    #[test]
    fn mutual_exclusion_under_contention() {
        let lock = Arc::new(PiLock::new());
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
}
