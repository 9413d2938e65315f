use crate::raw_lock::RawLock;
use crate::spin_wait::SpinWait;
use lockbench_platform::Event;
use std::cell::Cell;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

const LOCKED_BIT: usize = 0b01;
const QUEUE_MASK: usize = !0b01;

/// The educational baseline [`WordLock`](crate::word_lock::WordLock) is
/// measured against: same LOCKED bit plus a Treiber stack of waiters packed
/// into one atomic word, but with no queue-lock bit and no tail caching.
/// Every release simply pops the top of the stack and wakes it, so wakeup
/// order is purely LIFO and a release under contention always touches the
/// current head rather than amortizing a walk across many releases.
#[derive(Debug, Default)]
pub struct StackLock {
    state: AtomicUsize,
}

#[repr(align(4))]
struct StackWaiter {
    next: Cell<*const StackWaiter>,
    event: Event,
}

impl StackWaiter {
    fn new() -> Self {
        StackWaiter { next: Cell::new(ptr::null()), event: Event::new() }
    }
}

unsafe impl RawLock for StackLock {
    fn new() -> Self {
        StackLock { state: AtomicUsize::new(0) }
    }

    fn lock(&self) {
        if self.state.fetch_or(LOCKED_BIT, Ordering::Acquire) & LOCKED_BIT == 0 {
            return;
        }
        self.lock_slow();
    }

    fn try_lock(&self) -> bool {
        self.state.fetch_or(LOCKED_BIT, Ordering::Acquire) & LOCKED_BIT == 0
    }

    unsafe fn unlock(&self) {
        let mut state = self.state.load(Ordering::Relaxed);
        loop {
            let head = (state & QUEUE_MASK) as *const StackWaiter;
            if head.is_null() {
                match self.state.compare_exchange_weak(state, 0, Ordering::Release, Ordering::Relaxed) {
                    Ok(_) => return,
                    Err(x) => {
                        state = x;
                        continue;
                    }
                }
            }

            // SAFETY: `head` was published by a successful CAS in
            // `lock_slow` and its owning thread is parked in `event.wait()`
            // until we notify it below.
            let next = unsafe { (*head).next.get() };
            let new_state = next as usize;
            match self.state.compare_exchange_weak(state, new_state, Ordering::Release, Ordering::Relaxed) {
                Ok(_) => {
                    // SAFETY: see above.
                    unsafe { (*head).event.set() };
                    return;
                }
                Err(x) => state = x,
            }
        }
    }

    fn name() -> &'static str {
        "stack_lock"
    }
}

impl StackLock {
    #[cold]
    fn lock_slow(&self) {
        let mut spin = SpinWait::new();
        let mut state = self.state.load(Ordering::Relaxed);

        loop {
            if state & LOCKED_BIT == 0 {
                match self.state.compare_exchange_weak(
                    state,
                    state | LOCKED_BIT,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return,
                    Err(x) => {
                        state = x;
                        continue;
                    }
                }
            }

            if state & QUEUE_MASK == 0 && spin.spin() {
                state = self.state.load(Ordering::Relaxed);
                continue;
            }

            let waiter = StackWaiter::new();
            waiter.next.set((state & QUEUE_MASK) as *const StackWaiter);
            let new_state = (&waiter as *const StackWaiter as usize) | (state & LOCKED_BIT);

            match self.state.compare_exchange_weak(state, new_state, Ordering::Release, Ordering::Relaxed) {
                Ok(_) => {
                    waiter.event.wait();
                    spin.reset();
                    state = self.state.load(Ordering::Relaxed);
                }
                Err(x) => state = x,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn uncontended_acquire_does_not_block() {
        let lock = StackLock::new();
        lock.lock();
        unsafe { lock.unlock() };
        assert!(lock.try_lock());
        unsafe { lock.unlock() };
    }

    #[test]
    fn mutual_exclusion_under_contention() {
        let lock = Arc::new(StackLock::new());
        let counter = Arc::new(StdAtomicUsize::new(0));
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
    fn release_wakes_exactly_one_waiter() {
        let lock = Arc::new(StackLock::new());
        lock.lock();

        let woken = Arc::new(StdAtomicUsize::new(0));
        for _ in 0..3 {
            let lock = Arc::clone(&lock);
            let woken = Arc::clone(&woken);
            thread::spawn(move || {
                lock.lock();
                woken.fetch_add(1, Ordering::SeqCst);
                loop {
                    thread::park();
                }
            });
        }

        thread::sleep(Duration::from_millis(50));
        assert_eq!(woken.load(Ordering::SeqCst), 0);

        unsafe { lock.unlock() };
        thread::sleep(Duration::from_millis(50));
        assert_eq!(woken.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unlocked_with_no_waiters_resets_to_zero() {
        let lock = StackLock::new();
        lock.lock();
        unsafe { lock.unlock() };
        assert_eq!(lock.state.load(Ordering::Relaxed), 0);
    }
}
