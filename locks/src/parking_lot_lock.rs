use crate::lock::Lock;
use crate::raw_lock::RawLock;
use crate::spin_wait::SpinWait;
use crate::word_lock::WordLock;
use lockbench_platform::{CachePadded, Event};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::cell::Cell;
use std::ptr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

const LOCKED_BIT: u8 = 0b01;
const PARKED_BIT: u8 = 0b10;

/// Fair, amortized-FIFO lock with probabilistic direct handoff, in the mold
/// of `parking_lot::Mutex`. A small `AtomicU8` (LOCKED, PARKED) gates a fast
/// path identical to [`WordLock`]'s; the slow path defers to a single
/// "bucket" holding the actual waiter queue, itself serialized by a nested
/// [`WordLock`] through this crate's own [`Lock`] wrapper.
///
/// On most releases the lock is simply handed to whichever thread wins the
/// next fast-path CAS (a "barge"), which is good for throughput. But roughly
/// every half a millisecond (tracked via `fair_timeout`, re-armed with a
/// `SmallRng`-drawn nanosecond offset) the release instead hands the lock
/// directly to the head of the queue, bounding how long any one waiter can
/// be starved by a stream of barging acquirers. Grounded on
/// `fimo_tasks_int::sync::mutex::RawMutex`'s `use_fair_unlock`/
/// `fair_timeout`/`SmallRng` logic, generalized from its task-runtime
/// parking calls back onto this crate's `Event`.
pub struct ParkingLotLock {
    state: CachePadded<AtomicU8>,
    bucket: CachePadded<Lock<WordLock, BucketInner>>,
}

struct ParkWaiter {
    next: Cell<*const ParkWaiter>,
    acquired: Cell<bool>,
    event: Event,
}

impl ParkWaiter {
    fn new() -> Self {
        ParkWaiter { next: Cell::new(ptr::null()), acquired: Cell::new(false), event: Event::new() }
    }
}

struct BucketInner {
    head: *const ParkWaiter,
    tail: *const ParkWaiter,
    fair_timeout: Instant,
    rng: SmallRng,
}

// SAFETY: `head`/`tail` are only ever read or written while this crate's
// `Lock<WordLock, BucketInner>` guard is held, which already gives exclusive
// access across threads; no field is ever accessed concurrently.
unsafe impl Send for BucketInner {}

impl std::fmt::Debug for ParkingLotLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParkingLotLock").field("state", &self.state.load(Ordering::Relaxed)).finish()
    }
}

unsafe impl RawLock for ParkingLotLock {
    fn new() -> Self {
        ParkingLotLock {
            state: CachePadded::new(AtomicU8::new(0)),
            bucket: CachePadded::new(Lock::new(BucketInner {
                head: ptr::null(),
                tail: ptr::null(),
                fair_timeout: Instant::now(),
                rng: SmallRng::from_entropy(),
            })),
        }
    }

    fn lock(&self) {
        if self.state.fetch_or(LOCKED_BIT, Ordering::Acquire) & LOCKED_BIT == 0 {
            return;
        }
        self.lock_slow();
    }

    fn try_lock(&self) -> bool {
        let mut state = self.state.load(Ordering::Relaxed);
        loop {
            if state & LOCKED_BIT != 0 {
                return false;
            }
            match self.state.compare_exchange_weak(
                state,
                state | LOCKED_BIT,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(x) => state = x,
            }
        }
    }

    unsafe fn unlock(&self) {
        if self.state.compare_exchange(LOCKED_BIT, 0, Ordering::Release, Ordering::Relaxed).is_ok() {
            return;
        }
        // SAFETY: the CAS above failed only because PARKED_BIT (or a
        // concurrent mutation) is set; the queue-servicing precondition of
        // `unlock_slow` holds because we are the current owner.
        unsafe { self.unlock_slow() };
    }

    fn name() -> &'static str {
        "parking_lot"
    }
}

impl ParkingLotLock {
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

            if state & PARKED_BIT == 0 && spin.spin() {
                state = self.state.load(Ordering::Relaxed);
                continue;
            }

            if state & PARKED_BIT == 0 {
                if let Err(x) = self.state.compare_exchange_weak(
                    state,
                    state | PARKED_BIT,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    state = x;
                    continue;
                }
            }

            let waiter = ParkWaiter::new();
            {
                let mut guard = self.bucket.lock();
                let current = self.state.load(Ordering::Relaxed);
                if current != LOCKED_BIT | PARKED_BIT {
                    drop(guard);
                    spin.reset();
                    state = self.state.load(Ordering::Relaxed);
                    continue;
                }

                if guard.tail.is_null() {
                    guard.head = &waiter;
                } else {
                    // SAFETY: `guard.tail` is non-null and linked into the
                    // queue under this same bucket lock.
                    unsafe { (*guard.tail).next.set(&waiter) };
                }
                guard.tail = &waiter;
            }

            waiter.event.wait();
            if waiter.acquired.get() {
                return;
            }
            spin.reset();
            state = self.state.load(Ordering::Relaxed);
        }
    }

    #[cold]
    unsafe fn unlock_slow(&self) {
        let mut guard = self.bucket.lock();
        let head = guard.head;
        if head.is_null() {
            // The PARKED bit was set by a thread that hasn't linked its
            // waiter into the queue yet; since enqueueing and dequeuing are
            // both serialized by this same bucket lock, an empty queue here
            // means nobody is actually parked. That thread will re-validate
            // `state` under the bucket lock before waiting and retry
            // instead of blocking, so clearing both bits loses no wakeup.
            self.state.store(0, Ordering::Release);
            return;
        }

        let be_fair = {
            let now = Instant::now();
            if now > guard.fair_timeout {
                let nanos = guard.rng.gen_range(0..1_000_000u64);
                guard.fair_timeout = now + Duration::from_nanos(nanos);
                true
            } else {
                false
            }
        };

        // SAFETY: `head` was linked under this bucket lock and is still
        // reachable; its owning thread is parked in `event.wait()`.
        let next = unsafe { (*head).next.get() };
        guard.head = next;
        if next.is_null() {
            guard.tail = ptr::null();
        }
        let queue_now_empty = guard.head.is_null();

        if be_fair {
            // SAFETY: see above.
            unsafe { (*head).acquired.set(true) };
            if queue_now_empty {
                self.state.store(LOCKED_BIT, Ordering::Release);
            }
            // Otherwise LOCKED|PARKED is already the correct state: the
            // lock is handed off directly and the queue is still non-empty.
        } else {
            // SAFETY: see above.
            unsafe { (*head).acquired.set(false) };
            let new_state = if queue_now_empty { 0 } else { PARKED_BIT };
            self.state.store(new_state, Ordering::Release);
        }

        drop(guard);
        // SAFETY: `head`'s thread will not touch the node again once
        // notified.
        unsafe { (*head).event.set() };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration as StdDuration;

    #[test]
    fn mutual_exclusion_under_contention() {
        let lock = Arc::new(ParkingLotLock::new());
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
    fn release_wakes_exactly_one_waiter() {
        let lock = Arc::new(ParkingLotLock::new());
        lock.lock();

        let woken = Arc::new(AtomicUsize::new(0));
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

        thread::sleep(StdDuration::from_millis(50));
        assert_eq!(woken.load(Ordering::SeqCst), 0);

        unsafe { lock.unlock() };
        thread::sleep(StdDuration::from_millis(50));
        assert_eq!(woken.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn uncontended_roundtrip() {
        let lock = ParkingLotLock::new();
        lock.lock();
        unsafe { lock.unlock() };
        assert_eq!(lock.state.load(Ordering::Relaxed), 0);
    }

    /// A continuously bickering "barger" thread must not starve a "slow"
    /// thread indefinitely: the fairness timeout re-armed in `unlock_slow`
    /// forces a handoff at least once per `fair_timeout` window.
    #[test]
    fn fair_handoff_bounds_a_slow_threads_staleness() {
        let lock = Arc::new(ParkingLotLock::new());
        let running = Arc::new(std::sync::atomic::AtomicBool::new(true));

        let barger = {
            let lock = Arc::clone(&lock);
            let running = Arc::clone(&running);
            thread::spawn(move || {
                while running.load(Ordering::Relaxed) {
                    lock.lock();
                    unsafe { lock.unlock() };
                }
            })
        };

        let mut acquisitions = Vec::new();
        let deadline = std::time::Instant::now() + StdDuration::from_millis(500);
        while std::time::Instant::now() < deadline {
            lock.lock();
            acquisitions.push(std::time::Instant::now());
            unsafe { lock.unlock() };
        }

        running.store(false, Ordering::Relaxed);
        barger.join().unwrap();

        assert!(acquisitions.len() > 1, "slow thread never acquired the lock");
        for pair in acquisitions.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(gap < StdDuration::from_millis(50), "slow thread stalled for {gap:?}");
        }
    }
}
