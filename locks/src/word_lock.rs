use crate::raw_lock::RawLock;
use crate::spin_wait::SpinWait;
use lockbench_platform::{CachePadded, Event};
use std::cell::Cell;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

const LOCKED_BIT: usize = 0b01;
const QUEUE_LOCKED_BIT: usize = 0b10;
const QUEUE_MASK: usize = !0b11;

/// A word-sized Treiber-stack queue lock: one `AtomicUsize` packs a LOCKED
/// bit, a QUEUE_LOCKED ("waking") bit, and a pointer to the top of a stack
/// of waiters in the remaining high bits. No auxiliary queue head lives
/// outside the lock's own state word.
///
/// Waiters are pushed in LIFO order but `unlock_slow` walks the stack once
/// per release, splicing `prev` pointers as it goes and caching the
/// discovered tail on the head node, so steady-state wakeups are O(1)
/// amortized and approximately FIFO ("LIFO in enqueue, FIFO after link", per
/// the design notes). This crate's closest analogue to
/// `fimo_tasks_int::sync::mutex::RawMutex`'s `LOCKED_BIT`/`WAITERS_BIT`
/// state machine, generalized from that type's task-runtime parking calls
/// back onto a raw, embedded waiter stack so it runs on plain OS threads.
#[derive(Debug, Default)]
pub struct WordLock {
    state: CachePadded<AtomicUsize>,
}

#[repr(align(4))]
struct WordWaiter {
    next: Cell<*const WordWaiter>,
    prev: Cell<*const WordWaiter>,
    tail: Cell<*const WordWaiter>,
    event: Event,
}

impl WordWaiter {
    fn new() -> Self {
        WordWaiter {
            next: Cell::new(ptr::null()),
            prev: Cell::new(ptr::null()),
            tail: Cell::new(ptr::null()),
            event: Event::new(),
        }
    }
}

unsafe impl RawLock for WordLock {
    fn new() -> Self {
        WordLock { state: CachePadded::new(AtomicUsize::new(0)) }
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
        let prev = self.state.fetch_and(!LOCKED_BIT, Ordering::Release);
        if prev & QUEUE_LOCKED_BIT != 0 || prev & QUEUE_MASK == 0 {
            return;
        }
        // SAFETY: we just released the lock and observed a non-empty,
        // not-already-waking queue; `unlock_slow`'s preconditions hold.
        unsafe { self.unlock_slow() };
    }

    fn name() -> &'static str {
        "word_lock"
    }
}

impl WordLock {
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

            let waiter = WordWaiter::new();
            let head = (state & QUEUE_MASK) as *const WordWaiter;
            waiter.next.set(head);
            waiter.tail.set(if head.is_null() { &waiter as *const WordWaiter } else { ptr::null() });

            let new_state = (&waiter as *const WordWaiter as usize) | (state & (LOCKED_BIT | QUEUE_LOCKED_BIT));

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

    #[cold]
    unsafe fn unlock_slow(&self) {
        let mut state = self.state.load(Ordering::Relaxed);
        loop {
            if state & QUEUE_LOCKED_BIT != 0 || state & QUEUE_MASK == 0 {
                return;
            }
            match self.state.compare_exchange_weak(
                state,
                state | QUEUE_LOCKED_BIT,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    state |= QUEUE_LOCKED_BIT;
                    break;
                }
                Err(x) => state = x,
            }
        }

        'relink: loop {
            let head = (state & QUEUE_MASK) as *const WordWaiter;
            // SAFETY: `head` is non-null (checked above) and was published
            // by a successful CAS in `lock_slow`; every node reachable from
            // it is either still linked or about to be, and none have been
            // freed (a parked waiter's stack frame outlives its node until
            // this walk notifies it).
            let tail = unsafe {
                let mut current = head;
                loop {
                    let cached = (*current).tail.get();
                    if !cached.is_null() {
                        break cached;
                    }
                    let next = (*current).next.get();
                    (*next).prev.set(current);
                    current = next;
                }
            };
            // SAFETY: see above.
            unsafe { (*head).tail.set(tail) };

            if state & LOCKED_BIT != 0 {
                // Another thread barged in and grabbed the lock while we
                // were walking; it inherits the duty of waking on its own
                // release, so we just clear QUEUE_LOCKED and leave.
                match self.state.compare_exchange_weak(
                    state,
                    state & !QUEUE_LOCKED_BIT,
                    Ordering::Release,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return,
                    Err(x) => {
                        state = x;
                        continue 'relink;
                    }
                }
            }

            // SAFETY: `tail` came from the walk above.
            let new_tail = unsafe { (*tail).prev.get() };
            if new_tail.is_null() {
                match self.state.compare_exchange_weak(
                    state,
                    state & LOCKED_BIT,
                    Ordering::Release,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: `tail`'s thread is parked in `event.wait()`
                        // and will not touch the node again once notified.
                        unsafe { (*tail).event.set() };
                        return;
                    }
                    Err(x) => {
                        state = x;
                        continue 'relink;
                    }
                }
            }

            // SAFETY: `head` is still the queue head under our QUEUE_LOCKED
            // ownership.
            unsafe { (*head).tail.set(new_tail) };
            self.state.fetch_and(!QUEUE_LOCKED_BIT, Ordering::Release);
            // SAFETY: see above.
            unsafe { (*tail).event.set() };
            return;
        }
    }
}
