use crate::futex::Futex;
use std::sync::atomic::{AtomicU32, Ordering};

const UNSET: u32 = 0;
const SET: u32 = 1;

/// A single-producer single-consumer blocking primitive: one thread calls
/// [`Event::wait`], another calls [`Event::set`] exactly once. Waiter nodes
/// in the queue locks each embed one of these.
///
/// Once `set` has been observed by `wait`, the event must not be reused —
/// waiter nodes are one-shot, matching the spec's "notifier never touches
/// the node again" invariant.
#[derive(Debug, Default)]
pub struct Event {
    state: AtomicU32,
}

impl Event {
    /// Creates an unset event.
    #[inline]
    pub const fn new() -> Self {
        Event { state: AtomicU32::new(UNSET) }
    }

    /// Blocks until [`set`](Event::set) has been called.
    ///
    /// Acquire-ordered: everything the setter published before calling
    /// `set` is visible to the caller after this returns.
    pub fn wait(&self) {
        while self.state.load(Ordering::Acquire) == UNSET {
            Futex::wait(&self.state, UNSET);
        }
    }

    /// Marks the event as set and wakes the (at most one) waiting thread.
    ///
    /// Release-ordered: the caller must not touch the waiter's storage after
    /// this call returns, since the waiting thread may have already resumed
    /// and freed its stack frame.
    pub fn set(&self) {
        self.state.store(SET, Ordering::Release);
        Futex::wake(&self.state, 1);
    }

    /// Returns whether the event has already been set, without blocking.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.state.load(Ordering::Acquire) == SET
    }
}
