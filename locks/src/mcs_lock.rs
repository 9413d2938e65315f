use crate::raw_lock::RawLock;
use lockbench_platform::{yield_cpu, Event};
use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

/// Mellor-Crummey & Scott queueing lock: each waiter spins (or parks) on a
/// flag in its *own* node instead of a shared word, so contention never
/// bounces a single cache line between cores. Grounded on
/// `pedromfedricci/mcs-rs`'s `Mutex`/`Slot` split, adapted to this crate's
/// `RawLock` contract and `Event`-based blocking.
///
/// `RawLock::lock`/`unlock` take no extra arguments, unlike `mcs-rs`'s
/// `lock(&self, slot: &mut Slot)` -- unlock needs the *same* node the
/// matching `lock` call linked into the queue, so each worker thread keeps
/// one reusable node in thread-local storage instead of the caller
/// threading a stack slot through both calls. A thread never has two
/// outstanding acquisitions of the same lock (recursive acquire is
/// documented UB), so one node per thread is always enough.
#[derive(Debug, Default)]
pub struct McsLock {
    tail: AtomicPtr<McsNode>,
}

struct McsNode {
    next: AtomicPtr<McsNode>,
    ready: Event,
}

impl McsNode {
    fn new() -> Self {
        McsNode { next: AtomicPtr::new(ptr::null_mut()), ready: Event::new() }
    }
}

thread_local! {
    static NODE: UnsafeCell<McsNode> = UnsafeCell::new(McsNode::new());
}

unsafe impl RawLock for McsLock {
    fn new() -> Self {
        McsLock { tail: AtomicPtr::new(ptr::null_mut()) }
    }

    fn lock(&self) {
        NODE.with(|cell| {
            let node = cell.get();
            // SAFETY: `node` is this thread's own thread-local node, not
            // presently linked into any queue (recursive acquire is UB, so
            // the previous acquisition using this node, if any, has already
            // returned from `unlock`).
            unsafe {
                (*node).next = AtomicPtr::new(ptr::null_mut());
                (*node).ready = Event::new();
            }

            let predecessor = self.tail.swap(node, Ordering::AcqRel);
            if predecessor.is_null() {
                // Queue was empty: we're the new owner immediately.
                return;
            }

            // SAFETY: `predecessor` was installed by a thread that is either
            // still running (about to publish `next`) or already waiting;
            // its node is not deallocated while linked into the queue.
            unsafe { (*predecessor).next.store(node, Ordering::Release) };

            // SAFETY: `node` is this thread's own node.
            unsafe { (*node).ready.wait() };
        });
    }

    fn try_lock(&self) -> bool {
        NODE.with(|cell| {
            let node = cell.get();
            // SAFETY: same reasoning as in `lock`.
            unsafe {
                (*node).next = AtomicPtr::new(ptr::null_mut());
                (*node).ready = Event::new();
            }
            self.tail.compare_exchange(ptr::null_mut(), node, Ordering::AcqRel, Ordering::Relaxed).is_ok()
        })
    }

    unsafe fn unlock(&self) {
        NODE.with(|cell| {
            let node = cell.get();

            if self
                .tail
                .compare_exchange(node, ptr::null_mut(), Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }

            // Someone is enqueueing behind us but hasn't published `next`
            // yet; spin until they do (bounded: the enqueuer has already
            // won the `swap` and is about to store, so this is a short
            // window, not a real wait).
            let mut next = unsafe { (*node).next.load(Ordering::Acquire) };
            while next.is_null() {
                yield_cpu();
                next = unsafe { (*node).next.load(Ordering::Acquire) };
            }

            // SAFETY: `next`'s owning thread is parked in `wait()` on
            // exactly this event and will not touch the node again once it
            // observes the set; we never touch it after this call either.
            unsafe { (*next).ready.set() };
        })
    }

    fn name() -> &'static str {
        "mcs"
    }
}
