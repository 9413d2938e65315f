use crate::raw_lock::RawLock;
use crate::spin_wait::SpinWait;
use lockbench_platform::KeyedEvent;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

const LOCKED_BIT: u32 = 0b01;
const WAKING_BIT: u32 = 0b10;
const WAITING_SHIFT: u32 = 2;
const WAITING_STEP: u32 = 1 << WAITING_SHIFT;
const WAITING_SPIN_THRESHOLD: u32 = 4;

/// A lock backed by Windows NT keyed events: one `AtomicU32` packs LOCKED,
/// WAKING, and a waiter count, while the actual rendezvous goes through
/// `NtWaitForKeyedEvent`/`NtReleaseKeyedEvent`. Unlike a futex wait, a
/// keyed-event release blocks until a waiter is there to match it, giving a
/// tighter handoff at the cost of the releaser stalling if no one has
/// parked yet.
///
/// The keyed-event key only needs to be a stable, unique address -- its
/// contents are never inspected by ntdll -- so this type uses a dedicated
/// `AtomicU8` purely as an identity tag rather than keying off the state
/// word itself, since [`KeyedEvent`]'s wait/release take a `&AtomicU8`.
/// Grounded on `pitdicker/valet_parking`'s keyed-event backend (other_examples).
#[derive(Debug, Default)]
pub struct KeyedEventLock {
    state: AtomicU32,
    key: AtomicU8,
    event: KeyedEvent,
}

unsafe impl RawLock for KeyedEventLock {
    fn new() -> Self {
        KeyedEventLock { state: AtomicU32::new(0), key: AtomicU8::new(0), event: KeyedEvent::new() }
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
        let mut state = prev & !LOCKED_BIT;
        loop {
            if state >> WAITING_SHIFT == 0 || state & WAKING_BIT != 0 {
                return;
            }
            let new_state = (state - WAITING_STEP) | WAKING_BIT;
            match self.state.compare_exchange_weak(state, new_state, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => {
                    self.event.release(&self.key);
                    return;
                }
                Err(x) => state = x,
            }
        }
    }

    fn name() -> &'static str {
        "keyed_event"
    }
}

impl KeyedEventLock {
    #[cold]
    fn lock_slow(&self) {
        loop {
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

                let waiting = state >> WAITING_SHIFT;
                if waiting < WAITING_SPIN_THRESHOLD && spin.spin() {
                    state = self.state.load(Ordering::Relaxed);
                    continue;
                }
                break;
            }

            match self.state.compare_exchange_weak(
                state,
                state.wrapping_add(WAITING_STEP),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    self.event.wait(&self.key);
                    self.state.fetch_and(!WAKING_BIT, Ordering::AcqRel);
                    // Retry acquisition from the top; we don't assume we now
                    // own the lock, only that we were released to compete.
                }
                Err(_) => continue,
            }
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
        let lock = KeyedEventLock::new();
        lock.lock();
        unsafe { lock.unlock() };
        assert_eq!(lock.state.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn try_lock_fails_while_held() {
        let lock = KeyedEventLock::new();
        lock.lock();
        assert!(!lock.try_lock());
        unsafe { lock.unlock() };
        assert!(lock.try_lock());
    }

    #[test]
    fn mutual_exclusion_under_contention() {
        let lock = Arc::new(KeyedEventLock::new());
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
