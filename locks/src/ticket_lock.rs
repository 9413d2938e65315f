use crate::raw_lock::RawLock;
use crate::spin_wait::SpinWait;
use std::sync::atomic::{AtomicU32, Ordering};

/// FIFO-fair ticket lock: one atomic word packs a 16-bit `next_ticket`
/// counter (high half) and a 16-bit `now_serving` counter (low half).
/// Acquirers take a ticket with a single `fetch_add` and then spin until
/// their number comes up -- no queue, no allocation, but still an unbounded
/// spin, so it degrades badly once threads outnumber cores.
#[derive(Debug, Default)]
pub struct TicketLock {
    state: AtomicU32,
}

const SERVING_MASK: u32 = 0x0000_ffff;
const TICKET_STEP: u32 = 0x0001_0000;

unsafe impl RawLock for TicketLock {
    fn new() -> Self {
        TicketLock { state: AtomicU32::new(0) }
    }

    fn lock(&self) {
        let my_ticket = self.state.fetch_add(TICKET_STEP, Ordering::Relaxed) >> 16;
        let mut spin = SpinWait::new_tight();
        while (self.state.load(Ordering::Acquire) & SERVING_MASK) != my_ticket {
            spin.spin();
        }
    }

    fn try_lock(&self) -> bool {
        let state = self.state.load(Ordering::Relaxed);
        let now_serving = state & SERVING_MASK;
        let next_ticket = state >> 16;
        if now_serving != next_ticket {
            return false;
        }
        self.state
            .compare_exchange(state, state.wrapping_add(TICKET_STEP), Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn unlock(&self) {
        self.state.fetch_add(1, Ordering::Release);
    }

    fn name() -> &'static str {
        "ticket"
    }
}
