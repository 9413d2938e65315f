use lockbench_platform::{yield_cpu, yield_thread};

const YIELD_THRESHOLD: usize = 3;
const SLEEP_THRESHOLD: usize = 10;

// Locks whose slow path never parks (spin lock, ticket lock) can afford to
// spend far longer spinning before they fall back to `yield_thread`, since
// there is no queue to join instead.
const TIGHT_SLEEP_THRESHOLD: usize = 100;

/// Adaptive backoff state used by every lock's slow path.
///
/// Based on `fimo_tasks_int::sync::spin_wait::SpinWait`, itself adapted from
/// `parking_lot`'s internal `SpinWait`: early rounds spend an
/// exponentially growing number of `yield_cpu` hints, later rounds fall back
/// to `yield_thread` (an OS reschedule), and after a bounded number of
/// rounds it reports "give up, go park".
#[derive(Debug, Default)]
pub struct SpinWait {
    count: usize,
    threshold: usize,
}

impl SpinWait {
    /// Creates a `SpinWait` tuned for locks that will fall back to parking
    /// once spinning gives up.
    #[inline]
    pub fn new() -> Self {
        SpinWait { count: 0, threshold: SLEEP_THRESHOLD }
    }

    /// Creates a `SpinWait` tuned for locks with no park/queue fallback
    /// (spin lock, ticket lock), which spin for far longer before yielding.
    #[inline]
    pub fn new_tight() -> Self {
        SpinWait { count: 0, threshold: TIGHT_SLEEP_THRESHOLD }
    }

    /// Resets the backoff state to its initial value.
    #[inline]
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Spins once and returns whether the caller should keep calling
    /// `spin()`. Once it returns `false`, further spinning has diminishing
    /// returns and the caller should fall back to parking (or, for
    /// tight-loop locks, keep re-checking without backoff).
    #[inline]
    pub fn spin(&mut self) -> bool {
        if self.count >= self.threshold {
            return false;
        }

        self.count += 1;
        if self.count <= YIELD_THRESHOLD {
            for _ in 0..(1usize << self.count) {
                yield_cpu();
            }
        } else {
            yield_thread();
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eventually_gives_up() {
        let mut spin = SpinWait::new();
        let mut rounds = 0;
        while spin.spin() {
            rounds += 1;
            assert!(rounds < 1_000, "SpinWait never gave up");
        }
    }

    #[test]
    fn reset_restarts_the_backoff() {
        let mut spin = SpinWait::new();
        while spin.spin() {}
        spin.reset();
        assert!(spin.spin());
    }
}
