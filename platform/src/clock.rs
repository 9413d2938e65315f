use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();
static LAST_NANOS: AtomicU64 = AtomicU64::new(0);

/// Returns a monotonically non-decreasing nanosecond timestamp.
///
/// `Instant` is already documented monotonic on every tier-1 target, but the
/// benchmark is specified to tolerate clock hardware that isn't, so samples
/// are clamped against the highest value observed so far via a CAS loop
/// rather than trusted blindly.
#[inline]
pub fn monotonic_nanoseconds() -> u64 {
    let epoch = *EPOCH.get_or_init(Instant::now);
    let now = epoch.elapsed().as_nanos().min(u64::MAX as u128) as u64;

    let mut last = LAST_NANOS.load(Ordering::Relaxed);
    loop {
        if now <= last {
            return last;
        }
        match LAST_NANOS.compare_exchange_weak(last, now, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return now,
            Err(observed) => last = observed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_goes_backwards() {
        let mut prev = monotonic_nanoseconds();
        for _ in 0..1_000 {
            let now = monotonic_nanoseconds();
            assert!(now >= prev);
            prev = now;
        }
    }
}
