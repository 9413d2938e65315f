use std::sync::atomic::AtomicU32;

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod imp {
            use super::AtomicU32;

            /// Atomically checks `*addr == expected` and, if so, blocks the
            /// calling thread until a matching [`wake`]. Returns immediately
            /// (possibly spuriously) otherwise; callers always re-check their
            /// condition in a loop, per the futex contract.
            pub fn wait(addr: &AtomicU32, expected: u32) {
                // SAFETY: `addr` is a valid, live `AtomicU32`; the syscall
                // only reads/compares it and may park the calling thread.
                // `FUTEX_PRIVATE_FLAG` is safe because every futex word this
                // crate uses is private to the process.
                unsafe {
                    libc::syscall(
                        libc::SYS_futex,
                        addr as *const AtomicU32 as *const u32,
                        libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                        expected,
                        std::ptr::null::<libc::timespec>(),
                    );
                }
            }

            /// Wakes up to `n` threads parked on `addr` via [`wait`].
            pub fn wake(addr: &AtomicU32, n: i32) {
                // SAFETY: same as `wait`; the syscall only inspects `addr`
                // and wakes threads parked on it.
                unsafe {
                    libc::syscall(
                        libc::SYS_futex,
                        addr as *const AtomicU32 as *const u32,
                        libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                        n,
                    );
                }
            }
        }
    } else {
        mod imp {
            use super::AtomicU32;
            use std::sync::atomic::Ordering;
            use std::sync::{Condvar, Mutex, OnceLock};

            // No kernel futex on this target: fall back to a small table of
            // (Mutex, Condvar) buckets hashed by address, the same shape as
            // `parking_lot_core`'s parking table. The bucket's mutex is only
            // ever held across the check-then-block step, never across an
            // OS wait performed by the *lock* algorithms themselves.
            const BUCKETS: usize = 64;

            struct Bucket {
                mutex: Mutex<()>,
                condvar: Condvar,
            }

            static TABLE: OnceLock<Vec<Bucket>> = OnceLock::new();

            fn table() -> &'static [Bucket] {
                TABLE.get_or_init(|| {
                    (0..BUCKETS)
                        .map(|_| Bucket { mutex: Mutex::new(()), condvar: Condvar::new() })
                        .collect()
                })
            }

            fn bucket_for(addr: &AtomicU32) -> &'static Bucket {
                let index = (addr as *const AtomicU32 as usize / 4) % BUCKETS;
                &table()[index]
            }

            pub fn wait(addr: &AtomicU32, expected: u32) {
                let bucket = bucket_for(addr);
                let guard = bucket.mutex.lock().unwrap();
                if addr.load(Ordering::SeqCst) != expected {
                    return;
                }
                // One wait is enough: the lock algorithms above us always
                // loop and re-check their own condition after returning.
                let _ = bucket.condvar.wait(guard).unwrap();
            }

            pub fn wake(addr: &AtomicU32, n: i32) {
                let bucket = bucket_for(addr);
                drop(bucket.mutex.lock().unwrap());
                if n >= i32::MAX {
                    bucket.condvar.notify_all();
                } else {
                    for _ in 0..n.max(0) {
                        bucket.condvar.notify_one();
                    }
                }
            }
        }
    }
}

/// A thin wrapper around the host's futex-like primitive: conditionally park
/// a thread on a 32-bit atomic word, and wake parked threads back up.
///
/// This is the only blocking primitive most lock algorithms in
/// `lockbench-locks` use directly; `Event` is built on top of it.
#[derive(Debug, Default)]
pub struct Futex;

impl Futex {
    /// Blocks the calling thread if and only if `addr` still holds
    /// `expected` at the moment the kernel (or fallback table) checks it.
    #[inline]
    pub fn wait(addr: &AtomicU32, expected: u32) {
        imp::wait(addr, expected);
    }

    /// Wakes up to `n` threads parked on `addr`.
    #[inline]
    pub fn wake(addr: &AtomicU32, n: i32) {
        imp::wake(addr, n);
    }
}
