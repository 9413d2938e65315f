use std::cell::Cell;
use std::sync::atomic::{AtomicU32, Ordering};

thread_local! {
    static CACHED_TID: Cell<u32> = const { Cell::new(0) };
}

/// Returns a non-zero, thread-stable identifier for the calling thread,
/// cached in thread-local storage after the first call.
///
/// The priority-inheriting lock uses this as the "owner" value it stores in
/// its atomic word, matching the `futex(2)` `FUTEX_LOCK_PI` contract where
/// the word must hold the kernel thread id of the owner. On Linux this is
/// `gettid()`; elsewhere (where `FUTEX_LOCK_PI` does not exist and the PI
/// lock is compiled out) it is a process-unique counter, kept available so
/// non-PI code that wants a cheap thread tag can still use it.
#[inline]
pub fn current_thread_id() -> u32 {
    CACHED_TID.with(|cached| {
        let tid = cached.get();
        if tid != 0 {
            return tid;
        }
        let tid = platform_thread_id();
        cached.set(tid);
        tid
    })
}

#[cfg(target_os = "linux")]
fn platform_thread_id() -> u32 {
    // SAFETY: `gettid` takes no arguments and cannot fail.
    let tid = unsafe { libc::syscall(libc::SYS_gettid) };
    tid as u32
}

#[cfg(not(target_os = "linux"))]
fn platform_thread_id() -> u32 {
    static NEXT_ID: AtomicU32 = AtomicU32::new(1);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}
