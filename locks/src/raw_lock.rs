/// The contract every lock algorithm in this crate implements.
///
/// Mirrors the split `fimo_tasks_int::sync::Mutex`/`RawMutex` use internally
/// (a safe public wrapper over an unsafe raw primitive), generalized into a
/// trait so the benchmark driver can run the same worker loop over any of
/// the nine algorithms.
///
/// # Safety
///
/// Implementors only guarantee mutual exclusion if callers uphold the usual
/// lock discipline: `unlock` may only be called by the thread that currently
/// holds the lock (via a prior `lock`/`try_lock` that returned `true`), and
/// exactly once per successful acquisition. Violating this is undefined
/// behavior, not a panic -- the spec calls this out explicitly as a
/// precondition violation, not an error to recover from.
pub unsafe trait RawLock: Sync {
    /// Constructs the lock in its unlocked, empty-queue state.
    fn new() -> Self
    where
        Self: Sized;

    /// Blocks the calling thread until it is the sole owner of the lock.
    ///
    /// Must not be called recursively by a thread that already holds the
    /// lock; doing so is undefined behavior (documented on the trait, not
    /// policed at runtime -- see the module-level safety note).
    fn lock(&self);

    /// Attempts to acquire the lock without blocking.
    fn try_lock(&self) -> bool;

    /// Releases a lock held by the calling thread.
    ///
    /// # Safety
    ///
    /// The caller must currently hold the lock (via a matching `lock`/
    /// `try_lock`). Calling this without holding the lock, or calling it
    /// twice for one acquisition, is undefined behavior.
    unsafe fn unlock(&self);

    /// Human-readable name used in benchmark output and CLI selection.
    fn name() -> &'static str
    where
        Self: Sized;
}
