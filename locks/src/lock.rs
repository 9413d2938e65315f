use crate::raw_lock::RawLock;
use std::cell::UnsafeCell;
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

/// A mutual exclusion primitive generic over the locking algorithm `R`.
///
/// Protects `T`, handing out access only through the RAII guard returned by
/// [`lock`](Lock::lock) / [`try_lock`](Lock::try_lock). Modeled directly on
/// `fimo_tasks_int::sync::Mutex<T>`, generalized over `R: RawLock` so it can
/// sit on top of any of this crate's nine algorithms interchangeably.
pub struct Lock<R, T: ?Sized> {
    raw: R,
    data: UnsafeCell<T>,
}

unsafe impl<R: RawLock, T: ?Sized + Send> Send for Lock<R, T> {}
unsafe impl<R: RawLock, T: ?Sized + Send> Sync for Lock<R, T> {}

impl<R: RawLock, T> Lock<R, T> {
    /// Creates a new, unlocked `Lock` wrapping `value`.
    pub fn new(value: T) -> Self {
        Lock { raw: R::new(), data: UnsafeCell::new(value) }
    }

    /// Consumes the lock, returning the wrapped value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<R: RawLock, T: ?Sized> Lock<R, T> {
    /// Blocks until the lock is acquired, then returns a guard.
    pub fn lock(&self) -> LockGuard<'_, R, T> {
        self.raw.lock();
        LockGuard { lock: self, _not_send: PhantomData }
    }

    /// Attempts to acquire the lock without blocking.
    pub fn try_lock(&self) -> Option<LockGuard<'_, R, T>> {
        if self.raw.try_lock() {
            Some(LockGuard { lock: self, _not_send: PhantomData })
        } else {
            None
        }
    }

    /// Returns a mutable reference to the wrapped value.
    ///
    /// Takes `&mut self`, so the borrow checker -- not the lock -- proves
    /// exclusivity; no atomic operation is performed.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<R: RawLock, T: ?Sized + Debug> Debug for Lock<R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_lock() {
            Some(guard) => f.debug_struct("Lock").field("data", &&*guard).finish(),
            None => f.debug_struct("Lock").field("data", &format_args!("<locked>")).finish(),
        }
    }
}

/// RAII guard returned by [`Lock::lock`] / [`Lock::try_lock`]. Releases the
/// lock when dropped.
#[must_use = "if unused the Lock will immediately unlock"]
pub struct LockGuard<'a, R: RawLock, T: ?Sized> {
    lock: &'a Lock<R, T>,
    // `*const ()` is neither `Send` nor `Sync`, which makes the guard `!Send`
    // without requiring the unstable `negative_impls` feature: unlocking
    // from a thread other than the one that locked would violate several
    // algorithms' preconditions (e.g. the PI lock's owner-tid check).
    _not_send: PhantomData<*const ()>,
}

unsafe impl<R: RawLock, T: ?Sized + Sync> Sync for LockGuard<'_, R, T> {}

impl<R: RawLock, T: ?Sized> Deref for LockGuard<'_, R, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard's existence proves this thread holds the lock.
        unsafe { &*self.lock.data.get() }
    }
}

impl<R: RawLock, T: ?Sized> DerefMut for LockGuard<'_, R, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard's existence proves this thread holds the lock.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<R: RawLock, T: ?Sized> Drop for LockGuard<'_, R, T> {
    fn drop(&mut self) {
        // SAFETY: the guard's existence proves this thread holds the lock.
        unsafe { self.lock.raw.unlock() }
    }
}

impl<R: RawLock, T: ?Sized + Debug> Debug for LockGuard<'_, R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&**self, f)
    }
}
