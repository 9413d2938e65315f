use std::fmt;
use std::ops::{Deref, DerefMut};

/// Pads and aligns a value to 64 bytes to keep it off a cache line shared
/// with unrelated data.
///
/// Several lock algorithms (word-lock, parking-lot) pack their atomic state
/// and auxiliary bookkeeping into one struct; without padding, two locks that
/// happen to land in the same cache line would false-share under contention
/// and the benchmark would be measuring cache topology instead of the
/// algorithm. Modeled on `crossbeam-utils::CachePadded`.
#[repr(align(64))]
pub struct CachePadded<T> {
    value: T,
}

impl<T> CachePadded<T> {
    /// Wraps `value` in a cache-line-padded container.
    pub const fn new(value: T) -> Self {
        CachePadded { value }
    }

    /// Unwraps the padded value.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for CachePadded<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for CachePadded<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for CachePadded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachePadded").field("value", &self.value).finish()
    }
}

impl<T: Default> Default for CachePadded<T> {
    fn default() -> Self {
        CachePadded::new(T::default())
    }
}
