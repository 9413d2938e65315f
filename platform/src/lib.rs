//! Per-OS primitives consumed by the lock algorithms in `lockbench-locks`.
//!
//! Everything in here is an external collaborator from the benchmark's point
//! of view: a thin, testable wrapper around whatever the host OS gives us for
//! yielding the CPU, reading a monotonic clock, and blocking/waking a single
//! thread. None of it encodes locking policy; that lives in `lockbench-locks`.

#![warn(missing_docs, rust_2018_idioms)]

mod cache_padded;
mod clock;
mod event;
mod futex;
mod thread_id;
mod yield_hints;

#[cfg(windows)]
mod keyed_event;

pub use cache_padded::CachePadded;
pub use clock::monotonic_nanoseconds;
pub use event::Event;
pub use futex::Futex;
pub use thread_id::current_thread_id;
pub use yield_hints::{yield_cpu, yield_thread};

#[cfg(windows)]
pub use keyed_event::KeyedEvent;
