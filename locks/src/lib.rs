//! Nine mutual-exclusion algorithms sharing one contract ([`RawLock`]) and
//! one generic safe wrapper ([`Lock`]), so the benchmark driver can run an
//! identical worker loop over any of them.

#![warn(missing_docs, rust_2018_idioms)]

pub mod futex_lock;
pub mod lock;
pub mod mcs_lock;
pub mod parking_lot_lock;
pub mod raw_lock;
pub mod spin_lock;
pub mod spin_wait;
pub mod stack_lock;
pub mod ticket_lock;
pub mod word_lock;

#[cfg(target_os = "linux")]
pub mod pi_lock;

#[cfg(windows)]
pub mod keyed_event_lock;

pub use lock::{Lock, LockGuard};
pub use raw_lock::RawLock;

pub use futex_lock::FutexLock;
pub use mcs_lock::McsLock;
pub use parking_lot_lock::ParkingLotLock;
pub use spin_lock::SpinLock;
pub use stack_lock::StackLock;
pub use ticket_lock::TicketLock;
pub use word_lock::WordLock;

#[cfg(target_os = "linux")]
pub use pi_lock::PiLock;

#[cfg(windows)]
pub use keyed_event_lock::KeyedEventLock;

/// Identifies one of the nine lock algorithms without committing to its
/// concrete type, for use in CLI parsing and benchmark reporting.
///
/// [`PiLock`] and [`KeyedEventLock`] only exist on their respective
/// platforms; [`LockKind::is_available`] is how the CLI filters the
/// selectable set instead of failing to compile on the other platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKind {
    /// See [`SpinLock`].
    Spin,
    /// See [`TicketLock`].
    Ticket,
    /// See [`McsLock`].
    Mcs,
    /// See [`WordLock`].
    Word,
    /// See [`StackLock`].
    Stack,
    /// See [`FutexLock`].
    Futex,
    /// See `PiLock` (Linux only).
    Pi,
    /// See `KeyedEventLock` (Windows only).
    KeyedEvent,
    /// See [`ParkingLotLock`].
    ParkingLot,
}

impl LockKind {
    /// Every lock algorithm this crate defines, regardless of platform
    /// availability. Use [`LockKind::is_available`] to filter for the
    /// current target.
    pub const ALL: &'static [LockKind] = &[
        LockKind::Spin,
        LockKind::Ticket,
        LockKind::Mcs,
        LockKind::Word,
        LockKind::Stack,
        LockKind::Futex,
        LockKind::Pi,
        LockKind::KeyedEvent,
        LockKind::ParkingLot,
    ];

    /// The name used in CLI flags and benchmark output; matches each
    /// algorithm's [`RawLock::name`].
    pub const fn name(self) -> &'static str {
        match self {
            LockKind::Spin => "spin",
            LockKind::Ticket => "ticket",
            LockKind::Mcs => "mcs",
            LockKind::Word => "word_lock",
            LockKind::Stack => "stack_lock",
            LockKind::Futex => "futex_3state",
            LockKind::Pi => "pi_lock",
            LockKind::KeyedEvent => "keyed_event",
            LockKind::ParkingLot => "parking_lot",
        }
    }

    /// Parses a CLI-supplied name back into a [`LockKind`], independent of
    /// platform availability (a name can be recognized even if it can't be
    /// benchmarked here).
    pub fn from_name(name: &str) -> Option<LockKind> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Whether this algorithm can actually be benchmarked on the running
    /// target. [`LockKind::Pi`] needs Linux's `FUTEX_LOCK_PI`;
    /// [`LockKind::KeyedEvent`] needs `ntdll`'s keyed-event API.
    pub const fn is_available(self) -> bool {
        match self {
            LockKind::Pi => cfg!(target_os = "linux"),
            LockKind::KeyedEvent => cfg!(windows),
            _ => true,
        }
    }
}

impl std::fmt::Display for LockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
