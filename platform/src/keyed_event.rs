//! NT keyed-event rendezvous primitive, Windows only.
//!
//! `NtWaitForKeyedEvent`/`NtReleaseKeyedEvent`/`NtCreateKeyedEvent` are
//! undocumented ntdll exports (no import library ships them), so they are
//! resolved dynamically via `GetProcAddress`, the same approach
//! `pitdicker/valet_parking`'s Windows backend uses.

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

use windows_sys::Win32::Foundation::HANDLE;
use windows_sys::Win32::System::LibraryLoader::{GetModuleHandleA, GetProcAddress};
use windows_sys::Win32::System::Threading::EVENT_ALL_ACCESS;

type NtCreateKeyedEventFn = unsafe extern "system" fn(
    handle_out: *mut HANDLE,
    desired_access: u32,
    object_attributes: *const c_void,
    flags: u32,
) -> i32;

type NtWaitForKeyedEventFn = unsafe extern "system" fn(
    handle: HANDLE,
    key: *const c_void,
    alertable: u8,
    timeout: *const i64,
) -> i32;

type NtReleaseKeyedEventFn = unsafe extern "system" fn(
    handle: HANDLE,
    key: *const c_void,
    alertable: u8,
    timeout: *const i64,
) -> i32;

type NtCloseFn = unsafe extern "system" fn(handle: HANDLE) -> i32;

const STATUS_SUCCESS: i32 = 0;

struct Functions {
    handle: HANDLE,
    wait: NtWaitForKeyedEventFn,
    release: NtReleaseKeyedEventFn,
    close: NtCloseFn,
}

// SAFETY: the handle and function pointers are process-wide and immutable
// once resolved; ntdll's keyed-event API is documented (informally) as
// thread-safe for concurrent wait/release on the same handle.
unsafe impl Send for Functions {}
unsafe impl Sync for Functions {}

impl Functions {
    /// Closes this handle. Only called on the losing side of the publish
    /// race below, where the handle was created but never made visible to
    /// any other thread, so nothing else can be using it.
    fn close(self) {
        // SAFETY: `self.handle` was returned by `NtCreateKeyedEvent` by this
        // same thread and never published; we are its sole owner.
        unsafe {
            (self.close)(self.handle);
        }
    }
}

fn resolve() -> Option<Functions> {
    // SAFETY: `ntdll.dll` is loaded into every Windows process; the byte
    // strings are valid nul-terminated ANSI names as `GetProcAddress` and
    // `GetModuleHandleA` require.
    unsafe {
        let ntdll = GetModuleHandleA(b"ntdll.dll\0".as_ptr());
        if ntdll == 0 {
            return None;
        }

        let create = GetProcAddress(ntdll, b"NtCreateKeyedEvent\0".as_ptr())?;
        let wait = GetProcAddress(ntdll, b"NtWaitForKeyedEvent\0".as_ptr())?;
        let release = GetProcAddress(ntdll, b"NtReleaseKeyedEvent\0".as_ptr())?;
        let close = GetProcAddress(ntdll, b"NtClose\0".as_ptr())?;

        let create: NtCreateKeyedEventFn = std::mem::transmute(create);
        let mut handle: HANDLE = 0;
        let status = create(&mut handle, EVENT_ALL_ACCESS, ptr::null(), 0);
        if status != STATUS_SUCCESS {
            return None;
        }

        Some(Functions {
            handle,
            wait: std::mem::transmute::<_, NtWaitForKeyedEventFn>(wait),
            release: std::mem::transmute::<_, NtReleaseKeyedEventFn>(release),
            close: std::mem::transmute::<_, NtCloseFn>(close),
        })
    }
}

/// Initialization-state tags for the process-wide handle: `UNINIT` ->
/// `IN_PROGRESS` -> `READY`. Kept as an explicit byte rather than folded
/// into a `OnceLock` so a losing thread can be told to close its own
/// (redundant) handle -- `OnceLock` alone cannot express that, since its
/// init closure runs at most once and so never produces a loser.
const UNINIT: u8 = 0;
const IN_PROGRESS: u8 = 1;
const READY: u8 = 2;
static INIT_STATE: AtomicU8 = AtomicU8::new(UNINIT);
static FUNCTIONS_PTR: AtomicPtr<Functions> = AtomicPtr::new(ptr::null_mut());

/// Returns the process-wide handle, racily resolving it if this is among
/// the first callers.
///
/// Every thread that observes anything short of `READY` resolves its own
/// candidate (including calling `NtCreateKeyedEvent`) rather than blocking
/// on a lock around the syscall; only the thread that wins the
/// `IN_PROGRESS -> READY` transition publishes its candidate, and every
/// loser closes the handle it just created instead of leaking it.
fn functions() -> Option<&'static Functions> {
    loop {
        match INIT_STATE.load(Ordering::Acquire) {
            READY => {
                let ptr = FUNCTIONS_PTR.load(Ordering::Acquire);
                // SAFETY: once READY, `FUNCTIONS_PTR` was published by
                // exactly one winning thread via `Ordering::Release` and is
                // never mutated again.
                return unsafe { ptr.as_ref() };
            }
            UNINIT => {
                // Advertise that resolution is underway. The result is
                // ignored: every racer resolves its own candidate below
                // regardless of who wins this transition.
                let _ = INIT_STATE.compare_exchange(
                    UNINIT,
                    IN_PROGRESS,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
                race_and_publish();
            }
            IN_PROGRESS => race_and_publish(),
            _ => unreachable!("INIT_STATE only ever holds UNINIT, IN_PROGRESS, or READY"),
        }
    }
}

/// Resolves this thread's own candidate handle and races to publish it,
/// closing it instead if another thread's candidate wins first.
fn race_and_publish() {
    match resolve() {
        None => {
            let _ =
                INIT_STATE.compare_exchange(IN_PROGRESS, READY, Ordering::AcqRel, Ordering::Acquire);
        }
        Some(funcs) => {
            let candidate = Box::into_raw(Box::new(funcs));
            if INIT_STATE
                .compare_exchange(IN_PROGRESS, READY, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                FUNCTIONS_PTR.store(candidate, Ordering::Release);
            } else {
                // SAFETY: `candidate` was allocated by this thread above and
                // has not been published or observed by anyone else.
                let lost = unsafe { Box::from_raw(candidate) };
                lost.close();
            }
        }
    }
}

/// Process-wide keyed-event handle, lazily created behind a CAS state
/// machine so concurrent first-users race safely: the winner creates the
/// handle and publishes it, losers observe the published handle instead of
/// creating (and leaking) their own.
///
/// Every wake performed via [`KeyedEvent::release`] blocks until matched by
/// a [`KeyedEvent::wait`] on the same key (and vice versa): this is tighter
/// handoff than a futex, at the cost of the releaser momentarily blocking if
/// no waiter has parked yet.
#[derive(Debug, Default)]
pub struct KeyedEvent {
    _private: (),
}

impl KeyedEvent {
    /// Returns a handle to the process-wide keyed event. Resolution of the
    /// underlying ntdll handle is deferred to the first `wait`/`release`
    /// call, not performed here.
    pub fn new() -> Self {
        KeyedEvent { _private: () }
    }

    /// Blocks until a matching [`release`](KeyedEvent::release) call on the
    /// same key. Falls back to a relaxed busy-wait if ntdll does not expose
    /// the keyed-event API (pre-Vista), which should not happen on any
    /// supported target.
    pub fn wait(&self, key: &AtomicU8) {
        if let Some(funcs) = functions() {
            let key_ptr = key as *const AtomicU8 as *const c_void;
            // SAFETY: `funcs.handle` was returned by `NtCreateKeyedEvent`
            // and is never closed for the process lifetime; `key_ptr` is
            // valid for the duration of the call.
            unsafe {
                (funcs.wait)(funcs.handle, key_ptr, 0, ptr::null());
            }
        } else {
            while key.load(Ordering::Acquire) != 0 {
                std::hint::spin_loop();
            }
        }
    }

    /// Wakes one thread parked on `key` via [`wait`](KeyedEvent::wait),
    /// blocking until one is available to match if necessary.
    pub fn release(&self, key: &AtomicU8) {
        if let Some(funcs) = functions() {
            let key_ptr = key as *const AtomicU8 as *const c_void;
            // SAFETY: same as `wait`.
            unsafe {
                (funcs.release)(funcs.handle, key_ptr, 0, ptr::null());
            }
        }
    }
}
