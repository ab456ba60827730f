//! Panic handling across the worker/job boundary.
//!
//! Worker threads must never unwind out of their top-level loop: if they did,
//! the pool's internal state (the task queue, the run-in-progress latches)
//! could be left half-updated and every other thread sharing it would be
//! looking at garbage. So user-supplied closures (tasks, workloads) are run
//! under `catch_unwind`, and anything escaping *that* boundary aborts instead
//! of unwinding further.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

/// Executes `func` and translates any panic into an `Err`, the same way
/// `std::panic::catch_unwind` does, but always treating the closure as
/// unwind-safe: we only ever use this to run caller-supplied closures that
/// we're about to report the panic from (not retry), so there's nothing left
/// to observe in a "broken" state.
pub(crate) fn halt_unwinding<F, R>(func: F) -> thread::Result<R>
where
    F: FnOnce() -> R,
{
    panic::catch_unwind(AssertUnwindSafe(func))
}

/// A guard that aborts the process if dropped while unwinding.
///
/// Use this to bracket code that must not panic a second time while already
/// handling a first panic (e.g. a user panic handler, or the bit of worker
/// bookkeeping around a caught panic). `mem::forget` it once that code has
/// run to completion without panicking.
pub(crate) struct AbortIfPanic;

impl Drop for AbortIfPanic {
    fn drop(&mut self) {
        eprintln!("chunkpool: panic while already handling a panic; aborting");
        std::process::abort();
    }
}

/// Default panic payload formatter, used when no `panic_handler` is
/// configured on the pool: best-effort message extraction, falling back to
/// an opaque marker for payloads that are neither `&str` nor `String`.
pub(crate) fn payload_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
