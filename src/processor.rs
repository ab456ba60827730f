//! The parallel processor.
//!
//! Partitions a buffer into dynamically-claimed chunks and drives a
//! caller-supplied workload over it across a pool of worker threads,
//! coordinating the run's start/finish/abort through the latches in
//! [`crate::latch`].
//!
//! The processor is generic over the workload closure `F` rather than
//! type-erased, so the workload can inline at the call site. Type erasure
//! happens only at the task-queue boundary, via one [`Task`] per run that
//! closes over an `Arc<Inner<T, F>>`.
//!
//! `Processor<'p, T, F>` borrows the `&'p TaskPool` it dispatches onto, so
//! the compiler — not just a documented invariant — enforces that a
//! processor must not outlive its pool.

use crate::job::Task;
use crate::latch::{CountdownLatch, OneShotLatch};
use crate::pool::TaskPool;
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicUsize, Ordering};
use std::sync::Arc;

struct Descriptor<T> {
    // Every worker CASes this on every chunk claim; `count` and `data` are
    // only ever written once per run and read thereafter, so padding the
    // cursor onto its own cache line keeps that contention from bouncing
    // the other two fields between cores too.
    cursor: CachePadded<AtomicUsize>,
    count: AtomicUsize,
    data: AtomicPtr<T>,
}

impl<T> Descriptor<T> {
    fn new() -> Self {
        Descriptor {
            cursor: CachePadded::new(AtomicUsize::new(0)),
            count: AtomicUsize::new(0),
            data: AtomicPtr::new(std::ptr::null_mut()),
        }
    }
}

struct Inner<T, F> {
    descriptor: Descriptor<T>,
    chunk: AtomicUsize,
    aborting: AtomicBool,
    start_latch: OneShotLatch,
    finish_latch: CountdownLatch,
    workload: F,
}

// SAFETY: `Inner` is shared across worker threads purely through the
// synchronized fields above; the only thread-specific payload is the raw
// `data` pointer, which is only ever dereferenced for the `[lo, hi)` range a
// worker has just exclusively claimed via the cursor CAS, and `workload` is
// bounded `Send + Sync` by `Processor::new`.
unsafe impl<T: Send, F: Send + Sync> Send for Inner<T, F> {}
unsafe impl<T: Send, F: Send + Sync> Sync for Inner<T, F> {}

impl<T, F> Inner<T, F>
where
    T: Send,
    F: Fn(usize, &mut T) + Send + Sync,
{
    /// Driver task body: wait for the run to start, then claim and process
    /// chunks until none remain or abort is signalled.
    ///
    /// The finish latch is decremented through a drop guard rather than a
    /// plain call after the loop: a panicking workload unwinds out of
    /// `process_one` (caught further up, in the worker's own task-level
    /// `catch_unwind`), and without the guard that unwind would skip the
    /// notify, leaving every future `wait_for_completion` blocked forever.
    fn drive(&self, worker_id: usize) {
        self.start_latch.wait();

        struct NotifyOnExit<'a>(&'a CountdownLatch);
        impl Drop for NotifyOnExit<'_> {
            fn drop(&mut self) {
                self.0.notify_one();
            }
        }
        let _notify = NotifyOnExit(&self.finish_latch);

        while self.process_one(worker_id) {}
    }

    /// Claims one chunk and applies the workload to it in series. Returns
    /// `false` once processing is complete (cursor reached `count`, or
    /// abort was signalled).
    fn process_one(&self, worker_id: usize) -> bool {
        if self.aborting.load(Ordering::Acquire) {
            return false;
        }

        let count = self.descriptor.count.load(Ordering::Acquire);
        let chunk = self.chunk.load(Ordering::Relaxed).max(1);

        let mut old = self.descriptor.cursor.load(Ordering::Acquire);
        let new = loop {
            if old == count {
                return false;
            }
            let candidate = old.saturating_add(chunk).min(count);
            match self.descriptor.cursor.compare_exchange_weak(
                old,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break candidate,
                Err(current) => old = current,
            }
        };

        let ptr = self.descriptor.data.load(Ordering::Acquire);
        for i in old..new {
            // SAFETY: `[lo, hi)` ranges handed out by the cursor CAS never
            // overlap, so no two workers ever hold the same element at
            // once; `ptr` was published (with `Release`) before the start
            // latch fired, and the caller contract (see
            // `Processor::start_processing`) guarantees it stays valid and
            // untouched by anyone else until the run completes.
            let elem = unsafe { &mut *ptr.add(i) };
            (self.workload)(worker_id, elem);
        }

        true
    }
}

/// Orchestrates one processing run at a time over a pool of workers.
///
/// Dropping a `Processor` unconditionally aborts any in-flight run and
/// blocks until every driver task has left the closure, so it is always
/// safe to drop one mid-run.
pub struct Processor<'p, T, F> {
    pool: &'p TaskPool,
    inner: Arc<Inner<T, F>>,
}

impl<'p, T, F> Processor<'p, T, F>
where
    T: Send + 'static,
    F: Fn(usize, &mut T) + Send + Sync + 'static,
{
    /// Binds to a task pool and stores the workload. No run is in progress
    /// initially: the start latch is unset and the finish latch's count is
    /// zero, so it's already set.
    pub fn new(pool: &'p TaskPool, workload: F) -> Self {
        Processor {
            pool,
            inner: Arc::new(Inner {
                descriptor: Descriptor::new(),
                chunk: AtomicUsize::new(1),
                aborting: AtomicBool::new(false),
                start_latch: OneShotLatch::new(),
                finish_latch: CountdownLatch::new(0),
                workload,
            }),
        }
    }

    /// Starts a run over `count` elements beginning at `data`, split into
    /// chunks of (at least) `chunk` elements (a `chunk` of 0 is silently
    /// clamped to 1), dispatched across `workers` driver tasks. Returns
    /// whether the run actually started — it's rejected (not an error) if a
    /// run is already in progress or being aborted.
    ///
    /// # Safety
    ///
    /// `data` must point to `count` valid, initialized, exclusively-owned
    /// `T` values, and the caller must not read or write `data[0..count)`,
    /// nor deallocate the memory it points into, until a subsequent call to
    /// [`wait_for_completion`](Self::wait_for_completion) or
    /// [`abort_processing`](Self::abort_processing) returns. Prefer
    /// [`process_slice`](Self::process_slice), which upholds this
    /// automatically by borrowing the slice for the whole call.
    pub unsafe fn start_processing(
        &self,
        data: *mut T,
        count: usize,
        chunk: usize,
        workers: usize,
    ) -> bool {
        if !self.can_start_processing() {
            return false;
        }

        self.inner.finish_latch.reset(workers);
        self.inner.start_latch.reset();
        self.inner.descriptor.cursor.store(0, Ordering::Relaxed);
        self.inner.descriptor.count.store(count, Ordering::Release);
        self.inner.descriptor.data.store(data, Ordering::Release);
        self.inner.chunk.store(chunk.max(1), Ordering::Relaxed);

        let inner = Arc::clone(&self.inner);
        let task = Task::new(move |worker_id| inner.drive(worker_id));
        self.pool.queue_task(task, workers);

        self.inner.start_latch.notify_all();
        true
    }

    /// Starts a run over `data`, then blocks until it completes. Always
    /// safe: the `&mut [T]` borrow lasts exactly as long as the run does,
    /// so the compiler — not a documented contract — keeps the caller from
    /// touching the buffer while workers own it.
    pub fn process_slice(&self, data: &mut [T], chunk: usize, workers: usize) -> bool {
        let count = data.len();
        let ptr = data.as_mut_ptr();
        // SAFETY: `ptr` is valid for `count` elements and `data`'s
        // exclusive borrow is held until `wait_for_completion` returns
        // below, satisfying `start_processing`'s contract.
        let started = unsafe { self.start_processing(ptr, count, chunk, workers) };
        if started {
            self.wait_for_completion();
        }
        started
    }

    /// Blocks until the in-flight run finishes, then resets both events to
    /// the idle state. A no-op if no run is in progress (idempotent).
    pub fn wait_for_completion(&self) {
        self.inner.finish_latch.wait();
        self.inner.start_latch.reset();
    }

    /// If a run is in progress: signals abort, forces the cursor to the
    /// end of the range so no worker claims another chunk, waits for every
    /// driver task to notice and exit, then clears the abort flag. Returns
    /// whether a run was actually in progress to abort.
    pub fn abort_processing(&self) -> bool {
        if !self.in_progress() {
            return false;
        }

        self.inner.aborting.store(true, Ordering::Release);
        let count = self.inner.descriptor.count.load(Ordering::Acquire);
        self.inner.descriptor.cursor.store(count, Ordering::Release);

        self.wait_for_completion();

        self.inner.aborting.store(false, Ordering::Release);
        true
    }

    pub fn is_aborting(&self) -> bool {
        self.inner.aborting.load(Ordering::Acquire)
    }

    /// True once `start_processing` has returned true and the run hasn't
    /// finished yet.
    pub fn in_progress(&self) -> bool {
        self.inner.start_latch.is_set() && !self.inner.finish_latch.is_set()
    }

    pub fn can_start_processing(&self) -> bool {
        !self.inner.aborting.load(Ordering::Acquire) && !self.in_progress()
    }
}

impl<'p, T, F> Drop for Processor<'p, T, F> {
    fn drop(&mut self) {
        // Aborting unconditionally on drop guarantees no driver task is
        // still touching `inner` by the time this call returns, even though
        // other `Arc<Inner<T, F>>` clones may briefly outlive `self` inside
        // worker threads that are in the process of exiting.
        //
        // `abort_processing`/`in_progress`/etc. don't need `T: Send +
        // 'static` or `F: 'static`, so call them directly rather than
        // through the bounded inherent impl.
        if self.inner.start_latch.is_set() && !self.inner.finish_latch.is_set() {
            self.inner.aborting.store(true, Ordering::Release);
            let count = self.inner.descriptor.count.load(Ordering::Acquire);
            self.inner.descriptor.cursor.store(count, Ordering::Release);
            self.inner.finish_latch.wait();
            self.inner.start_latch.reset();
            self.inner.aborting.store(false, Ordering::Release);
        }
    }
}
