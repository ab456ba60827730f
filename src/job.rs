//! The type-erased task handle queued into a `TaskPool`.
//!
//! Bound leading arguments are just closure captures here rather than a
//! hand-rolled binder type, so type erasure only needs to happen in the one
//! place it's actually required: the task queue. `Task` is that one place.

use std::sync::Arc;

/// A type-erased, cheaply-cloneable unit of work, invoked with the id of
/// the worker thread running it. Cloning bumps an `Arc` refcount rather
/// than duplicating the closure, so `TaskPool::queue_task` can enqueue many
/// copies of the same driver task (one per worker) without re-allocating.
#[derive(Clone)]
pub struct Task(Arc<dyn Fn(usize) + Send + Sync>);

impl Task {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        Task(Arc::new(f))
    }

    #[inline]
    pub(crate) fn call(&self, worker_id: usize) {
        (self.0)(worker_id)
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Task(..)")
    }
}
