//! Thread pool and task pool.
//!
//! `TaskPoolBuilder` is the one place pool configuration is assembled
//! before any thread exists, so a `TaskPool` value always has its worker
//! threads already running by the time a caller can observe it — there's
//! no partially-constructed state, with a separate call needed to actually
//! spawn threads, to reason about.

use crate::error::BuildError;
use crate::job::Task;
use crate::log::{Event, Logger};
use crate::queue::Queue;
use crate::unwind;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

type PanicHandler = dyn Fn(Box<dyn Any + Send>) + Send + Sync;
type ThreadNamer = dyn Fn(usize) -> String + Send + Sync;

/// Configures and builds a [`TaskPool`].
///
/// Hardware-concurrency discovery is left entirely to the caller, so there
/// is no default thread count: callers must call
/// [`num_threads`](Self::num_threads).
#[derive(Default)]
pub struct TaskPoolBuilder {
    num_threads: usize,
    stack_size: Option<usize>,
    thread_name: Option<Arc<ThreadNamer>>,
    panic_handler: Option<Arc<PanicHandler>>,
}

impl TaskPoolBuilder {
    pub fn new() -> Self {
        TaskPoolBuilder::default()
    }

    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    pub fn thread_name<F>(mut self, namer: F) -> Self
    where
        F: Fn(usize) -> String + Send + Sync + 'static,
    {
        self.thread_name = Some(Arc::new(namer));
        self
    }

    /// Installs a handler invoked (on the worker thread) whenever a queued
    /// task panics. Without one, a panicking task's payload is just printed
    /// to stderr and the worker keeps running — a bad task must never wedge
    /// the pool for everyone else.
    pub fn panic_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(Box<dyn Any + Send>) + Send + Sync + 'static,
    {
        self.panic_handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<TaskPool, BuildError> {
        if self.num_threads == 0 {
            return Err(BuildError::zero_threads());
        }

        let queue = Arc::new(Queue::new());
        let exit = Arc::new(AtomicBool::new(false));
        let (logger, _log_receiver) = Logger::new();

        let mut threads = Vec::with_capacity(self.num_threads);
        for index in 0..self.num_threads {
            let queue = Arc::clone(&queue);
            let exit = Arc::clone(&exit);
            let logger = logger.clone();
            let panic_handler = self.panic_handler.clone();

            let mut builder = thread::Builder::new();
            if let Some(namer) = &self.thread_name {
                builder = builder.name(namer(index));
            }
            if let Some(stack_size) = self.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let handle = builder
                .spawn(move || worker_loop(index, &queue, &exit, panic_handler.as_deref(), &logger))
                .map_err(BuildError::io)?;
            threads.push(handle);
        }

        Ok(TaskPool {
            queue,
            threads,
            exit,
            logger,
        })
    }
}

fn worker_loop(
    index: usize,
    queue: &Queue,
    exit: &AtomicBool,
    panic_handler: Option<&PanicHandler>,
    logger: &Logger,
) {
    logger.log(|| Event::ThreadStart { worker: index });

    loop {
        if exit.load(Ordering::Acquire) {
            break;
        }

        let task = match queue.dequeue() {
            Some(task) => task,
            None => break, // shutdown sentinel, or the queue was torn down
        };
        logger.log(|| Event::TaskDequeued { worker: index });

        if let Err(payload) = unwind::halt_unwinding(|| task.call(index)) {
            logger.log(|| Event::WorkerPanicked { worker: index });
            match panic_handler {
                Some(handler) => {
                    // If the handler itself panics, we're out of good
                    // options for keeping this worker's invariants intact.
                    let abort_guard = unwind::AbortIfPanic;
                    handler(payload);
                    std::mem::forget(abort_guard);
                }
                None => {
                    eprintln!(
                        "chunkpool: worker {} panicked: {}",
                        index,
                        unwind::payload_message(&*payload)
                    );
                }
            }
        }
    }

    logger.log(|| Event::ThreadTerminate { worker: index });
}

/// Owns a thread pool and a task queue; dispatches queued tasks to
/// long-lived worker threads.
#[derive(Debug)]
pub struct TaskPool {
    queue: Arc<Queue>,
    threads: Vec<JoinHandle<()>>,
    exit: Arc<AtomicBool>,
    logger: Logger,
}

impl TaskPool {
    /// Enqueues `count` copies of `task` — used by the parallel processor to
    /// fan the same driver out to every worker.
    pub fn queue_task(&self, task: Task, count: usize) {
        for _ in 0..count {
            self.queue.enqueue(task.clone());
        }
        self.logger.log(|| Event::TaskQueued { count });
    }

    /// Drains unstarted work from the queue.
    pub fn clear_tasks(&self) {
        self.queue.clear();
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn task_count(&self) -> usize {
        self.queue.len()
    }

    pub fn has_tasks(&self) -> bool {
        !self.queue.is_empty()
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        // Release-store before the wake-ups below: any worker that observes
        // `exit` is guaranteed to also observe it on the *next* loop
        // iteration even without the shutdown sentinel, but we still send
        // one sentinel per thread so a worker already blocked in
        // `Queue::dequeue` wakes immediately rather than waiting for a task
        // that will never come.
        self.exit.store(true, Ordering::Release);
        for _ in 0..self.threads.len() {
            self.queue.push_shutdown();
        }
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::time::Duration;

    #[test]
    fn zero_threads_is_rejected() {
        let err = TaskPoolBuilder::new().num_threads(0).build();
        assert!(err.is_err());
    }

    #[test]
    fn tasks_run_on_some_worker() {
        let pool = TaskPoolBuilder::new().num_threads(2).build().unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(2));
        for _ in 0..2 {
            let done = Arc::clone(&done);
            let barrier = Arc::clone(&barrier);
            pool.queue_task(
                Task::new(move |_worker_id| {
                    done.fetch_add(1, Ordering::SeqCst);
                    barrier.wait();
                }),
                1,
            );
        }
        barrier.wait();
        // give the fetch_add on the "losing" thread time to land
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(done.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn clear_tasks_drains_unstarted_work() {
        let pool = TaskPoolBuilder::new().num_threads(1).build().unwrap();
        // Occupy the one worker so queued-after tasks stay pending.
        let block = Arc::new(std::sync::Mutex::new(()));
        let guard = block.lock().unwrap();
        let block2 = Arc::clone(&block);
        pool.queue_task(Task::new(move |_| drop(block2.lock().unwrap())), 1);

        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = Arc::clone(&ran);
        pool.queue_task(Task::new(move |_| { ran2.fetch_add(1, Ordering::SeqCst); }), 3);
        assert_eq!(pool.task_count(), 3);
        pool.clear_tasks();
        assert!(!pool.has_tasks());
        drop(guard);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_task_does_not_wedge_the_pool() {
        let seen_panic = Arc::new(AtomicUsize::new(0));
        let seen_panic2 = Arc::clone(&seen_panic);
        let pool = TaskPoolBuilder::new()
            .num_threads(1)
            .panic_handler(move |_payload| {
                seen_panic2.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        pool.queue_task(Task::new(|_| panic!("boom")), 1);

        let recovered = Arc::new(AtomicUsize::new(0));
        let recovered2 = Arc::clone(&recovered);
        pool.queue_task(Task::new(move |_| { recovered2.store(1, Ordering::SeqCst); }), 1);

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(seen_panic.load(Ordering::SeqCst), 1);
        assert_eq!(recovered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_joins_workers_blocked_in_dequeue() {
        let pool = TaskPoolBuilder::new().num_threads(4).build().unwrap();
        drop(pool); // must return promptly; workers have nothing queued
    }
}
