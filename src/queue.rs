//! The bounded-wait task queue.
//!
//! Backed by `crossbeam_channel::unbounded`. A blocking `recv()` gives
//! workers a dequeue that doesn't spin when the queue is empty, and
//! `len()`/`is_empty()` give a snapshot inspection of pending work.
//!
//! An exit flag alone can't wake a thread already blocked in a plain
//! `recv()` — nothing ever arrives to make it check the flag again.
//! `WorkItem` closes that gap: shutdown is a queue message, not a
//! side-channel flag, so a blocked `recv()` always wakes when the pool
//! drops.

use crate::job::Task;
use crossbeam_channel::{unbounded, Receiver, Sender};

#[derive(Debug)]
pub(crate) enum WorkItem {
    Run(Task),
    Shutdown,
}

#[derive(Debug)]
pub(crate) struct Queue {
    sender: Sender<WorkItem>,
    receiver: Receiver<WorkItem>,
}

impl Queue {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = unbounded();
        Queue { sender, receiver }
    }

    /// Appends a runnable task. Never blocks (the channel is unbounded).
    pub(crate) fn enqueue(&self, task: Task) {
        // The only way `send` fails is if every `Receiver` has been
        // dropped, which can't happen while this `Queue` (which owns one)
        // is alive.
        let _ = self.sender.send(WorkItem::Run(task));
    }

    /// Wakes exactly one blocked `dequeue` with a shutdown signal.
    pub(crate) fn push_shutdown(&self) {
        let _ = self.sender.send(WorkItem::Shutdown);
    }

    /// Blocks until a task is available, or until a shutdown signal (or a
    /// closed channel) arrives, in which case it returns `None`.
    pub(crate) fn dequeue(&self) -> Option<Task> {
        match self.receiver.recv() {
            Ok(WorkItem::Run(task)) => Some(task),
            Ok(WorkItem::Shutdown) | Err(_) => None,
        }
    }

    /// Drains all pending, not-yet-started items (including any shutdown
    /// signals already queued — callers that need to guarantee shutdown
    /// delivery push fresh ones afterward).
    pub(crate) fn clear(&self) {
        while self.receiver.try_recv().is_ok() {}
    }

    /// Snapshot length; may be stale the instant it's read.
    pub(crate) fn len(&self) -> usize {
        self.receiver.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
