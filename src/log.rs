//! Internal event log, gated behind the `internal-debug` feature.
//!
//! A cheap no-op when the feature is off, and a channel of structured
//! `Event`s a test or diagnostic tool can drain when it's on. This is
//! deliberately not wired to the `log`/`tracing` crates — it's a
//! development aid for this crate's own concurrency bugs, not
//! application-facing observability.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    ThreadStart { worker: usize },
    ThreadTerminate { worker: usize },
    TaskQueued { count: usize },
    TaskDequeued { worker: usize },
    RunStarted { workers: usize, count: usize },
    RunFinished,
    RunAborted,
    WorkerPanicked { worker: usize },
}

#[cfg(feature = "internal-debug")]
mod imp {
    use super::Event;
    use crossbeam_channel::{unbounded, Receiver, Sender};

    #[derive(Clone, Debug)]
    pub struct Logger {
        sender: Sender<Event>,
    }

    impl Logger {
        pub fn new() -> (Logger, Receiver<Event>) {
            let (sender, receiver) = unbounded();
            (Logger { sender }, receiver)
        }

        #[inline]
        pub fn log(&self, event: impl FnOnce() -> Event) {
            // A full channel or a dropped receiver both just mean nobody is
            // listening; never let the log hold up real work.
            let _ = self.sender.try_send(event());
        }
    }
}

#[cfg(not(feature = "internal-debug"))]
mod imp {
    use super::Event;

    #[derive(Clone, Debug)]
    pub struct Logger;

    impl Logger {
        pub fn new() -> (Logger, ()) {
            (Logger, ())
        }

        #[inline(always)]
        pub fn log(&self, _event: impl FnOnce() -> Event) {}
    }
}

pub(crate) use imp::Logger;
