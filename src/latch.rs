//! Synchronization events: one-shot latch, multi-notifier countdown latch,
//! and a plain countdown counter.
//!
//! All three share one backing primitive, a `Mutex` + `Condvar` pair (the
//! mutex/condvar variant of the original `Event`/`EventAtomic` pair, per
//! the crate's own design notes choosing a single implementation rather
//! than shipping both). This also gives every latch a `wait_timeout` for
//! free, which the `std::atomic::wait` variant can't offer on stable Rust.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Common waiting behavior shared by the three latch kinds.
pub(crate) trait Latch {
    /// True once the latch has fired.
    fn probe(&self) -> bool;

    /// Blocks until the latch fires.
    fn wait(&self);
}

/// A boolean flag with blocking wait semantics.
///
/// Starts unset. `notify_one`/`notify_all` set it (and wake one/all
/// waiters); `reset` clears it again. Once set, every `wait` call returns
/// promptly until the next `reset`.
pub struct OneShotLatch {
    state: Mutex<bool>,
    cv: Condvar,
}

impl OneShotLatch {
    pub fn new() -> Self {
        OneShotLatch {
            state: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    pub fn is_set(&self) -> bool {
        *self.state.lock().unwrap()
    }

    pub fn notify_one(&self) {
        let mut set = self.state.lock().unwrap();
        *set = true;
        self.cv.notify_one();
    }

    pub fn notify_all(&self) {
        let mut set = self.state.lock().unwrap();
        *set = true;
        self.cv.notify_all();
    }

    pub fn wait(&self) {
        let guard = self.state.lock().unwrap();
        drop(
            self.cv
                .wait_while(guard, |set| !*set)
                .unwrap(),
        );
    }

    /// As `wait`, but gives up after `timeout` and reports whether the
    /// latch had been set by then.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.state.lock().unwrap();
        if *guard {
            return true;
        }
        let (guard, _) = self
            .cv
            .wait_timeout_while(guard, timeout, |set| !*set)
            .unwrap();
        *guard
    }

    /// Clears the flag. Caller must ensure no thread is currently blocked in
    /// `wait`/`wait_timeout` — resetting out from under a waiter is a
    /// programming error, not a recoverable condition.
    pub fn reset(&self) {
        let mut set = self.state.lock().unwrap();
        *set = false;
    }
}

impl Latch for OneShotLatch {
    fn probe(&self) -> bool {
        self.is_set()
    }

    fn wait(&self) {
        OneShotLatch::wait(self)
    }
}

struct CountdownState {
    remaining: usize,
    fired: bool,
}

/// A decrementing counter with an embedded one-shot latch.
///
/// Constructed (or reset) with an initial count `k`. Each `notify_one`/
/// `notify_all` call decrements the counter; whichever caller drives it to
/// zero fires the latch. If constructed with `k == 0` the latch is already
/// set — see DESIGN.md OQ-1 for why that's the chosen behavior at a zero
/// count rather than a latch nothing can ever fire.
pub struct CountdownLatch {
    state: Mutex<CountdownState>,
    cv: Condvar,
}

impl CountdownLatch {
    pub fn new(count: usize) -> Self {
        CountdownLatch {
            state: Mutex::new(CountdownState {
                remaining: count,
                fired: count == 0,
            }),
            cv: Condvar::new(),
        }
    }

    pub fn is_set(&self) -> bool {
        self.state.lock().unwrap().fired
    }

    fn decrement_and_fire(&self, notify_all: bool) {
        let mut state = self.state.lock().unwrap();
        debug_assert!(state.remaining > 0, "countdown latch over-notified");
        state.remaining = state.remaining.saturating_sub(1);
        if state.remaining == 0 {
            state.fired = true;
        }
        if notify_all {
            self.cv.notify_all();
        } else {
            self.cv.notify_one();
        }
    }

    pub fn notify_one(&self) {
        self.decrement_and_fire(false);
    }

    pub fn notify_all(&self) {
        self.decrement_and_fire(true);
    }

    pub fn wait(&self) {
        let guard = self.state.lock().unwrap();
        drop(self.cv.wait_while(guard, |s| !s.fired).unwrap());
    }

    /// Atomically restores the counter to `count` and clears the latch
    /// (unless `count == 0`, in which case it's already set).
    pub fn reset(&self, count: usize) {
        let mut state = self.state.lock().unwrap();
        state.remaining = count;
        state.fired = count == 0;
    }
}

impl Latch for CountdownLatch {
    fn probe(&self) -> bool {
        self.is_set()
    }

    fn wait(&self) {
        CountdownLatch::wait(self)
    }
}

/// A counter callers may both increment and decrement; reaching zero on a
/// decrement fires an embedded latch. Unlike `CountdownLatch`, both
/// directions are exposed and the initial value is zero.
pub struct Counter {
    value: Mutex<isize>,
    cv: Condvar,
}

impl Counter {
    pub fn new() -> Self {
        Counter {
            value: Mutex::new(0),
            cv: Condvar::new(),
        }
    }

    /// Pre-increment: returns the new value.
    pub fn increment(&self) -> isize {
        let mut v = self.value.lock().unwrap();
        *v += 1;
        *v
    }

    /// Pre-decrement: returns the new value, firing the latch (waking all
    /// waiters) exactly when the result is zero.
    pub fn decrement(&self) -> isize {
        let mut v = self.value.lock().unwrap();
        *v -= 1;
        let new = *v;
        if new == 0 {
            self.cv.notify_all();
        }
        new
    }

    pub fn is_set(&self) -> bool {
        *self.value.lock().unwrap() <= 0
    }

    pub fn reset(&self) {
        *self.value.lock().unwrap() = 0;
    }

    /// Returns immediately if the counter is already non-positive;
    /// otherwise blocks until a decrement drives it to zero.
    pub fn wait(&self) {
        let guard = self.value.lock().unwrap();
        drop(self.cv.wait_while(guard, |v| *v > 0).unwrap());
    }
}

impl Latch for Counter {
    fn probe(&self) -> bool {
        self.is_set()
    }

    fn wait(&self) {
        Counter::wait(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn one_shot_latch_replay_after_reset() {
        let latch = OneShotLatch::new();
        assert!(!latch.is_set());
        latch.notify_all();
        assert!(latch.is_set());
        latch.wait(); // must not block
        latch.reset();
        assert!(!latch.is_set());
    }

    #[test]
    fn one_shot_latch_wait_timeout() {
        let latch = OneShotLatch::new();
        assert!(!latch.wait_timeout(Duration::from_millis(10)));
        latch.notify_one();
        assert!(latch.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn countdown_latch_zero_is_already_set() {
        let latch = CountdownLatch::new(0);
        assert!(latch.is_set());
        latch.wait(); // must not block
    }

    #[test]
    fn countdown_latch_fires_once_per_generation() {
        // S5: 16 notifiers race to drive the counter to zero; exactly one
        // generation-completing notify should unblock the waiter, and the
        // waiter should only ever observe the fully-fired state.
        let latch = Arc::new(CountdownLatch::new(16));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let latch = Arc::clone(&latch);
                thread::spawn(move || latch.notify_one())
            })
            .collect();
        latch.wait();
        for h in handles {
            h.join().unwrap();
        }
        assert!(latch.is_set());
    }

    #[test]
    fn counter_fires_on_reaching_zero_each_time() {
        let counter = Counter::new();
        assert!(counter.is_set());
        counter.increment();
        counter.increment();
        assert!(!counter.is_set());
        assert_eq!(counter.decrement(), 1);
        assert!(!counter.is_set());
        assert_eq!(counter.decrement(), 0);
        assert!(counter.is_set());
        counter.wait(); // must not block now that it's back at zero
    }
}
