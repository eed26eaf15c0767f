//! Deferred one-shot callbacks
//!
//! Scripts schedule a callback to run after a delay of simulated time and
//! may cancel it by handle. The scheduler is one process-wide service shared
//! by every engine instance, injected explicitly so tests can drive it with
//! a fake clock (time only advances through `tick`). Due entries are handed
//! back to the frame driver in schedule order and fired inline, one after
//! another, on the same thread.

use rhai::FnPtr;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// A callback whose delay has elapsed.
#[derive(Debug)]
pub struct Due<C> {
    pub handle: String,
    pub callback: C,
}

#[derive(Debug)]
struct Entry<C> {
    handle: String,
    remaining: f32,
    callback: C,
}

#[derive(Debug)]
struct SchedulerState<C> {
    next_id: u64,
    pending: Vec<Entry<C>>,
}

/// One-shot callback scheduler driven by per-frame deltas.
#[derive(Debug)]
pub struct CallbackScheduler<C> {
    state: Mutex<SchedulerState<C>>,
}

impl<C> Default for CallbackScheduler<C> {
    fn default() -> Self {
        Self {
            state: Mutex::new(SchedulerState {
                next_id: 0,
                pending: Vec::new(),
            }),
        }
    }
}

impl<C> CallbackScheduler<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `callback` to fire once after `delay_seconds` of simulated
    /// time. Handles are generated and never reused, even for identical
    /// requests.
    pub fn wait(&self, delay_seconds: f32, callback: C) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let handle = format!("wait-{}", state.next_id);
        debug!(handle = handle, delay = delay_seconds, "Scheduled callback");
        state.pending.push(Entry {
            handle: handle.clone(),
            remaining: delay_seconds,
            callback,
        });
        handle
    }

    /// Remove a pending callback without firing it. Cancelling an unknown or
    /// already-fired handle is a no-op; returns whether anything was removed.
    pub fn cancel(&self, handle: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        let before = state.pending.len();
        state.pending.retain(|e| e.handle != handle);
        let removed = state.pending.len() != before;
        if removed {
            debug!(handle = handle, "Cancelled callback");
        } else {
            trace!(handle = handle, "Cancel was a no-op");
        }
        removed
    }

    /// Advance simulated time and drain the entries that came due, in
    /// schedule order. The caller fires them inline; the lock is not held
    /// while it does, so fired callbacks may schedule or cancel freely.
    pub fn tick(&self, dt: f32) -> Vec<Due<C>> {
        let mut state = self.state.lock().unwrap();
        let mut due = Vec::new();
        let mut remaining = Vec::with_capacity(state.pending.len());
        for mut entry in state.pending.drain(..) {
            entry.remaining -= dt;
            if entry.remaining <= 0.0 {
                due.push(Due {
                    handle: entry.handle,
                    callback: entry.callback,
                });
            } else {
                remaining.push(entry);
            }
        }
        state.pending = remaining;
        due
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }
}

/// A script-side callback: the function pointer plus the entity owning the
/// engine instance it must run against.
#[derive(Debug, Clone)]
pub struct ScriptCallback {
    pub owner: u64,
    pub fn_ptr: FnPtr,
}

/// The process-wide scheduler shared by all engine instances.
pub type SharedScheduler = Arc<CallbackScheduler<ScriptCallback>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_after_delay_elapses() {
        let scheduler = CallbackScheduler::new();
        scheduler.wait(1.0, "a");

        assert!(scheduler.tick(0.5).is_empty());
        let due = scheduler.tick(0.6);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].callback, "a");
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn cancel_before_firing_suppresses_callback() {
        let scheduler = CallbackScheduler::new();
        let handle = scheduler.wait(1.0, "a");

        assert!(scheduler.cancel(&handle));
        assert!(scheduler.tick(2.0).is_empty());
    }

    #[test]
    fn cancel_after_fire_or_unknown_is_noop() {
        let scheduler = CallbackScheduler::new();
        let handle = scheduler.wait(0.1, "a");
        assert_eq!(scheduler.tick(0.2).len(), 1);

        assert!(!scheduler.cancel(&handle));
        assert!(!scheduler.cancel("wait-999"));
    }

    #[test]
    fn handles_are_never_reused() {
        let scheduler = CallbackScheduler::new();
        let first = scheduler.wait(0.1, "a");
        scheduler.tick(1.0);
        let second = scheduler.wait(0.1, "a");
        assert_ne!(first, second);
    }

    #[test]
    fn due_entries_keep_schedule_order() {
        let scheduler = CallbackScheduler::new();
        scheduler.wait(0.2, "first");
        scheduler.wait(0.1, "second");
        scheduler.wait(0.3, "third");

        let due = scheduler.tick(0.25);
        let order: Vec<_> = due.iter().map(|d| d.callback).collect();
        assert_eq!(order, ["first", "second"]);
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    fn fired_callback_can_reschedule() {
        let scheduler = CallbackScheduler::new();
        scheduler.wait(0.1, "a");
        for due in scheduler.tick(0.2) {
            // No lock is held here, so re-entry is fine.
            scheduler.wait(0.5, due.callback);
        }
        assert_eq!(scheduler.pending_count(), 1);
    }
}
