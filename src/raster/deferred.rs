//! Single-slot deferred task scheduler.

use crate::io::OneShotTimer;

use super::state::DeferredTask;

/// One pending task on one one-shot timer.
///
/// Scheduling replaces whatever was pending; the displaced task is handed
/// back so the caller can settle it.
pub struct DeferredScheduler<T: OneShotTimer> {
    timer: T,
    pending: Option<DeferredTask>,
}

impl<T: OneShotTimer> DeferredScheduler<T> {
    /// Wrap an idle timer.
    pub fn new(timer: T) -> Self {
        Self {
            timer,
            pending: None,
        }
    }

    /// Run `task` after `delay_ms`, replacing any pending task.
    pub fn schedule(&mut self, task: DeferredTask, delay_ms: u16) -> Option<DeferredTask> {
        let displaced = self.pending.replace(task);
        if let Some(old) = displaced {
            debug!("deferred {} replaced by {}", old, task);
        }
        self.timer.arm(delay_ms);
        displaced
    }

    /// Drop the pending task and disarm the timer.
    pub fn cancel(&mut self) -> Option<DeferredTask> {
        self.timer.cancel();
        self.pending.take()
    }

    /// Claim the task whose delay just elapsed.
    ///
    /// Call from the timer expiry. Returns `None` for a stale expiry.
    pub fn take_elapsed(&mut self) -> Option<DeferredTask> {
        self.pending.take()
    }

    /// Task currently waiting, if any.
    #[inline]
    pub fn pending(&self) -> Option<DeferredTask> {
        self.pending
    }

    /// The underlying timer.
    #[inline]
    pub fn timer(&self) -> &T {
        &self.timer
    }
}
