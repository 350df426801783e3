/*!
 * Per-device delayed-action scheduling.
 *
 * Shutters schedule a single stop action to fire once after a computed
 * duration, and every new command replaces the pending action. The
 * [`ActionTimer`] holds that one slot: an epoch counter plus the task
 * handle of the currently scheduled action.
 *
 * Cancellation protocol: the timer lives inside the owning device's mutex.
 * A command cancels under the lock (epoch bump + abort), spawns the
 * replacement task, and arms it. A firing action re-acquires the same lock
 * and checks `is_live` with the epoch it was armed with before producing
 * any effect. A cancelled action can therefore never fire after `cancel`
 * returns, and a fire racing a cancel either completes atomically before
 * the command takes the lock or sees a stale epoch and backs off.
 */
use tokio::task::JoinHandle;
use tracing::trace;

/// A single cancellable delayed-action slot
///
/// At most one action is pending at a time.
#[derive(Debug, Default)]
pub struct ActionTimer {
    epoch: u64,
    handle: Option<JoinHandle<()>>,
}

impl ActionTimer {
    /// Create a new, empty timer slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the pending action, if any, and return the new epoch
    ///
    /// The returned epoch identifies the next action to be armed; every
    /// previously scheduled action is invalidated.
    pub fn cancel(&mut self) -> u64 {
        self.epoch += 1;
        if let Some(handle) = self.handle.take() {
            trace!("Cancelling pending scheduled action");
            handle.abort();
        }
        self.epoch
    }

    /// Arm the slot with the task of a freshly scheduled action
    pub fn arm(&mut self, handle: JoinHandle<()>) {
        debug_assert!(
            !self.is_pending(),
            "arming an ActionTimer that still has a pending action"
        );
        self.handle = Some(handle);
    }

    /// Check whether an action armed with `epoch` is still the live one
    pub fn is_live(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    /// Check whether an action is scheduled and not yet finished
    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Release the slot after the armed action has fired
    pub fn disarm(&mut self) {
        self.handle = None;
    }
}
