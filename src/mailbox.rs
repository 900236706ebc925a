use parking_lot::Mutex;
use tracing::{debug, error};

use crate::action::PendingAction;
use crate::store::SlotStore;

/// Single-slot durable mailbox for a pending notification action.
///
/// The mailbox holds at most one [`PendingAction`]. A new [`put`](Self::put)
/// overwrites whatever is there; nothing is queued. It is written by the
/// producer, which may run in a process with no application attached, and
/// drained by the gateway on the next activation.
///
/// Semantics:
/// - None of the operations return an error. Store failures are logged and
///   degrade to a no-op (writes) or an empty slot (reads).
/// - All operations serialize on one lock around the store, so a `put` and a
///   `clear` issued from different activation sources never interleave.
/// - The lock is held only for the store call itself, never across delivery.
pub struct Mailbox<S> {
    store: Mutex<S>,
}

impl<S: SlotStore> Mailbox<S> {
    /// Wraps `store`, which the mailbox then owns exclusively.
    pub fn new(store: S) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    /// Overwrites the slot with `action`.
    pub fn put(&self, action: &PendingAction) {
        let mut store = self.store.lock();
        match store.save(action) {
            Ok(()) => debug!(
                reminder_id = %action.reminder_id,
                action = %action.action,
                created_at = action.created_at,
                "pending action stored"
            ),
            Err(err) => error!(
                reminder_id = %action.reminder_id,
                action = %action.action,
                error = %err,
                "failed to store pending action"
            ),
        }
    }

    /// Returns the slot contents without consuming them.
    pub fn peek(&self) -> Option<PendingAction> {
        let mut store = self.store.lock();
        match store.load() {
            Ok(slot) => slot,
            Err(err) => {
                error!(error = %err, "failed to read pending action, treating slot as empty");
                None
            }
        }
    }

    /// Empties the slot. Clearing an empty slot is a no-op.
    pub fn clear(&self) {
        let mut store = self.store.lock();
        Self::remove(&mut *store);
    }

    /// Empties the slot only if it still holds `expected`.
    ///
    /// Returns `true` if the slot was cleared. A record written after
    /// `expected` was read, by this process or another one sharing the
    /// store, is left in place.
    pub fn clear_if(&self, expected: &PendingAction) -> bool {
        let mut store = self.store.lock();
        match store.remove_if(expected) {
            Ok(true) => true,
            Ok(false) => {
                debug!(
                    reminder_id = %expected.reminder_id,
                    "slot no longer holds the action that was read, leaving it"
                );
                false
            }
            Err(err) => {
                error!(error = %err, "failed to clear pending action");
                false
            }
        }
    }

    fn remove(store: &mut S) {
        if let Err(err) = store.remove() {
            error!(error = %err, "failed to clear pending action");
        }
    }
}
