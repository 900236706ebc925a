//! In-process delivery path to the live application.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::Listener;
use crate::action::ActionPayload;
use crate::error::ListenerError;

/// Result of handing a payload to the channel.
///
/// `NoListener` is an ordinary outcome: the application simply is not in the
/// foreground. The mailbox remains the path that guarantees the action is seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    NoListener,
    Failed(ListenerError),
}

impl Delivery {
    /// `true` only when the listener accepted the payload.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered)
    }
}

/// Registration slot for the single live [`Listener`].
///
/// Registering replaces any previous listener; there is no fan-out. The
/// channel is owned by the process coordinator and passed to whichever
/// component needs to deliver, rather than living in a global.
#[derive(Default)]
pub struct Channel {
    listener: RwLock<Option<Arc<dyn Listener>>>,
}

impl Channel {
    /// Creates a channel with no listener registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `listener`. Returns `true` if it replaced an existing one.
    pub fn register(&self, listener: Arc<dyn Listener>) -> bool {
        let replaced = self.listener.write().replace(listener).is_some();
        debug!(replaced, "listener registered");
        replaced
    }

    /// Removes the current listener. Returns `true` if one was registered.
    pub fn unregister(&self) -> bool {
        let removed = self.listener.write().take().is_some();
        debug!(removed, "listener unregistered");
        removed
    }

    /// Whether a listener is currently attached.
    pub fn is_registered(&self) -> bool {
        self.listener.read().is_some()
    }

    /// Hands `payload` to the registered listener.
    ///
    /// Never blocks waiting for a listener and never fails: the outcome is
    /// reported through [`Delivery`]. The registration lock is released
    /// before the listener runs, so a listener may call back into its
    /// coordinator.
    pub fn deliver(&self, payload: &ActionPayload) -> Delivery {
        let listener = self.listener.read().clone();
        let Some(listener) = listener else {
            debug!(reminder_id = %payload.reminder_id, "no listener registered");
            return Delivery::NoListener;
        };

        match listener.on_action(payload) {
            Ok(()) => {
                debug!(
                    reminder_id = %payload.reminder_id,
                    action = %payload.action,
                    "action delivered to listener"
                );
                Delivery::Delivered
            }
            Err(err) => {
                warn!(
                    reminder_id = %payload.reminder_id,
                    action = %payload.action,
                    error = %err,
                    "listener failed to handle action"
                );
                Delivery::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn payload() -> ActionPayload {
        ActionPayload {
            reminder_id: "r1".into(),
            action: "complete".into(),
        }
    }

    #[test]
    fn unregistered_channel_reports_no_listener() {
        let channel = Channel::new();
        assert_eq!(channel.deliver(&payload()), Delivery::NoListener);
        assert!(!channel.unregister());
    }

    #[test]
    fn registering_replaces_previous_listener() {
        let channel = Channel::new();
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&first);
        assert!(!channel.register(Arc::new(
            move |p: &ActionPayload| -> Result<(), ListenerError> {
                sink.lock().push(p.clone());
                Ok(())
            },
        )));
        let sink = Arc::clone(&second);
        assert!(channel.register(Arc::new(
            move |p: &ActionPayload| -> Result<(), ListenerError> {
                sink.lock().push(p.clone());
                Ok(())
            },
        )));

        assert!(channel.deliver(&payload()).is_delivered());
        assert!(first.lock().is_empty());
        assert_eq!(second.lock().as_slice(), &[payload()]);
    }

    #[test]
    fn listener_error_is_reported_not_propagated() {
        let channel = Channel::new();
        channel.register(Arc::new(
            |_: &ActionPayload| -> Result<(), ListenerError> {
                Err(ListenerError::new("engine detached"))
            },
        ));
        assert_eq!(
            channel.deliver(&payload()),
            Delivery::Failed(ListenerError::new("engine detached"))
        );
    }

    #[test]
    fn unregister_detaches_listener() {
        let channel = Channel::new();
        channel.register(Arc::new(|_: &ActionPayload| -> Result<(), ListenerError> { Ok(()) }));
        assert!(channel.is_registered());
        assert!(channel.unregister());
        assert_eq!(channel.deliver(&payload()), Delivery::NoListener);
    }
}
