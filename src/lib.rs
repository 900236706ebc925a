//! Hands notification actions to an application that may not be running.
//!
//! An action picked on a system notification arrives at a handler that can
//! run without the application. The handler persists the action in a
//! single-slot [`Mailbox`] and then tries to hand it straight to the live
//! application through the [`Channel`]. Whenever the application activates
//! (cold start, resume, or an explicit re-check) the [`ConsumerGateway`]
//! drains the mailbox, delivering the action if it is younger than the TTL.
//! The mailbox is the source of truth; the channel is only a shortcut.

pub mod action;
pub mod channel;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod mailbox;
pub mod producer;
pub mod store;

pub use action::{ActionKind, ActionPayload, PendingAction};
pub use channel::{Channel, Delivery};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::HandoffConfig;
pub use coordinator::Handoff;
pub use error::{ConfigError, ListenerError, StoreError};
pub use gateway::{Activation, ConsumerGateway, GatewayOutcome};
pub use mailbox::Mailbox;
pub use producer::{ActionProducer, ProduceOutcome, RawActionEvent};
pub use store::{FileStore, MemoryStore, SlotStore};

/// The application-side sink for delivered actions.
///
/// At most one listener is registered at a time, typically by the
/// application's foreground component while it is attached. Both delivery
/// paths, the immediate one from the producer and the deferred one from the
/// gateway, call the same listener with the same [`ActionPayload`].
///
/// A listener reports its own faults through [`ListenerError`]; they are
/// logged and never undo the persisted action. Any closure of the right
/// shape is a listener.
pub trait Listener: Send + Sync {
    /// Handles one delivered action.
    fn on_action(&self, payload: &ActionPayload) -> Result<(), ListenerError>;
}

impl<F> Listener for F
where
    F: Fn(&ActionPayload) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_action(&self, payload: &ActionPayload) -> Result<(), ListenerError> {
        self(payload)
    }
}
