//! Process-level owner of the handoff components.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::Listener;
use crate::action::PendingAction;
use crate::channel::Channel;
use crate::clock::{Clock, SystemClock};
use crate::config::HandoffConfig;
use crate::gateway::{Activation, ConsumerGateway, DEFAULT_TTL, GatewayOutcome};
use crate::mailbox::Mailbox;
use crate::producer::{ActionProducer, ProduceOutcome, RawActionEvent};
use crate::store::{FileStore, MemoryStore, SlotStore};

/// Wires one mailbox and one channel into a producer and a gateway.
///
/// The application creates a single `Handoff` at startup and routes its
/// lifecycle hooks through it: [`on_cold_start`](Self::on_cold_start) and
/// [`on_resume`](Self::on_resume) from the host, [`attach`](Self::attach)
/// when its foreground component is ready to receive actions, and
/// [`handle_event`](Self::handle_event) from the notification action handler.
///
/// Whichever path hands an action to the listener first, the immediate
/// attempt or the next activation, consumes the slot, so later activations
/// do not see it again.
pub struct Handoff<S> {
    mailbox: Arc<Mailbox<S>>,
    channel: Arc<Channel>,
    producer: ActionProducer<S>,
    gateway: ConsumerGateway<S>,
}

impl Handoff<FileStore> {
    /// Builds a file-backed handoff using the system clock.
    pub fn open(config: &HandoffConfig) -> Self {
        debug!(path = %config.store.path.display(), ttl_ms = config.ttl_ms, "opening handoff");
        Self::with_clock(
            FileStore::new(&config.store.path),
            Arc::new(SystemClock),
            config.ttl(),
        )
    }
}

impl Handoff<MemoryStore> {
    /// Builds a handoff whose slot lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl<S: SlotStore> Handoff<S> {
    /// Builds a handoff over `store` with the system clock and default TTL.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), DEFAULT_TTL)
    }

    /// Builds a handoff over `store` with an explicit clock and TTL.
    pub fn with_clock(store: S, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        let mailbox = Arc::new(Mailbox::new(store));
        let channel = Arc::new(Channel::new());
        let producer =
            ActionProducer::new(Arc::clone(&mailbox), Arc::clone(&channel), Arc::clone(&clock));
        let gateway = ConsumerGateway::new(Arc::clone(&mailbox), Arc::clone(&channel), clock, ttl);
        Self {
            mailbox,
            channel,
            producer,
            gateway,
        }
    }

    /// The notification-side half: persists and attempts live delivery.
    pub fn producer(&self) -> &ActionProducer<S> {
        &self.producer
    }

    /// The activation-side half: drains the slot.
    pub fn gateway(&self) -> &ConsumerGateway<S> {
        &self.gateway
    }

    /// The registration slot shared by both halves.
    pub fn channel(&self) -> &Arc<Channel> {
        &self.channel
    }

    /// Current slot contents, for inspection.
    pub fn pending(&self) -> Option<PendingAction> {
        self.mailbox.peek()
    }

    /// Drops whatever is pending without delivering it.
    pub fn discard_pending(&self) {
        self.mailbox.clear();
    }

    /// Registers the live listener, replacing any previous one.
    pub fn attach(&self, listener: Arc<dyn Listener>) {
        self.channel.register(listener);
    }

    /// Removes the live listener; later actions wait in the mailbox.
    pub fn detach(&self) {
        self.channel.unregister();
    }

    /// Entry point for an action picked on a notification.
    pub fn handle_event(&self, event: RawActionEvent) -> ProduceOutcome {
        self.producer.handle(event)
    }

    /// Runs the gateway for a fresh process start.
    pub fn on_cold_start(&self) -> GatewayOutcome {
        self.gateway.check(Activation::ColdStart)
    }

    /// Runs the gateway when the application returns to the foreground.
    pub fn on_resume(&self) -> GatewayOutcome {
        self.gateway.check(Activation::Resume)
    }

    /// Re-check requested by the live listener.
    pub fn check_now(&self) -> GatewayOutcome {
        self.gateway.check(Activation::CheckNow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionPayload;
    use crate::channel::Delivery;
    use crate::error::ListenerError;
    use parking_lot::Mutex;

    #[test]
    fn attached_listener_receives_event_immediately() {
        let handoff = Handoff::in_memory();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        handoff.attach(Arc::new(
            move |p: &ActionPayload| -> Result<(), ListenerError> {
                sink.lock().push(p.clone());
                Ok(())
            },
        ));

        let outcome = handoff.handle_event(RawActionEvent::new("r1", "complete"));
        assert_eq!(outcome, ProduceOutcome::Persisted(Delivery::Delivered));
        assert_eq!(received.lock().len(), 1);
        assert!(handoff.pending().is_none());

        // Later activations within the TTL must not hand it over again.
        assert_eq!(handoff.on_resume(), GatewayOutcome::Empty);
        assert_eq!(handoff.check_now(), GatewayOutcome::Empty);
        assert_eq!(received.lock().len(), 1);
    }

    #[test]
    fn detach_falls_back_to_mailbox() {
        let handoff = Handoff::in_memory();
        handoff.attach(Arc::new(|_: &ActionPayload| -> Result<(), ListenerError> { Ok(()) }));
        handoff.detach();

        let outcome = handoff.handle_event(RawActionEvent::new("r1", "postpone"));
        assert_eq!(outcome, ProduceOutcome::Persisted(Delivery::NoListener));
        assert_eq!(handoff.pending().map(|p| p.reminder_id), Some("r1".to_string()));
    }

    #[test]
    fn discard_pending_empties_slot() {
        let handoff = Handoff::in_memory();
        handoff.handle_event(RawActionEvent::new("r1", "complete"));
        handoff.discard_pending();
        assert_eq!(handoff.check_now(), GatewayOutcome::Empty);
    }
}
