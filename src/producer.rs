//! Handler for actions arriving from the notification system.
//!
//! The producer persists first and delivers second, so an action is never
//! lost to a failed or skipped live delivery. When the live listener takes
//! the action, the producer consumes the slot itself so that the next
//! activation does not hand the same action over again.
//!
//! It needs nothing beyond the mailbox, the channel and a clock, which lets
//! it run in a process where the application itself was never started.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::action::{ActionKind, PendingAction};
use crate::channel::{Channel, Delivery};
use crate::clock::Clock;
use crate::mailbox::Mailbox;
use crate::store::SlotStore;

pub const EXTRA_REMINDER_ID: &str = "reminder_id";
pub const EXTRA_ACTION: &str = "action";

/// An action event as received from outside, fields not yet validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawActionEvent {
    pub reminder_id: Option<String>,
    pub action: Option<String>,
}

impl RawActionEvent {
    /// An event with both fields present.
    pub fn new(reminder_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            reminder_id: Some(reminder_id.into()),
            action: Some(action.into()),
        }
    }

    /// Builds an event from the string extras attached to a notification intent.
    pub fn from_extras(extras: &HashMap<String, String>) -> Self {
        Self {
            reminder_id: extras.get(EXTRA_REMINDER_ID).cloned(),
            action: extras.get(EXTRA_ACTION).cloned(),
        }
    }
}

/// Why an incoming event was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    MissingReminderId,
    MissingAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProduceOutcome {
    Discarded(DiscardReason),
    /// The action was written to the mailbox; the live attempt ended as given.
    Persisted(Delivery),
}

pub struct ActionProducer<S> {
    mailbox: Arc<Mailbox<S>>,
    channel: Arc<Channel>,
    clock: Arc<dyn Clock>,
}

impl<S: SlotStore> ActionProducer<S> {
    /// Creates a producer writing to `mailbox` and delivering through `channel`.
    pub fn new(mailbox: Arc<Mailbox<S>>, channel: Arc<Channel>, clock: Arc<dyn Clock>) -> Self {
        Self {
            mailbox,
            channel,
            clock,
        }
    }

    /// Validates, persists and attempts live delivery of one incoming event.
    pub fn handle(&self, event: RawActionEvent) -> ProduceOutcome {
        let (reminder_id, action) = match validate(event) {
            Ok(fields) => fields,
            Err(reason) => {
                warn!(?reason, "discarding malformed notification action");
                return ProduceOutcome::Discarded(reason);
            }
        };

        let record = PendingAction::new(
            reminder_id,
            ActionKind::parse(&action),
            self.clock.now_millis(),
        );
        if !record.action.is_known() {
            debug!(action = %record.action, "passing through unrecognized action kind");
        }
        self.mailbox.put(&record);

        // Deliver the values in hand; re-reading the slot could race a gateway clear.
        let delivery = self.channel.deliver(&record.payload());
        match &delivery {
            Delivery::Delivered => {
                // Compare-and-clear: a newer action from another writer stays.
                self.mailbox.clear_if(&record);
            }
            Delivery::NoListener => info!(
                reminder_id = %record.reminder_id,
                action = %record.action,
                "application not attached, action left in mailbox"
            ),
            Delivery::Failed(err) => warn!(
                reminder_id = %record.reminder_id,
                error = %err,
                "immediate delivery failed, action left in mailbox"
            ),
        }
        ProduceOutcome::Persisted(delivery)
    }
}

fn validate(event: RawActionEvent) -> Result<(String, String), DiscardReason> {
    let reminder_id = event
        .reminder_id
        .filter(|id| !id.is_empty())
        .ok_or(DiscardReason::MissingReminderId)?;
    let action = event
        .action
        .filter(|action| !action.is_empty())
        .ok_or(DiscardReason::MissingAction)?;
    Ok((reminder_id, action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionPayload;
    use crate::clock::ManualClock;
    use crate::error::ListenerError;
    use crate::store::MemoryStore;

    struct Fixture {
        mailbox: Arc<Mailbox<MemoryStore>>,
        channel: Arc<Channel>,
        producer: ActionProducer<MemoryStore>,
    }

    fn fixture() -> Fixture {
        let mailbox = Arc::new(Mailbox::new(MemoryStore::new()));
        let channel = Arc::new(Channel::new());
        let producer = ActionProducer::new(
            Arc::clone(&mailbox),
            Arc::clone(&channel),
            Arc::new(ManualClock::new(42_000)),
        );
        Fixture {
            mailbox,
            channel,
            producer,
        }
    }

    #[test]
    fn missing_fields_are_discarded() {
        let f = fixture();
        let cases = [
            (RawActionEvent::default(), DiscardReason::MissingReminderId),
            (
                RawActionEvent {
                    reminder_id: Some(String::new()),
                    action: Some("complete".into()),
                },
                DiscardReason::MissingReminderId,
            ),
            (
                RawActionEvent { reminder_id: Some("r1".into()), action: None },
                DiscardReason::MissingAction,
            ),
            (RawActionEvent::new("r1", ""), DiscardReason::MissingAction),
        ];
        for (event, reason) in cases {
            assert_eq!(f.producer.handle(event), ProduceOutcome::Discarded(reason));
        }
        assert_eq!(f.mailbox.peek(), None);
    }

    #[test]
    fn persists_without_listener() {
        let f = fixture();
        let outcome = f.producer.handle(RawActionEvent::new("r1", "complete"));
        assert_eq!(outcome, ProduceOutcome::Persisted(Delivery::NoListener));
        assert_eq!(
            f.mailbox.peek(),
            Some(PendingAction::new("r1", ActionKind::Complete, 42_000))
        );
    }

    #[test]
    fn immediate_delivery_consumes_record() {
        let f = fixture();
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let sink = Arc::clone(&seen);
        f.channel.register(Arc::new(
            move |p: &ActionPayload| -> Result<(), ListenerError> {
                *sink.lock() = Some(p.clone());
                Ok(())
            },
        ));

        let outcome = f.producer.handle(RawActionEvent::new("r9", "postpone"));
        assert_eq!(outcome, ProduceOutcome::Persisted(Delivery::Delivered));
        assert_eq!(
            seen.lock().clone(),
            Some(ActionPayload { reminder_id: "r9".into(), action: "postpone".into() })
        );
        assert_eq!(f.mailbox.peek(), None);
    }

    #[test]
    fn listener_failure_does_not_roll_back() {
        let f = fixture();
        f.channel.register(Arc::new(
            |_: &ActionPayload| -> Result<(), ListenerError> {
                Err(ListenerError::new("not ready"))
            },
        ));
        let outcome = f.producer.handle(RawActionEvent::new("r1", "complete"));
        assert!(matches!(outcome, ProduceOutcome::Persisted(Delivery::Failed(_))));
        assert!(f.mailbox.peek().is_some());
    }

    #[test]
    fn unknown_action_is_persisted() {
        let f = fixture();
        f.producer.handle(RawActionEvent::new("r1", "dismiss"));
        assert_eq!(
            f.mailbox.peek().map(|r| r.action),
            Some(ActionKind::Unknown("dismiss".into()))
        );
    }

    #[test]
    fn from_extras_reads_intent_keys() {
        let mut extras = HashMap::new();
        extras.insert(EXTRA_REMINDER_ID.to_string(), "r1".to_string());
        extras.insert(EXTRA_ACTION.to_string(), "complete".to_string());
        assert_eq!(RawActionEvent::from_extras(&extras), RawActionEvent::new("r1", "complete"));

        extras.remove(EXTRA_ACTION);
        assert_eq!(RawActionEvent::from_extras(&extras).action, None);
    }
}
