use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::channel::{Channel, Delivery};
use crate::clock::Clock;
use crate::mailbox::Mailbox;
use crate::store::SlotStore;

/// How long a pending action stays deliverable, in milliseconds.
pub const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;

/// How long a pending action stays deliverable.
pub const DEFAULT_TTL: Duration = Duration::from_millis(DEFAULT_TTL_MS);

/// Why the gateway is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    ColdStart,
    Resume,
    /// Explicit re-check requested by the live listener.
    CheckNow,
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Activation::ColdStart => "cold_start",
            Activation::Resume => "resume",
            Activation::CheckNow => "check_now",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// Nothing was pending.
    Empty,
    /// The pending action was older than the TTL and was dropped.
    Expired { age_ms: u64 },
    /// The pending action was handed to the channel and consumed.
    Delivered(Delivery),
}

/// Drains the mailbox on every process activation.
///
/// Each run reads the slot, drops it if stale, otherwise hands it to the
/// channel, and then consumes it whether or not a listener took it. Running
/// the gateway twice on the same record therefore delivers at most once.
///
/// The slot is consumed with a compare-and-clear on the record that was
/// read, so an action produced while this run was delivering is kept for the
/// next activation.
pub struct ConsumerGateway<S> {
    mailbox: Arc<Mailbox<S>>,
    channel: Arc<Channel>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl<S: SlotStore> ConsumerGateway<S> {
    /// Creates a gateway that treats records at least `ttl` old as expired.
    pub fn new(
        mailbox: Arc<Mailbox<S>>,
        channel: Arc<Channel>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            mailbox,
            channel,
            clock,
            ttl,
        }
    }

    /// Age at which a pending action stops being delivered.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Reconciles the slot for one activation.
    pub fn check(&self, activation: Activation) -> GatewayOutcome {
        let Some(record) = self.mailbox.peek() else {
            debug!(%activation, "no pending action");
            return GatewayOutcome::Empty;
        };

        let age_ms = record.age_millis(self.clock.now_millis());
        if u128::from(age_ms) >= self.ttl.as_millis() {
            info!(
                %activation,
                reminder_id = %record.reminder_id,
                action = %record.action,
                age_ms,
                "pending action expired, discarding"
            );
            self.mailbox.clear_if(&record);
            return GatewayOutcome::Expired { age_ms };
        }

        debug!(
            %activation,
            reminder_id = %record.reminder_id,
            action = %record.action,
            age_ms,
            "delivering pending action"
        );
        let delivery = self.channel.deliver(&record.payload());
        self.mailbox.clear_if(&record);
        GatewayOutcome::Delivered(delivery)
    }
}
