//! Domain records that travel through the handoff.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of action the user picked on a notification.
///
/// The vocabulary is closed but not enforced at the edge: a string outside
/// it is carried as [`ActionKind::Unknown`] so that it still reaches the
/// listener, which decides whether to reject it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Complete,
    Postpone,
    Unknown(String),
}

impl ActionKind {
    pub const COMPLETE: &'static str = "complete";
    pub const POSTPONE: &'static str = "postpone";

    /// Maps a wire string onto a kind, keeping unrecognized strings.
    pub fn parse(raw: &str) -> Self {
        match raw {
            Self::COMPLETE => ActionKind::Complete,
            Self::POSTPONE => ActionKind::Postpone,
            other => ActionKind::Unknown(other.to_string()),
        }
    }

    /// Wire form of the action, identical to what was received.
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Complete => Self::COMPLETE,
            ActionKind::Postpone => Self::POSTPONE,
            ActionKind::Unknown(raw) => raw,
        }
    }

    /// `false` for strings outside the known vocabulary.
    pub fn is_known(&self) -> bool {
        !matches!(self, ActionKind::Unknown(_))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ActionKind {
    fn from(raw: &str) -> Self {
        ActionKind::parse(raw)
    }
}

/// The single record held by the mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub reminder_id: String,
    pub action: ActionKind,
    /// Wall-clock creation time in milliseconds since the Unix epoch.
    pub created_at: u64,
}

impl PendingAction {
    /// Builds a record stamped with `created_at` epoch milliseconds.
    pub fn new(reminder_id: impl Into<String>, action: ActionKind, created_at: u64) -> Self {
        Self {
            reminder_id: reminder_id.into(),
            action,
            created_at,
        }
    }

    /// Milliseconds elapsed since creation. A timestamp ahead of `now` counts as zero.
    pub fn age_millis(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    /// The delivery shape of this record.
    pub fn payload(&self) -> ActionPayload {
        ActionPayload {
            reminder_id: self.reminder_id.clone(),
            action: self.action.as_str().to_string(),
        }
    }
}

/// Message shape handed to the live listener, whichever path delivered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPayload {
    pub reminder_id: String,
    pub action: String,
}

impl ActionPayload {
    /// Classifies the action string for listeners that reject unknown kinds.
    pub fn kind(&self) -> ActionKind {
        ActionKind::parse(&self.action)
    }
}
