//! Lifecycle events emitted when chores change.
//!
//! Events are handed to an [`EventSink`]. The tracker ships sinks that log
//! through `tracing`, forward over a tokio channel, or discard.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::chore::ChoreState;

/// Prefix shared by all event type names.
pub const EVENT_PREFIX: &str = "chore_tracker";

/// Something that happened to a chore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChoreEvent {
    /// A chore was added.
    Created {
        /// Chore identifier.
        chore_id: String,
        /// Chore name.
        name: String,
        /// Initial due date.
        due_date: Option<NaiveDate>,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// Fields of a chore were edited.
    Updated {
        /// Chore identifier.
        chore_id: String,
        /// Chore name after the update.
        name: String,
        /// Names of the fields that changed.
        changed: Vec<String>,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// A chore was marked done.
    Completed {
        /// Chore identifier.
        chore_id: String,
        /// Chore name.
        name: String,
        /// State before completion.
        previous_state: ChoreState,
        /// Who did it.
        completed_by: Option<String>,
        /// Whether it was done after the due date.
        late: bool,
        /// The newly scheduled due date.
        next_due: Option<NaiveDate>,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// A chore was put back to pending.
    Reset {
        /// Chore identifier.
        chore_id: String,
        /// Chore name.
        name: String,
        /// State before the reset.
        previous_state: ChoreState,
        /// Why it was reset.
        reason: Option<String>,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// A chore passed its due date.
    Overdue {
        /// Chore identifier.
        chore_id: String,
        /// Chore name.
        name: String,
        /// The missed due date.
        due_date: Option<NaiveDate>,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// A chore was deleted.
    Removed {
        /// Chore identifier.
        chore_id: String,
        /// Chore name.
        name: String,
        /// When it happened.
        at: DateTime<Utc>,
    },
}

impl ChoreEvent {
    /// Short kind name, e.g. `completed`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::Completed { .. } => "completed",
            Self::Reset { .. } => "reset",
            Self::Overdue { .. } => "overdue",
            Self::Removed { .. } => "removed",
        }
    }

    /// Fully qualified event type, e.g. `chore_tracker_chore_completed`.
    #[must_use]
    pub fn event_type(&self) -> String {
        format!("{EVENT_PREFIX}_chore_{}", self.kind())
    }

    /// Identifier of the chore the event is about.
    #[must_use]
    pub fn chore_id(&self) -> &str {
        match self {
            Self::Created { chore_id, .. }
            | Self::Updated { chore_id, .. }
            | Self::Completed { chore_id, .. }
            | Self::Reset { chore_id, .. }
            | Self::Overdue { chore_id, .. }
            | Self::Removed { chore_id, .. } => chore_id,
        }
    }

    /// Name of the chore the event is about.
    #[must_use]
    pub fn chore_name(&self) -> &str {
        match self {
            Self::Created { name, .. }
            | Self::Updated { name, .. }
            | Self::Completed { name, .. }
            | Self::Reset { name, .. }
            | Self::Overdue { name, .. }
            | Self::Removed { name, .. } => name,
        }
    }
}

/// Receiver of chore lifecycle events.
pub trait EventSink: Send + Sync {
    /// Deliver one event. Delivery failures are the sink's concern.
    fn emit(&self, event: &ChoreEvent);
}

/// Logs every event at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &ChoreEvent) {
        info!(
            event_type = %event.event_type(),
            chore_id = event.chore_id(),
            "{}",
            event.chore_name()
        );
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &ChoreEvent) {}
}

/// Forwards events over a bounded tokio channel.
///
/// Events are dropped with a warning when the channel is full or closed so
/// that a slow consumer never blocks a chore operation.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<ChoreEvent>,
}

impl ChannelSink {
    /// Create a sink that forwards into `sender`.
    #[must_use]
    pub fn new(sender: mpsc::Sender<ChoreEvent>) -> Self {
        Self { sender }
    }

    /// Create a sink together with the receiving end of its channel.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ChoreEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &ChoreEvent) {
        if let Err(err) = self.sender.try_send(event.clone()) {
            warn!("Dropping {} event: {}", event.event_type(), err);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::{ChoreEvent, EventSink};

    /// Collects events in memory for assertions.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSink {
        events: Mutex<Vec<ChoreEvent>>,
    }

    impl RecordingSink {
        pub(crate) fn kinds(&self) -> Vec<&'static str> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(ChoreEvent::kind)
                .collect()
        }

        pub(crate) fn take(&self) -> Vec<ChoreEvent> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: &ChoreEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}
