//! Chore state transitions.
//!
//! [`apply`] is a pure function: it mutates one chore according to an
//! [`Action`] and returns the events the change produced. It never touches
//! storage or delivers events itself.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::chore::{Chore, ChoreState, ChoreType, Frequency, HistoryAction, Priority};
use crate::error::{Error, Result};
use crate::event::ChoreEvent;
use crate::schedule;

/// A partial edit of a chore. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoreUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New due date; `Some(None)` clears it.
    pub due_date: Option<Option<NaiveDate>>,
    /// New scheduling policy.
    pub chore_type: Option<ChoreType>,
    /// New frequency.
    pub frequency: Option<Frequency>,
    /// New recurrence interval.
    pub interval_days: Option<u32>,
    /// New late window for adaptive chores.
    pub max_days: Option<u32>,
    /// New on-time window for adaptive chores.
    pub adaptive_window: Option<u32>,
    /// New assignee.
    pub assigned_to: Option<String>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New category.
    pub category: Option<String>,
    /// New estimated duration in minutes.
    pub estimated_duration: Option<u32>,
}

impl ChoreUpdate {
    /// Whether the update carries no fields at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Something a caller wants to do to a chore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Mark the chore done and schedule the next occurrence.
    Complete {
        /// Who did it.
        completed_by: Option<String>,
        /// Free-form notes.
        notes: Option<String>,
    },
    /// Put the chore back to pending.
    Reset {
        /// Why.
        reason: Option<String>,
    },
    /// Flag the chore as past due.
    MarkOverdue,
    /// Edit fields.
    Update(ChoreUpdate),
}

/// Ambient inputs to a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionContext {
    /// Current time.
    pub now: DateTime<Utc>,
}

impl TransitionContext {
    /// Context at the given instant.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Current calendar date (UTC).
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

/// Apply `action` to `chore`, returning the emitted events.
///
/// A request for the state the chore is already in is a no-op and yields no
/// events. A request the transition table forbids fails with
/// [`Error::InvalidTransition`] and leaves the chore untouched.
///
/// # Errors
///
/// Returns [`Error::InvalidTransition`] for disallowed state changes.
pub fn apply(
    chore: &mut Chore,
    action: Action,
    ctx: &TransitionContext,
) -> Result<Vec<ChoreEvent>> {
    match action {
        Action::Complete {
            completed_by,
            notes,
        } => complete(chore, completed_by, notes, ctx),
        Action::Reset { reason } => reset(chore, reason, ctx),
        Action::MarkOverdue => mark_overdue(chore, ctx),
        Action::Update(update) => Ok(update_fields(chore, update, ctx)),
    }
}

/// Check the transition table. `Ok(false)` means "already there".
fn check_transition(chore: &Chore, to: ChoreState) -> Result<bool> {
    if chore.state == to {
        return Ok(false);
    }
    if !chore.state.can_transition_to(to) {
        return Err(Error::InvalidTransition {
            from: chore.state,
            to,
        });
    }
    Ok(true)
}

fn complete(
    chore: &mut Chore,
    completed_by: Option<String>,
    notes: Option<String>,
    ctx: &TransitionContext,
) -> Result<Vec<ChoreEvent>> {
    if !check_transition(chore, ChoreState::Completed)? {
        return Ok(Vec::new());
    }

    let today = ctx.today();
    let previous = chore.state;
    let late = chore.due_date.is_some_and(|due| schedule::is_late(due, today));

    let stats = &mut chore.statistics;
    stats.total_completions += 1;
    match chore.due_date {
        Some(due) if late => {
            stats.overdue_completions += 1;
            stats.total_overdue_days += schedule::days_late(due, today);
        }
        _ => stats.on_time_completions += 1,
    }
    let within_interval = stats.last_completed.is_some_and(|last| {
        (ctx.now - last).num_seconds() <= i64::from(chore.interval_days.saturating_add(1)) * 86_400
    });
    stats.completion_streak = if within_interval {
        stats.completion_streak + 1
    } else {
        1
    };
    stats.last_completed = Some(ctx.now);

    let next_due = schedule::next_due_after_completion(chore, today);
    chore.due_date = Some(next_due);
    chore.state = ChoreState::Completed;
    chore.record(
        HistoryAction::Completed,
        Some(previous),
        Some(ChoreState::Completed),
        completed_by.clone(),
        notes,
        ctx.now,
    );
    chore.recompute_average_completion();

    Ok(vec![ChoreEvent::Completed {
        chore_id: chore.id.clone(),
        name: chore.name.clone(),
        previous_state: previous,
        completed_by,
        late,
        next_due: Some(next_due),
        at: ctx.now,
    }])
}

fn reset(
    chore: &mut Chore,
    reason: Option<String>,
    ctx: &TransitionContext,
) -> Result<Vec<ChoreEvent>> {
    if !check_transition(chore, ChoreState::Pending)? {
        return Ok(Vec::new());
    }

    let previous = chore.state;
    chore.state = ChoreState::Pending;
    chore.record(
        HistoryAction::Reset,
        Some(previous),
        Some(ChoreState::Pending),
        None,
        reason.clone(),
        ctx.now,
    );

    Ok(vec![ChoreEvent::Reset {
        chore_id: chore.id.clone(),
        name: chore.name.clone(),
        previous_state: previous,
        reason,
        at: ctx.now,
    }])
}

fn mark_overdue(chore: &mut Chore, ctx: &TransitionContext) -> Result<Vec<ChoreEvent>> {
    if !check_transition(chore, ChoreState::Overdue)? {
        return Ok(Vec::new());
    }

    let previous = chore.state;
    chore.state = ChoreState::Overdue;
    chore.statistics.total_overdue_count += 1;
    chore.statistics.completion_streak = 0;
    chore.record(
        HistoryAction::Overdue,
        Some(previous),
        Some(ChoreState::Overdue),
        None,
        Some("Automatically marked overdue".to_string()),
        ctx.now,
    );

    Ok(vec![ChoreEvent::Overdue {
        chore_id: chore.id.clone(),
        name: chore.name.clone(),
        due_date: chore.due_date,
        at: ctx.now,
    }])
}

fn update_fields(
    chore: &mut Chore,
    mut update: ChoreUpdate,
    ctx: &TransitionContext,
) -> Vec<ChoreEvent> {
    let mut changed: Vec<String> = Vec::new();

    // A new frequency without an explicit interval carries its own offset.
    if update.interval_days.is_none() {
        if let Some(frequency) = update.frequency.filter(|f| *f != chore.frequency) {
            update.interval_days = Some(frequency.offset_days());
        }
    }

    macro_rules! set {
        ($field:literal, $target:expr, $value:expr) => {
            if let Some(value) = $value {
                if $target != value {
                    $target = value;
                    changed.push($field.to_string());
                }
            }
        };
    }

    set!("name", chore.name, update.name);
    set!("description", chore.description, update.description);
    set!("due_date", chore.due_date, update.due_date);
    set!("chore_type", chore.chore_type, update.chore_type);
    set!("frequency", chore.frequency, update.frequency);
    set!("interval_days", chore.interval_days, update.interval_days);
    set!("max_days", chore.max_days, update.max_days);
    set!("adaptive_window", chore.adaptive_window, update.adaptive_window);
    set!("assigned_to", chore.assigned_to, update.assigned_to);
    set!("priority", chore.metadata.priority, update.priority);
    set!("category", chore.metadata.category, update.category);
    set!(
        "estimated_duration",
        chore.metadata.estimated_duration,
        update.estimated_duration
    );

    if changed.is_empty() {
        return Vec::new();
    }

    chore.record(
        HistoryAction::Updated,
        None,
        None,
        None,
        Some(format!("changed: {}", changed.join(", "))),
        ctx.now,
    );

    vec![ChoreEvent::Updated {
        chore_id: chore.id.clone(),
        name: chore.name.clone(),
        changed,
        at: ctx.now,
    }]
}
