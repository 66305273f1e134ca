//! Core chore types for chore-tracker.
//!
//! This module defines the chore record and the small enumerations that make
//! up its scheduling policy, history log and statistics.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schedule;

/// Default recurrence interval in days.
pub const DEFAULT_INTERVAL_DAYS: u32 = 7;

/// Default window (days) used by adaptive chores completed late.
pub const DEFAULT_MAX_DAYS: u32 = 7;

/// Default window (days) used by adaptive chores completed on time.
pub const DEFAULT_ADAPTIVE_WINDOW: u32 = 3;

/// Default estimated duration in minutes.
pub const DEFAULT_ESTIMATED_DURATION: u32 = 30;

/// Default category for new chores.
pub const DEFAULT_CATEGORY: &str = "general";

/// Lifecycle state of a chore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChoreState {
    /// Waiting to be done.
    Pending,
    /// Done for the current cycle.
    Completed,
    /// Past its due date and not done.
    Overdue,
}

impl ChoreState {
    /// States reachable from this one.
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [ChoreState] {
        match self {
            Self::Pending => &[Self::Completed, Self::Overdue],
            Self::Completed => &[Self::Pending],
            Self::Overdue => &[Self::Completed, Self::Pending],
        }
    }

    /// Whether moving from this state to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: ChoreState) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// The lowercase name used in storage and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Overdue => "overdue",
        }
    }
}

impl fmt::Display for ChoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChoreState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "overdue" => Ok(Self::Overdue),
            other => Err(Error::validation(
                "state",
                format!("unknown state '{other}' (expected pending, completed or overdue)"),
            )),
        }
    }
}

/// How the next due date is derived when a chore is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChoreType {
    /// Advance the current due date by the frequency offset.
    #[default]
    Fixed,
    /// Advance from the completion date by a window that depends on lateness.
    Adaptive,
}

impl fmt::Display for ChoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Adaptive => write!(f, "adaptive"),
        }
    }
}

impl FromStr for ChoreType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "adaptive" => Ok(Self::Adaptive),
            other => Err(Error::validation(
                "chore_type",
                format!("unknown chore type '{other}' (expected fixed or adaptive)"),
            )),
        }
    }
}

/// Recurrence frequency of a fixed chore.
///
/// Stored data with an unrecognised frequency decodes as [`Frequency::Weekly`],
/// which carries the 7-day default offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Frequency {
    /// Every day.
    Daily,
    /// Every 7 days.
    #[default]
    Weekly,
    /// Every 14 days.
    Biweekly,
    /// Every 30 days.
    Monthly,
    /// Every 90 days.
    Quarterly,
    /// Every 365 days.
    Yearly,
}

impl Frequency {
    /// All frequencies, shortest first.
    pub const ALL: [Frequency; 6] = [
        Self::Daily,
        Self::Weekly,
        Self::Biweekly,
        Self::Monthly,
        Self::Quarterly,
        Self::Yearly,
    ];

    /// Number of days a fixed chore's due date moves on completion.
    #[must_use]
    pub fn offset_days(self) -> u32 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Biweekly => 14,
            Self::Monthly => 30,
            Self::Quarterly => 90,
            Self::Yearly => 365,
        }
    }

    /// The lowercase name used in storage and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|freq| freq.as_str() == wanted)
            .ok_or_else(|| {
                Error::validation(
                    "frequency",
                    format!(
                        "unknown frequency '{wanted}' (expected one of daily, weekly, \
                         biweekly, monthly, quarterly, yearly)"
                    ),
                )
            })
    }
}

impl From<String> for Frequency {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl From<Frequency> for String {
    fn from(value: Frequency) -> Self {
        value.as_str().to_string()
    }
}

/// Chore priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Whenever convenient.
    Low,
    /// The usual.
    #[default]
    Medium,
    /// Soon.
    High,
    /// Now.
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(Error::validation(
                "priority",
                format!("unknown priority '{other}' (expected low, medium, high or critical)"),
            )),
        }
    }
}

/// Descriptive metadata attached to a chore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoreMetadata {
    /// How urgent the chore is.
    pub priority: Priority,
    /// Free-form grouping label.
    pub category: String,
    /// Expected effort in minutes.
    pub estimated_duration: u32,
}

impl Default for ChoreMetadata {
    fn default() -> Self {
        Self {
            priority: Priority::default(),
            category: DEFAULT_CATEGORY.to_string(),
            estimated_duration: DEFAULT_ESTIMATED_DURATION,
        }
    }
}

/// What happened in a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    /// The chore was added.
    Created,
    /// One or more fields were edited.
    Updated,
    /// The chore was marked done.
    Completed,
    /// The chore was put back to pending.
    Reset,
    /// The chore passed its due date.
    Overdue,
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
            Self::Completed => write!(f, "completed"),
            Self::Reset => write!(f, "reset"),
            Self::Overdue => write!(f, "overdue"),
        }
    }
}

/// A single entry in a chore's append-only history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub action: HistoryAction,
    /// State before the change, if the state changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_state: Option<ChoreState>,
    /// State after the change, if the state changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_state: Option<ChoreState>,
    /// Who performed the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Free-form notes or reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Aggregate completion statistics for a chore.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoreStatistics {
    /// Number of times the chore was completed.
    pub total_completions: u32,
    /// Completions on or before the due date.
    pub on_time_completions: u32,
    /// Completions after the due date.
    pub overdue_completions: u32,
    /// Sum of days late across all late completions.
    pub total_overdue_days: u32,
    /// Number of times the chore was marked overdue.
    pub total_overdue_count: u32,
    /// Consecutive completions that each followed the previous one within
    /// the recurrence interval.
    pub completion_streak: u32,
    /// Mean days from cycle start to completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_completion_days: Option<f64>,
    /// When the chore was last completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_completed: Option<DateTime<Utc>>,
}

/// A recurring chore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chore {
    /// Stable identifier (12 hex characters).
    pub id: String,
    /// Display name, unique within a store.
    pub name: String,
    /// Longer description.
    #[serde(default)]
    pub description: String,
    /// Current lifecycle state.
    pub state: ChoreState,
    /// When the chore was added.
    pub created_at: DateTime<Utc>,
    /// Date the chore is next due.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Scheduling policy.
    #[serde(default)]
    pub chore_type: ChoreType,
    /// Recurrence frequency used by fixed chores.
    #[serde(default)]
    pub frequency: Frequency,
    /// Recurrence interval in days.
    #[serde(default = "default_interval_days")]
    pub interval_days: u32,
    /// Window used by adaptive chores completed late.
    #[serde(default = "default_max_days")]
    pub max_days: u32,
    /// Window used by adaptive chores completed on time.
    #[serde(default = "default_adaptive_window")]
    pub adaptive_window: u32,
    /// Person responsible.
    #[serde(default)]
    pub assigned_to: String,
    /// Priority, category and effort.
    #[serde(default)]
    pub metadata: ChoreMetadata,
    /// Append-only log of changes.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Completion statistics.
    #[serde(default)]
    pub statistics: ChoreStatistics,
}

fn default_interval_days() -> u32 {
    DEFAULT_INTERVAL_DAYS
}

fn default_max_days() -> u32 {
    DEFAULT_MAX_DAYS
}

fn default_adaptive_window() -> u32 {
    DEFAULT_ADAPTIVE_WINDOW
}

impl Chore {
    /// Create a new pending chore with default scheduling.
    ///
    /// A `created` history entry is recorded at `now`.
    #[must_use]
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        let name = name.into();
        let id = Self::generate_id(&name, now);
        let mut chore = Self {
            id,
            name,
            description: String::new(),
            state: ChoreState::Pending,
            created_at: now,
            due_date: None,
            chore_type: ChoreType::default(),
            frequency: Frequency::default(),
            interval_days: DEFAULT_INTERVAL_DAYS,
            max_days: DEFAULT_MAX_DAYS,
            adaptive_window: DEFAULT_ADAPTIVE_WINDOW,
            assigned_to: String::new(),
            metadata: ChoreMetadata::default(),
            history: Vec::new(),
            statistics: ChoreStatistics::default(),
        };
        chore.record(
            HistoryAction::Created,
            None,
            Some(ChoreState::Pending),
            None,
            None,
            now,
        );
        chore
    }

    /// Derive an identifier from the name and creation time.
    #[must_use]
    pub fn generate_id(name: &str, created_at: DateTime<Utc>) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(name.as_bytes());
        hasher.update(&created_at.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
        let hex = hasher.finalize().to_hex();
        hex.as_str()[..12].to_string()
    }

    /// Append an entry to the history log.
    pub fn record(
        &mut self,
        action: HistoryAction,
        previous_state: Option<ChoreState>,
        new_state: Option<ChoreState>,
        actor: Option<String>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.history.push(HistoryEntry {
            timestamp: now,
            action,
            previous_state,
            new_state,
            actor,
            notes,
        });
    }

    /// Whether the chore is past due on `today`.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        if self.state == ChoreState::Completed {
            return false;
        }
        self.due_date.is_some_and(|due| today > due)
    }

    /// Date on which the chore next needs doing.
    ///
    /// For completed chores this is the already-advanced due date, or the
    /// last completion plus the recurrence interval when no due date is set.
    #[must_use]
    pub fn next_due_date(&self) -> Option<NaiveDate> {
        if self.state != ChoreState::Completed || self.due_date.is_some() {
            return self.due_date;
        }
        self.statistics
            .last_completed
            .map(|last| schedule::add_days(last.date_naive(), self.interval_days))
    }

    /// Signed number of days until the due date (negative when late).
    #[must_use]
    pub fn days_until_due(&self, today: NaiveDate) -> Option<i64> {
        self.due_date.map(|due| (due - today).num_days())
    }

    /// Recompute the average completion time from the history log.
    ///
    /// Each `completed` entry is measured against the closest preceding
    /// `created`, `reset` or `completed` entry.
    #[allow(clippy::cast_precision_loss)]
    pub fn recompute_average_completion(&mut self) {
        let mut gaps = Vec::new();
        for (i, entry) in self.history.iter().enumerate() {
            if entry.action != HistoryAction::Completed {
                continue;
            }
            let start = self.history[..i].iter().rev().find(|prev| {
                matches!(
                    prev.action,
                    HistoryAction::Created | HistoryAction::Reset | HistoryAction::Completed
                )
            });
            if let Some(start) = start {
                let secs = (entry.timestamp - start.timestamp).num_seconds();
                gaps.push(secs as f64 / 86_400.0);
            }
        }
        if !gaps.is_empty() {
            let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
            self.statistics.average_completion_days = Some(mean);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_transition_table() {
        use ChoreState::{Completed, Overdue, Pending};

        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Overdue));
        assert!(Completed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Overdue));
        assert!(Overdue.can_transition_to(Completed));
        assert!(Overdue.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_state_display_and_parse() {
        assert_eq!(ChoreState::Overdue.to_string(), "overdue");
        assert_eq!("Completed".parse::<ChoreState>().unwrap(), ChoreState::Completed);
        assert!("done".parse::<ChoreState>().is_err());
    }

    #[test]
    fn test_frequency_offsets() {
        assert_eq!(Frequency::Daily.offset_days(), 1);
        assert_eq!(Frequency::Weekly.offset_days(), 7);
        assert_eq!(Frequency::Biweekly.offset_days(), 14);
        assert_eq!(Frequency::Monthly.offset_days(), 30);
        assert_eq!(Frequency::Quarterly.offset_days(), 90);
        assert_eq!(Frequency::Yearly.offset_days(), 365);
        assert_eq!(Frequency::default().offset_days(), 7);
    }

    #[test]
    fn test_frequency_unknown_string_decodes_as_default() {
        let freq: Frequency = serde_json::from_str("\"fortnightly-ish\"").unwrap();
        assert_eq!(freq, Frequency::Weekly);
        assert!("fortnightly-ish".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_frequency_serializes_as_string() {
        assert_eq!(
            serde_json::to_string(&Frequency::Quarterly).unwrap(),
            "\"quarterly\""
        );
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
        assert!(Priority::Critical > Priority::Low);
    }

    #[test]
    fn test_new_chore_defaults() {
        let chore = Chore::new("Dishes", at(2024, 1, 1));

        assert_eq!(chore.name, "Dishes");
        assert_eq!(chore.state, ChoreState::Pending);
        assert_eq!(chore.id.len(), 12);
        assert_eq!(chore.interval_days, DEFAULT_INTERVAL_DAYS);
        assert_eq!(chore.metadata.category, "general");
        assert_eq!(chore.metadata.priority, Priority::Medium);
        assert_eq!(chore.history.len(), 1);
        assert_eq!(chore.history[0].action, HistoryAction::Created);
    }

    #[test]
    fn test_generate_id_is_stable() {
        let now = at(2024, 3, 5);
        assert_eq!(Chore::generate_id("Mop", now), Chore::generate_id("Mop", now));
        assert_ne!(Chore::generate_id("Mop", now), Chore::generate_id("Dust", now));
    }

    #[test]
    fn test_is_overdue() {
        let mut chore = Chore::new("Trash", at(2024, 1, 1));
        assert!(!chore.is_overdue(date(2024, 6, 1)));

        chore.due_date = Some(date(2024, 1, 5));
        assert!(!chore.is_overdue(date(2024, 1, 5)));
        assert!(chore.is_overdue(date(2024, 1, 6)));

        chore.state = ChoreState::Completed;
        assert!(!chore.is_overdue(date(2024, 1, 6)));
    }

    #[test]
    fn test_next_due_date_completed_without_due_date() {
        let mut chore = Chore::new("Plants", at(2024, 1, 1));
        chore.state = ChoreState::Completed;
        chore.interval_days = 3;
        chore.statistics.last_completed = Some(at(2024, 1, 10));

        assert_eq!(chore.next_due_date(), Some(date(2024, 1, 13)));
    }

    #[test]
    fn test_days_until_due() {
        let mut chore = Chore::new("Laundry", at(2024, 1, 1));
        assert_eq!(chore.days_until_due(date(2024, 1, 1)), None);

        chore.due_date = Some(date(2024, 1, 4));
        assert_eq!(chore.days_until_due(date(2024, 1, 1)), Some(3));
        assert_eq!(chore.days_until_due(date(2024, 1, 6)), Some(-2));
    }

    #[test]
    fn test_average_completion_from_history() {
        let mut chore = Chore::new("Windows", at(2024, 1, 1));
        chore.record(HistoryAction::Completed, None, None, None, None, at(2024, 1, 3));
        chore.record(HistoryAction::Reset, None, None, None, None, at(2024, 1, 5));
        chore.record(HistoryAction::Completed, None, None, None, None, at(2024, 1, 9));
        chore.recompute_average_completion();

        let avg = chore.statistics.average_completion_days.unwrap();
        assert!((avg - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_chore_deserializes_with_missing_optional_fields() {
        let json = r#"{
            "id": "abc123abc123",
            "name": "Sweep",
            "state": "pending",
            "created_at": "2024-01-01T00:00:00Z"
        }"#;
        let chore: Chore = serde_json::from_str(json).unwrap();

        assert_eq!(chore.interval_days, DEFAULT_INTERVAL_DAYS);
        assert_eq!(chore.max_days, DEFAULT_MAX_DAYS);
        assert_eq!(chore.adaptive_window, DEFAULT_ADAPTIVE_WINDOW);
        assert_eq!(chore.chore_type, ChoreType::Fixed);
        assert!(chore.history.is_empty());
    }

    #[test]
    fn test_chore_rejects_unknown_state() {
        let json = r#"{
            "id": "abc123abc123",
            "name": "Sweep",
            "state": "sleeping",
            "created_at": "2024-01-01T00:00:00Z"
        }"#;
        assert!(serde_json::from_str::<Chore>(json).is_err());
    }
}
