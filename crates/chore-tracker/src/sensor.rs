//! Read-only sensor projections of chores.
//!
//! Each chore is exposed as one sensor with a display state, an icon and a
//! bag of attributes, suitable for dashboards or a home-automation bridge.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};

use crate::chore::{Chore, ChoreState, ChoreType};
use crate::event::EVENT_PREFIX;
use crate::validation::DATE_FORMAT;

/// Icon for chores that are on track.
pub const ICON_DEFAULT: &str = "mdi:check-circle-outline";
/// Icon for overdue chores.
pub const ICON_OVERDUE: &str = "mdi:alert-circle";
/// Unit of the sensor value.
pub const UNIT: &str = "days";

/// A sensor view of one chore.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoreSensor {
    /// Stable identifier derived from the chore name.
    pub unique_id: String,
    /// Display name.
    pub name: String,
    /// Display state, e.g. `due_tomorrow`.
    pub state: String,
    /// Material design icon name.
    pub icon: &'static str,
    /// Unit of measurement.
    pub unit_of_measurement: &'static str,
    /// Extra attributes.
    pub attributes: BTreeMap<String, Value>,
}

impl ChoreSensor {
    /// Project `chore` as seen on `today`.
    #[must_use]
    pub fn from_chore(chore: &Chore, today: NaiveDate) -> Self {
        let state = display_state(chore, today);
        let icon = if state == "overdue" {
            ICON_OVERDUE
        } else {
            ICON_DEFAULT
        };

        Self {
            unique_id: format!("{EVENT_PREFIX}_{}", slug(&chore.name)),
            name: format!("Chore {}", chore.name),
            state,
            icon,
            unit_of_measurement: UNIT,
            attributes: attributes(chore, today),
        }
    }
}

/// Lower-case `name` and collapse every run of other characters into `_`.
#[must_use]
pub fn slug(name: &str) -> String {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    let re = NON_WORD.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));
    re.replace_all(&name.to_lowercase(), "_")
        .trim_matches('_')
        .to_string()
}

/// Compute the display state of a chore.
#[must_use]
pub fn display_state(chore: &Chore, today: NaiveDate) -> String {
    match chore.state {
        ChoreState::Completed => return "completed".to_string(),
        ChoreState::Overdue => return "overdue".to_string(),
        ChoreState::Pending => {}
    }
    let Some(days) = chore.days_until_due(today) else {
        return chore.state.to_string();
    };

    match chore.chore_type {
        ChoreType::Adaptive => match days {
            d if d < 0 => "overdue".to_string(),
            0 => "due_today".to_string(),
            1 => "due_tomorrow".to_string(),
            d if d <= i64::from(chore.max_days) => format!("due_in_{d}_days"),
            _ => "scheduled".to_string(),
        },
        ChoreType::Fixed => match days {
            d if d < 0 => "overdue".to_string(),
            d if d <= 1 => "due".to_string(),
            _ => "pending".to_string(),
        },
    }
}

fn attributes(chore: &Chore, today: NaiveDate) -> BTreeMap<String, Value> {
    let stats = &chore.statistics;
    let mut attrs = BTreeMap::new();
    let mut put = |key: &str, value: Value| {
        attrs.insert(key.to_string(), value);
    };

    put("chore_id", json!(chore.id));
    put("description", json!(chore.description));
    put("frequency", json!(chore.frequency.as_str()));
    put("assigned_to", json!(chore.assigned_to));
    put(
        "due_date",
        json!(chore.due_date.map(|d| d.format(DATE_FORMAT).to_string())),
    );
    put("chore_type", json!(chore.chore_type.to_string()));
    put("interval_days", json!(chore.interval_days));
    put("max_days", json!(chore.max_days));
    put("adaptive_window", json!(chore.adaptive_window));
    put("last_completed", json!(stats.last_completed));
    put("days_until_due", json!(chore.days_until_due(today)));
    put("priority", json!(chore.metadata.priority.to_string()));
    put("category", json!(chore.metadata.category));
    put("estimated_duration", json!(chore.metadata.estimated_duration));
    put("lifecycle_state", json!(chore.state.as_str()));
    put("total_completions", json!(stats.total_completions));
    put("completion_streak", json!(stats.completion_streak));
    put("average_completion_days", json!(stats.average_completion_days));
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn chore(kind: ChoreType, due: Option<u32>) -> Chore {
        let mut chore = Chore::new(
            "Clean  Kitchen!",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        );
        chore.chore_type = kind;
        chore.max_days = 5;
        chore.due_date = due.map(date);
        chore
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Clean  Kitchen!"), "clean_kitchen");
        assert_eq!(slug("Take out trash"), "take_out_trash");
        assert_eq!(slug("Ärger 2"), "rger_2");
    }

    #[test]
    fn test_adaptive_states() {
        let today = date(10);
        let cases = [
            (9, "overdue"),
            (10, "due_today"),
            (11, "due_tomorrow"),
            (13, "due_in_3_days"),
            (15, "due_in_5_days"),
            (16, "scheduled"),
        ];
        for (due, expected) in cases {
            let c = chore(ChoreType::Adaptive, Some(due));
            assert_eq!(display_state(&c, today), expected, "due on day {due}");
        }
    }

    #[test]
    fn test_fixed_states() {
        let today = date(10);
        assert_eq!(display_state(&chore(ChoreType::Fixed, Some(8)), today), "overdue");
        assert_eq!(display_state(&chore(ChoreType::Fixed, Some(10)), today), "due");
        assert_eq!(display_state(&chore(ChoreType::Fixed, Some(11)), today), "due");
        assert_eq!(display_state(&chore(ChoreType::Fixed, Some(12)), today), "pending");
    }

    #[test]
    fn test_lifecycle_states_take_precedence() {
        let mut c = chore(ChoreType::Fixed, Some(5));
        c.state = ChoreState::Completed;
        assert_eq!(display_state(&c, date(10)), "completed");

        let undated = chore(ChoreType::Adaptive, None);
        assert_eq!(display_state(&undated, date(10)), "pending");
    }

    #[test]
    fn test_sensor_projection() {
        let c = chore(ChoreType::Fixed, Some(3));
        let sensor = ChoreSensor::from_chore(&c, date(10));

        assert_eq!(sensor.unique_id, "chore_tracker_clean_kitchen");
        assert_eq!(sensor.name, "Chore Clean  Kitchen!");
        assert_eq!(sensor.state, "overdue");
        assert_eq!(sensor.icon, ICON_OVERDUE);
        assert_eq!(sensor.unit_of_measurement, "days");
        assert_eq!(sensor.attributes["due_date"], "2024-01-03");
        assert_eq!(sensor.attributes["days_until_due"], -7);
        assert_eq!(sensor.attributes["frequency"], "weekly");
        assert_eq!(sensor.attributes["priority"], "medium");
    }

    #[test]
    fn test_on_track_icon() {
        let sensor = ChoreSensor::from_chore(&chore(ChoreType::Fixed, Some(20)), date(10));
        assert_eq!(sensor.icon, ICON_DEFAULT);
        assert_eq!(sensor.state, "pending");
    }
}
