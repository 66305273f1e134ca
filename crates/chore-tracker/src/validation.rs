//! Request validation.
//!
//! Field rules for add and update requests. Everything here returns
//! [`Error::Validation`] naming the offending field.

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::lifecycle::ChoreUpdate;

/// Minimum chore name length (after trimming).
pub const MIN_NAME_LENGTH: usize = 1;
/// Maximum chore name length.
pub const MAX_NAME_LENGTH: usize = 100;
/// Smallest recurrence interval.
pub const MIN_INTERVAL_DAYS: u32 = 1;
/// Largest recurrence interval.
pub const MAX_INTERVAL_DAYS: u32 = 365;
/// Smallest adaptive window.
pub const MIN_WINDOW_DAYS: u32 = 1;
/// Largest adaptive window.
pub const MAX_WINDOW_DAYS: u32 = 30;
/// Smallest estimated duration in minutes.
pub const MIN_ESTIMATED_DURATION: u32 = 1;
/// Largest estimated duration in minutes (one day).
pub const MAX_ESTIMATED_DURATION: u32 = 1440;
/// Maximum length of assignee and category labels.
pub const MAX_LABEL_LENGTH: usize = 50;

/// Date format accepted for due dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Trim and length-check a chore name.
///
/// # Errors
///
/// Returns an error if the trimmed name is empty or too long.
pub fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len < MIN_NAME_LENGTH {
        return Err(Error::validation("name", "must not be empty"));
    }
    if len > MAX_NAME_LENGTH {
        return Err(Error::validation(
            "name",
            format!("must be at most {MAX_NAME_LENGTH} characters (got {len})"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Check a recurrence interval.
///
/// # Errors
///
/// Returns an error if the value is outside `1..=365`.
pub fn validate_interval_days(days: u32) -> Result<u32> {
    check_range("interval_days", days, MIN_INTERVAL_DAYS, MAX_INTERVAL_DAYS)
}

/// Check an adaptive window (`max_days` or `adaptive_window`).
///
/// # Errors
///
/// Returns an error if the value is outside `1..=30`.
pub fn validate_window(field: &'static str, days: u32) -> Result<u32> {
    check_range(field, days, MIN_WINDOW_DAYS, MAX_WINDOW_DAYS)
}

/// Check an estimated duration in minutes.
///
/// # Errors
///
/// Returns an error if the value is outside `1..=1440`.
pub fn validate_estimated_duration(minutes: u32) -> Result<u32> {
    check_range(
        "estimated_duration",
        minutes,
        MIN_ESTIMATED_DURATION,
        MAX_ESTIMATED_DURATION,
    )
}

/// Trim and length-check a short label such as an assignee or category.
///
/// # Errors
///
/// Returns an error if the label is longer than 50 characters.
pub fn validate_label(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.chars().count() > MAX_LABEL_LENGTH {
        return Err(Error::validation(
            field,
            format!("must be at most {MAX_LABEL_LENGTH} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Parse a `YYYY-MM-DD` due date.
///
/// # Errors
///
/// Returns an error if the string is not a valid calendar date.
pub fn parse_due_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        Error::validation(
            "due_date",
            format!("'{value}' is not in YYYY-MM-DD format"),
        )
    })
}

/// Validate and normalise every present field of an update.
///
/// # Errors
///
/// Returns the first field that fails validation.
pub fn validate_update(update: ChoreUpdate) -> Result<ChoreUpdate> {
    Ok(ChoreUpdate {
        name: update.name.as_deref().map(validate_name).transpose()?,
        interval_days: update
            .interval_days
            .map(validate_interval_days)
            .transpose()?,
        max_days: update
            .max_days
            .map(|d| validate_window("max_days", d))
            .transpose()?,
        adaptive_window: update
            .adaptive_window
            .map(|d| validate_window("adaptive_window", d))
            .transpose()?,
        assigned_to: update
            .assigned_to
            .as_deref()
            .map(|v| validate_label("assigned_to", v))
            .transpose()?,
        category: update
            .category
            .as_deref()
            .map(|v| validate_label("category", v))
            .transpose()?,
        estimated_duration: update
            .estimated_duration
            .map(validate_estimated_duration)
            .transpose()?,
        ..update
    })
}

fn check_range(field: &'static str, value: u32, min: u32, max: u32) -> Result<u32> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(Error::validation(
            field,
            format!("must be between {min} and {max} (got {value})"),
        ))
    }
}
