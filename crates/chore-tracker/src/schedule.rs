//! Due-date arithmetic for recurring chores.

use chrono::{Duration, NaiveDate};

use crate::chore::{Chore, ChoreType};

/// Whether a completion on `completed_on` is later than `due`.
#[must_use]
pub fn is_late(due: NaiveDate, completed_on: NaiveDate) -> bool {
    completed_on > due
}

/// Number of whole days `completed_on` falls after `due` (zero when on time).
#[must_use]
pub fn days_late(due: NaiveDate, completed_on: NaiveDate) -> u32 {
    u32::try_from((completed_on - due).num_days().max(0)).unwrap_or(u32::MAX)
}

/// Compute the due date that follows a completion on `completed_on`.
///
/// Fixed chores add the frequency offset to the current due date (or to the
/// completion date when none is set). Adaptive chores count from the
/// completion date: `adaptive_window` days when done on time, `max_days`
/// when done late.
#[must_use]
pub fn next_due_after_completion(chore: &Chore, completed_on: NaiveDate) -> NaiveDate {
    match chore.chore_type {
        ChoreType::Fixed => {
            let base = chore.due_date.unwrap_or(completed_on);
            add_days(base, chore.frequency.offset_days())
        }
        ChoreType::Adaptive => {
            let late = chore
                .due_date
                .is_some_and(|due| is_late(due, completed_on));
            let window = if late {
                chore.max_days
            } else {
                chore.adaptive_window
            };
            add_days(completed_on, window)
        }
    }
}

/// `date` plus `n` days, saturating at the last representable date.
#[must_use]
pub fn add_days(date: NaiveDate, n: u32) -> NaiveDate {
    date.checked_add_signed(Duration::days(i64::from(n)))
        .unwrap_or(NaiveDate::MAX)
}
