//! Chore operations.
//!
//! [`ChoreService`] ties the pure transition function to the store and the
//! event sink. Every operation takes the store lock, mutates, saves and
//! releases the lock before events are delivered.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chore::{Chore, ChoreState, ChoreStatistics, ChoreType, Frequency, Priority};
use crate::config::{Config, DefaultsConfig};
use crate::error::{Error, Result};
use crate::event::{ChoreEvent, EventSink};
use crate::lifecycle::{self, Action, ChoreUpdate, TransitionContext};
use crate::sensor::ChoreSensor;
use crate::storage::{backup, ChoreStore, StoreStats};
use crate::validation;

/// Request to add a chore. Omitted fields come from [`DefaultsConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddChore {
    /// Display name.
    pub name: String,
    /// First due date.
    pub due_date: Option<NaiveDate>,
    /// Free-form description.
    pub description: Option<String>,
    /// Recurrence frequency.
    pub frequency: Option<Frequency>,
    /// Scheduling policy.
    pub chore_type: Option<ChoreType>,
    /// Recurrence interval; derived from the frequency when omitted.
    pub interval_days: Option<u32>,
    /// Late window for adaptive chores.
    pub max_days: Option<u32>,
    /// On-time window for adaptive chores.
    pub adaptive_window: Option<u32>,
    /// Assignee.
    pub assigned_to: Option<String>,
    /// Priority.
    pub priority: Option<Priority>,
    /// Category label.
    pub category: Option<String>,
    /// Estimated duration in minutes.
    pub estimated_duration: Option<u32>,
}

impl AddChore {
    /// A request with only a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Filter for [`ChoreService::list_chores`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoreFilter {
    /// Only chores in this state.
    pub state: Option<ChoreState>,
    /// Only chores assigned to this person.
    pub assigned_to: Option<String>,
}

impl ChoreFilter {
    fn matches(&self, chore: &Chore) -> bool {
        self.state.map_or(true, |s| chore.state == s)
            && self
                .assigned_to
                .as_deref()
                .map_or(true, |who| chore.assigned_to == who)
    }
}

/// Outcome of an overdue check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverdueReport {
    /// Ids of chores that became overdue.
    pub marked_overdue: Vec<String>,
    /// Ids of completed chores that came due again.
    pub reset_to_pending: Vec<String>,
}

impl OverdueReport {
    /// Whether the check changed anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.marked_overdue.is_empty() && self.reset_to_pending.is_empty()
    }
}

/// Service-level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Defaults for new chores.
    pub defaults: DefaultsConfig,
    /// Whether the overdue check resets completed chores that came due.
    pub reset_completed: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            defaults: DefaultsConfig::default(),
            reset_completed: true,
        }
    }
}

impl From<&Config> for ServiceOptions {
    fn from(config: &Config) -> Self {
        Self {
            defaults: config.defaults.clone(),
            reset_completed: config.schedule.reset_completed,
        }
    }
}

/// The chore tracker.
pub struct ChoreService {
    store: Mutex<ChoreStore>,
    sink: Arc<dyn EventSink>,
    options: ServiceOptions,
}

impl std::fmt::Debug for ChoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChoreService")
            .field("store", &self.store)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ChoreService {
    /// Create a service over `store` that reports to `sink`.
    #[must_use]
    pub fn new(store: ChoreStore, sink: Arc<dyn EventSink>, options: ServiceOptions) -> Self {
        Self {
            store: Mutex::new(store),
            sink,
            options,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ChoreStore>> {
        self.store
            .lock()
            .map_err(|_| Error::internal("chore store lock poisoned"))
    }

    fn emit(&self, events: &[ChoreEvent]) {
        for event in events {
            self.sink.emit(event);
        }
    }

    /// Add a chore.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad fields, [`Error::DuplicateChore`]
    /// if the name is taken, or a storage error if saving fails.
    pub fn add_chore(&self, request: AddChore) -> Result<Chore> {
        self.add_chore_at(request, Utc::now())
    }

    /// [`ChoreService::add_chore`] at a fixed instant.
    ///
    /// # Errors
    ///
    /// See [`ChoreService::add_chore`].
    pub fn add_chore_at(&self, request: AddChore, now: DateTime<Utc>) -> Result<Chore> {
        let chore = self.build_chore(request, now)?;

        let mut store = self.lock()?;
        store.insert(chore.clone())?;
        if let Err(err) = store.save() {
            store.remove(&chore.id);
            return Err(err);
        }
        drop(store);

        info!("Added chore '{}' ({})", chore.name, chore.id);
        self.emit(&[ChoreEvent::Created {
            chore_id: chore.id.clone(),
            name: chore.name.clone(),
            due_date: chore.due_date,
            at: now,
        }]);
        Ok(chore)
    }

    fn build_chore(&self, request: AddChore, now: DateTime<Utc>) -> Result<Chore> {
        let defaults = &self.options.defaults;
        let name = validation::validate_name(&request.name)?;
        let frequency = request.frequency.unwrap_or(defaults.frequency);
        let interval_days = match (request.interval_days, request.frequency) {
            (Some(days), _) => days,
            (None, Some(freq)) => freq.offset_days(),
            (None, None) => defaults.interval_days,
        };

        let mut chore = Chore::new(name, now);
        chore.due_date = request.due_date;
        chore.description = request.description.unwrap_or_default();
        chore.frequency = frequency;
        chore.chore_type = request.chore_type.unwrap_or(defaults.chore_type);
        chore.interval_days = validation::validate_interval_days(interval_days)?;
        chore.max_days =
            validation::validate_window("max_days", request.max_days.unwrap_or(defaults.max_days))?;
        chore.adaptive_window = validation::validate_window(
            "adaptive_window",
            request.adaptive_window.unwrap_or(defaults.adaptive_window),
        )?;
        chore.assigned_to = request
            .assigned_to
            .as_deref()
            .map(|v| validation::validate_label("assigned_to", v))
            .transpose()?
            .unwrap_or_default();
        chore.metadata.priority = request.priority.unwrap_or(defaults.priority);
        chore.metadata.category = validation::validate_label(
            "category",
            request.category.as_deref().unwrap_or(&defaults.category),
        )?;
        chore.metadata.estimated_duration = validation::validate_estimated_duration(
            request
                .estimated_duration
                .unwrap_or(defaults.estimated_duration),
        )?;
        Ok(chore)
    }

    /// Remove a chore by id or name.
    ///
    /// Returns `false`, with a warning, if no such chore exists.
    ///
    /// # Errors
    ///
    /// Returns a storage error if saving fails.
    pub fn remove_chore(&self, key: &str) -> Result<bool> {
        self.remove_chore_at(key, Utc::now())
    }

    /// [`ChoreService::remove_chore`] at a fixed instant.
    ///
    /// # Errors
    ///
    /// See [`ChoreService::remove_chore`].
    pub fn remove_chore_at(&self, key: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut store = self.lock()?;
        let Some(chore) = store.resolve_id(key).and_then(|id| store.remove(&id)) else {
            warn!("Chore {} not found", key);
            return Ok(false);
        };
        if let Err(err) = store.save() {
            store.insert(chore)?;
            return Err(err);
        }
        drop(store);

        info!("Removed chore '{}' ({})", chore.name, chore.id);
        self.emit(&[ChoreEvent::Removed {
            chore_id: chore.id,
            name: chore.name,
            at: now,
        }]);
        Ok(true)
    }

    /// Edit fields of a chore.
    ///
    /// Returns `None`, with a warning, if no such chore exists.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad fields, [`Error::DuplicateChore`]
    /// if the new name is taken, or a storage error if saving fails.
    pub fn update_chore(&self, key: &str, update: ChoreUpdate) -> Result<Option<Chore>> {
        self.update_chore_at(key, update, Utc::now())
    }

    /// [`ChoreService::update_chore`] at a fixed instant.
    ///
    /// # Errors
    ///
    /// See [`ChoreService::update_chore`].
    pub fn update_chore_at(
        &self,
        key: &str,
        update: ChoreUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Chore>> {
        let update = validation::validate_update(update)?;
        self.transition(key, Action::Update(update), now)
    }

    /// Mark a chore done and schedule its next occurrence.
    ///
    /// Returns `None`, with a warning, if no such chore exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] or a storage error.
    pub fn complete_chore(
        &self,
        key: &str,
        completed_by: Option<String>,
        notes: Option<String>,
    ) -> Result<Option<Chore>> {
        self.complete_chore_at(key, completed_by, notes, Utc::now())
    }

    /// [`ChoreService::complete_chore`] at a fixed instant.
    ///
    /// # Errors
    ///
    /// See [`ChoreService::complete_chore`].
    pub fn complete_chore_at(
        &self,
        key: &str,
        completed_by: Option<String>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<Chore>> {
        self.transition(
            key,
            Action::Complete {
                completed_by,
                notes,
            },
            now,
        )
    }

    /// Put a chore back to pending.
    ///
    /// Returns `None`, with a warning, if no such chore exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] or a storage error.
    pub fn reset_chore(&self, key: &str, reason: Option<String>) -> Result<Option<Chore>> {
        self.reset_chore_at(key, reason, Utc::now())
    }

    /// [`ChoreService::reset_chore`] at a fixed instant.
    ///
    /// # Errors
    ///
    /// See [`ChoreService::reset_chore`].
    pub fn reset_chore_at(
        &self,
        key: &str,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<Chore>> {
        self.transition(key, Action::Reset { reason }, now)
    }

    /// Apply one action to one chore under the lock.
    fn transition(&self, key: &str, action: Action, now: DateTime<Utc>) -> Result<Option<Chore>> {
        let mut store = self.lock()?;
        let Some(original) = store.find(key).cloned() else {
            warn!("Chore {} not found", key);
            return Ok(None);
        };

        let mut chore = original.clone();
        let events = lifecycle::apply(&mut chore, action, &TransitionContext::at(now))?;
        if events.is_empty() {
            debug!("Chore '{}' unchanged", chore.name);
            return Ok(Some(chore));
        }

        store.replace(chore.clone())?;
        if let Err(err) = store.save() {
            store.replace(original)?;
            return Err(err);
        }
        drop(store);

        for event in &events {
            info!("Chore '{}' {}", chore.name, event.kind());
        }
        self.emit(&events);
        Ok(Some(chore))
    }

    /// Chores matching `filter`, ordered by due date then name.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store lock is poisoned.
    pub fn list_chores(&self, filter: &ChoreFilter) -> Result<Vec<Chore>> {
        let store = self.lock()?;
        Ok(store
            .list()
            .into_iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }

    /// Look up a chore by id or name.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store lock is poisoned.
    pub fn get_chore(&self, key: &str) -> Result<Option<Chore>> {
        Ok(self.lock()?.find(key).cloned())
    }

    /// Completion statistics of one chore.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChoreNotFound`] if no such chore exists.
    pub fn statistics(&self, key: &str) -> Result<ChoreStatistics> {
        self.lock()?
            .find(key)
            .map(|c| c.statistics.clone())
            .ok_or_else(|| Error::not_found(key))
    }

    /// Summary of the whole store.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store lock is poisoned.
    pub fn store_stats(&self) -> Result<StoreStats> {
        Ok(self.lock()?.stats())
    }

    /// Sensor projections of every chore as seen on `today`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store lock is poisoned.
    pub fn sensors(&self, today: NaiveDate) -> Result<Vec<ChoreSensor>> {
        let store = self.lock()?;
        Ok(store
            .list()
            .into_iter()
            .map(|c| ChoreSensor::from_chore(c, today))
            .collect())
    }

    /// Mark late pending chores overdue and reset completed chores that
    /// came due again.
    ///
    /// All changes are saved together; if the save fails none of them stick.
    ///
    /// # Errors
    ///
    /// Returns a storage error if saving fails.
    pub fn check_overdue(&self, now: DateTime<Utc>) -> Result<OverdueReport> {
        let ctx = TransitionContext::at(now);
        let today = ctx.today();
        let mut report = OverdueReport::default();
        let mut events = Vec::new();
        let mut originals = Vec::new();

        let mut store = self.lock()?;
        let ids: Vec<String> = store.ids().cloned().collect();
        for id in ids {
            let Some(chore) = store.get_mut(&id) else {
                continue;
            };
            let before = chore.clone();

            if self.options.reset_completed
                && chore.state == ChoreState::Completed
                && chore.next_due_date().is_some_and(|due| today >= due)
            {
                let reason = Some("Next due date reached".to_string());
                events.extend(lifecycle::apply(chore, Action::Reset { reason }, &ctx)?);
                report.reset_to_pending.push(id.clone());
            }
            if chore.state == ChoreState::Pending && chore.is_overdue(today) {
                events.extend(lifecycle::apply(chore, Action::MarkOverdue, &ctx)?);
                report.marked_overdue.push(id.clone());
            }

            if *chore != before {
                originals.push(before);
            }
        }

        if report.is_empty() {
            debug!("Overdue check found nothing to do");
            return Ok(report);
        }
        if let Err(err) = store.save() {
            for original in originals {
                store.replace(original)?;
            }
            return Err(err);
        }
        drop(store);

        info!(
            "Overdue check: {} marked overdue, {} reset to pending",
            report.marked_overdue.len(),
            report.reset_to_pending.len()
        );
        self.emit(&events);
        Ok(report)
    }

    /// Snapshot the store into `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup cannot be written.
    pub fn create_backup(
        &self,
        dir: &std::path::Path,
        now: DateTime<Utc>,
    ) -> Result<std::path::PathBuf> {
        let store = self.lock()?;
        backup::create_backup(&store, dir, now)
    }

    /// Replace every chore with the contents of a backup.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup is unreadable or the store cannot be
    /// saved.
    pub fn restore_backup(&self, path: &std::path::Path) -> Result<usize> {
        let mut store = self.lock()?;
        backup::restore_backup(&mut store, path)
    }

    /// Delete backups older than `retention_days`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup directory cannot be listed.
    pub fn cleanup_backups(
        &self,
        dir: &std::path::Path,
        retention_days: u32,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        backup::cleanup_backups(dir, retention_days, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::testing::RecordingSink;
    use crate::storage::test_support::temp_dir;
    use chrono::TimeZone;

    fn at(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, 9, 0, 0).unwrap()
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn service() -> (ChoreService, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let service = ChoreService::new(
            ChoreStore::in_memory(),
            sink.clone(),
            ServiceOptions::default(),
        );
        (service, sink)
    }

    fn weekly(name: &str, due: NaiveDate) -> AddChore {
        AddChore {
            due_date: Some(due),
            frequency: Some(Frequency::Weekly),
            ..AddChore::new(name)
        }
    }

    #[test]
    fn test_add_then_get_returns_same_chore() {
        let (service, sink) = service();
        let added = service
            .add_chore_at(
                AddChore {
                    description: Some("Kitchen and bathroom".to_string()),
                    assigned_to: Some("sam".to_string()),
                    priority: Some(Priority::High),
                    ..weekly("Mop floors", date(1, 1))
                },
                at(1, 1),
            )
            .unwrap();

        assert_eq!(service.get_chore(&added.id).unwrap(), Some(added.clone()));
        assert_eq!(service.get_chore("Mop floors").unwrap(), Some(added.clone()));
        assert_eq!(added.interval_days, 7);
        assert_eq!(added.metadata.category, "general");
        assert_eq!(sink.kinds(), vec!["created"]);
    }

    #[test]
    fn test_add_applies_defaults_and_validates() {
        let (service, _) = service();
        let chore = service
            .add_chore_at(
                AddChore {
                    frequency: Some(Frequency::Monthly),
                    ..AddChore::new("  Filters  ")
                },
                at(1, 1),
            )
            .unwrap();
        assert_eq!(chore.name, "Filters");
        assert_eq!(chore.interval_days, 30);
        assert_eq!(chore.chore_type, ChoreType::Fixed);

        let err = service
            .add_chore_at(
                AddChore {
                    interval_days: Some(0),
                    ..AddChore::new("Bad")
                },
                at(1, 1),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation { field: "interval_days", .. }));
    }

    #[test]
    fn test_add_duplicate_name_fails() {
        let (service, sink) = service();
        service.add_chore_at(AddChore::new("Dishes"), at(1, 1)).unwrap();
        let err = service.add_chore_at(AddChore::new("Dishes"), at(1, 2)).unwrap_err();
        assert!(matches!(err, Error::DuplicateChore { .. }));
        assert_eq!(sink.kinds(), vec!["created"]);
    }

    #[test]
    fn test_complete_fixed_weekly_advances_due_date() {
        let (service, sink) = service();
        service.add_chore_at(weekly("Trash", date(1, 1)), at(1, 1)).unwrap();

        let done = service
            .complete_chore_at("Trash", Some("kim".to_string()), None, at(1, 1))
            .unwrap()
            .unwrap();
        assert_eq!(done.state, ChoreState::Completed);
        assert_eq!(done.due_date, Some(date(1, 8)));
        assert_eq!(sink.kinds(), vec!["created", "completed"]);
    }

    #[test]
    fn test_complete_adaptive_late_uses_max_days() {
        let (service, _) = service();
        service
            .add_chore_at(
                AddChore {
                    due_date: Some(date(1, 1)),
                    chore_type: Some(ChoreType::Adaptive),
                    max_days: Some(6),
                    adaptive_window: Some(2),
                    ..AddChore::new("Plants")
                },
                at(1, 1),
            )
            .unwrap();

        let done = service
            .complete_chore_at("Plants", None, None, at(1, 2))
            .unwrap()
            .unwrap();
        assert_eq!(done.due_date, Some(date(1, 8)));
    }

    #[test]
    fn test_missing_chores_are_noops() {
        let (service, sink) = service();
        assert!(!service.remove_chore("ghost").unwrap());
        assert!(service.complete_chore("ghost", None, None).unwrap().is_none());
        assert!(service.reset_chore("ghost", None).unwrap().is_none());
        assert!(service
            .update_chore("ghost", ChoreUpdate::default())
            .unwrap()
            .is_none());
        assert!(sink.kinds().is_empty());
        assert!(service.statistics("ghost").unwrap_err().is_not_found());
    }

    #[test]
    fn test_remove_emits_event() {
        let (service, sink) = service();
        let chore = service.add_chore_at(AddChore::new("Dust"), at(1, 1)).unwrap();
        assert!(service.remove_chore_at(&chore.id, at(1, 2)).unwrap());
        assert!(service.get_chore(&chore.id).unwrap().is_none());
        assert_eq!(sink.kinds(), vec!["created", "removed"]);
    }

    #[test]
    fn test_update_validates_and_rejects_name_clash() {
        let (service, _) = service();
        service.add_chore_at(AddChore::new("A"), at(1, 1)).unwrap();
        service.add_chore_at(AddChore::new("B"), at(1, 1)).unwrap();

        let updated = service
            .update_chore_at(
                "A",
                ChoreUpdate {
                    category: Some(" garden ".to_string()),
                    ..ChoreUpdate::default()
                },
                at(1, 2),
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.metadata.category, "garden");

        let clash = ChoreUpdate {
            name: Some("B".to_string()),
            ..ChoreUpdate::default()
        };
        assert!(matches!(
            service.update_chore_at("A", clash, at(1, 2)).unwrap_err(),
            Error::DuplicateChore { .. }
        ));
        assert!(service.get_chore("A").unwrap().is_some());
    }

    #[test]
    fn test_reset_pending_is_noop() {
        let (service, _) = service();
        service.add_chore_at(weekly("Trash", date(1, 1)), at(1, 1)).unwrap();
        let same = service.reset_chore_at("Trash", None, at(1, 1)).unwrap().unwrap();
        assert_eq!(same.history.len(), 1);
    }

    #[test]
    fn test_list_filters() {
        let (service, _) = service();
        service
            .add_chore_at(
                AddChore {
                    assigned_to: Some("sam".to_string()),
                    ..weekly("A", date(1, 3))
                },
                at(1, 1),
            )
            .unwrap();
        service.add_chore_at(weekly("B", date(1, 2)), at(1, 1)).unwrap();
        service.complete_chore_at("B", None, None, at(1, 1)).unwrap();

        let all = service.list_chores(&ChoreFilter::default()).unwrap();
        assert_eq!(all.len(), 2);

        let sams = service
            .list_chores(&ChoreFilter {
                assigned_to: Some("sam".to_string()),
                ..ChoreFilter::default()
            })
            .unwrap();
        assert_eq!(sams.len(), 1);
        assert_eq!(sams[0].name, "A");

        let done = service
            .list_chores(&ChoreFilter {
                state: Some(ChoreState::Completed),
                ..ChoreFilter::default()
            })
            .unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].name, "B");
    }

    #[test]
    fn test_check_overdue_marks_and_resets() {
        let (service, sink) = service();
        service.add_chore_at(weekly("Late", date(1, 1)), at(1, 1)).unwrap();
        service.add_chore_at(weekly("Fine", date(1, 10)), at(1, 1)).unwrap();
        service.add_chore_at(weekly("Done", date(1, 1)), at(1, 1)).unwrap();
        service.complete_chore_at("Done", None, None, at(1, 1)).unwrap();
        sink.take();

        // Done is due again on the 8th.
        let report = service.check_overdue(at(1, 8)).unwrap();
        assert_eq!(report.marked_overdue.len(), 1);
        assert_eq!(report.reset_to_pending.len(), 1);
        let mut kinds = sink.kinds();
        kinds.sort_unstable();
        assert_eq!(kinds, vec!["overdue", "reset"]);

        let late = service.get_chore("Late").unwrap().unwrap();
        assert_eq!(late.state, ChoreState::Overdue);
        assert_eq!(late.statistics.total_overdue_count, 1);
        assert_eq!(service.get_chore("Fine").unwrap().unwrap().state, ChoreState::Pending);
        assert_eq!(service.get_chore("Done").unwrap().unwrap().state, ChoreState::Pending);

        // A second run the same day is a no-op.
        assert!(service.check_overdue(at(1, 8)).unwrap().is_empty());
    }

    #[test]
    fn test_check_overdue_resets_then_marks_in_one_pass() {
        let (service, sink) = service();
        let done = service.add_chore_at(weekly("Done", date(1, 1)), at(1, 1)).unwrap();
        service.complete_chore_at("Done", None, None, at(1, 1)).unwrap();
        sink.take();

        // Due again on the 8th and still undone on the 20th.
        let report = service.check_overdue(at(1, 20)).unwrap();
        assert_eq!(report.reset_to_pending, vec![done.id.clone()]);
        assert_eq!(report.marked_overdue, vec![done.id.clone()]);
        assert_eq!(sink.kinds(), vec!["reset", "overdue"]);

        let chore = service.get_chore("Done").unwrap().unwrap();
        assert_eq!(chore.state, ChoreState::Overdue);
        assert_eq!(chore.due_date, Some(date(1, 8)));
    }

    #[test]
    fn test_check_overdue_respects_reset_setting() {
        let sink = Arc::new(RecordingSink::default());
        let service = ChoreService::new(
            ChoreStore::in_memory(),
            sink,
            ServiceOptions {
                reset_completed: false,
                ..ServiceOptions::default()
            },
        );
        service.add_chore_at(weekly("Done", date(1, 1)), at(1, 1)).unwrap();
        service.complete_chore_at("Done", None, None, at(1, 1)).unwrap();

        assert!(service.check_overdue(at(1, 20)).unwrap().is_empty());
        assert_eq!(
            service.get_chore("Done").unwrap().unwrap().state,
            ChoreState::Completed
        );
    }

    #[test]
    fn test_sensors() {
        let (service, _) = service();
        service.add_chore_at(weekly("Trash", date(1, 2)), at(1, 1)).unwrap();
        let sensors = service.sensors(date(1, 1)).unwrap();
        assert_eq!(sensors.len(), 1);
        assert_eq!(sensors[0].unique_id, "chore_tracker_trash");
        assert_eq!(sensors[0].state, "due");
    }

    #[test]
    fn test_failed_save_rolls_back() {
        let dir = temp_dir("service_rollback");
        let store = ChoreStore::open(dir.join("chores.json")).unwrap();
        let sink = Arc::new(RecordingSink::default());
        let service = ChoreService::new(store, sink.clone(), ServiceOptions::default());
        service.add_chore_at(weekly("Trash", date(1, 1)), at(1, 1)).unwrap();

        // Replace the directory with a file so every save fails.
        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, b"").unwrap();

        assert!(service.complete_chore_at("Trash", None, None, at(1, 1)).is_err());
        let trash = service.get_chore("Trash").unwrap().unwrap();
        assert_eq!(trash.state, ChoreState::Pending);
        assert_eq!(trash.due_date, Some(date(1, 1)));

        assert!(service.add_chore_at(AddChore::new("Other"), at(1, 1)).is_err());
        assert!(service.get_chore("Other").unwrap().is_none());
        assert_eq!(sink.kinds(), vec!["created"]);

        let _ = std::fs::remove_file(&dir);
    }

    #[test]
    fn test_persisted_service_reloads_identically() {
        let dir = temp_dir("service_reload");
        let path = dir.join("chores.json");
        let service = ChoreService::new(
            ChoreStore::open(&path).unwrap(),
            Arc::new(crate::event::NullSink),
            ServiceOptions::default(),
        );
        service.add_chore_at(weekly("Trash", date(1, 1)), at(1, 1)).unwrap();
        service.complete_chore_at("Trash", None, Some("bins out".to_string()), at(1, 1)).unwrap();
        let before = std::fs::read(&path).unwrap();

        let reopened = ChoreStore::open(&path).unwrap();
        assert_eq!(reopened.to_bytes().unwrap(), before);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_backup_round_trip_through_service() {
        let dir = temp_dir("service_backup");
        let service = ChoreService::new(
            ChoreStore::open(dir.join("chores.json")).unwrap(),
            Arc::new(crate::event::NullSink),
            ServiceOptions::default(),
        );
        service.add_chore_at(AddChore::new("Windows"), at(1, 1)).unwrap();
        let backup = service.create_backup(&dir.join("backups"), at(1, 1)).unwrap();

        service.remove_chore("Windows").unwrap();
        assert_eq!(service.restore_backup(&backup).unwrap(), 1);
        assert!(service.get_chore("Windows").unwrap().is_some());
        assert_eq!(
            service.cleanup_backups(&dir.join("backups"), 30, at(3, 1)).unwrap(),
            1
        );
        let _ = std::fs::remove_dir_all(dir);
    }
}
