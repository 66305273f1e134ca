//! On-disk format versions for the chore store.
//!
//! Version 1 is the legacy layout: a flat JSON array of name-keyed records
//! with string dates. Version 2 wraps chores in a versioned document keyed by
//! chore id. Loading any older layout upgrades it to [`CURRENT_VERSION`].

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::chore::{Chore, ChoreType, HistoryAction};
use crate::error::{Error, Result};
use crate::validation::{
    self, DATE_FORMAT, MAX_INTERVAL_DAYS, MAX_WINDOW_DAYS, MIN_INTERVAL_DAYS, MIN_WINDOW_DAYS,
};

/// The current store format version.
pub const CURRENT_VERSION: u32 = 2;

/// Result of decoding a store document.
#[derive(Debug, Default)]
pub struct Decoded {
    /// Chores keyed by id.
    pub chores: BTreeMap<String, Chore>,
    /// Format version found on disk.
    pub source_version: u32,
    /// Records that could not be decoded and were skipped.
    pub skipped: usize,
}

impl Decoded {
    /// Whether the document was upgraded and should be written back.
    #[must_use]
    pub fn migrated(&self) -> bool {
        self.source_version < CURRENT_VERSION
    }
}

/// Decode a parsed store document of any supported version.
///
/// `now` stamps the creation time of chores upgraded from version 1, which
/// did not record one.
///
/// # Errors
///
/// Returns an error if the document has an unrecognised shape or a version
/// newer than this build understands.
pub fn decode(document: Value, now: DateTime<Utc>) -> Result<Decoded> {
    match document {
        Value::Array(records) => Ok(migrate_v1(records, now)),
        Value::Object(mut map) => {
            let version = match map.get("version") {
                None => 1,
                Some(v) => v
                    .as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| Error::StorageMigration {
                        message: format!("invalid store version: {v}"),
                    })?,
            };
            if version > CURRENT_VERSION {
                return Err(Error::StorageMigration {
                    message: format!(
                        "store version {version} is newer than supported version {CURRENT_VERSION}"
                    ),
                });
            }
            let chores = match map.remove("chores") {
                Some(Value::Object(chores)) => chores,
                None | Some(Value::Null) => serde_json::Map::new(),
                Some(other) => {
                    return Err(Error::StorageMigration {
                        message: format!(
                            "expected an object of chores, found {}",
                            type_name(&other)
                        ),
                    })
                }
            };
            if version < CURRENT_VERSION {
                info!("Migrating chore store from version {} to {}", version, CURRENT_VERSION);
            }
            let mut decoded = decode_records(chores);
            decoded.source_version = version;
            Ok(decoded)
        }
        other => Err(Error::StorageMigration {
            message: format!("expected a store document, found {}", type_name(&other)),
        }),
    }
}

/// Refuse a document written by a newer build.
///
/// Unlike other decoding failures this is not a sign of corruption, so the
/// caller must leave the file alone.
///
/// # Errors
///
/// Returns [`Error::StorageMigration`] if the document's version is greater
/// than [`CURRENT_VERSION`].
pub fn ensure_supported(document: &Value) -> Result<()> {
    match document.get("version").and_then(Value::as_u64) {
        Some(version) if version > u64::from(CURRENT_VERSION) => Err(Error::StorageMigration {
            message: format!(
                "store version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        }),
        _ => Ok(()),
    }
}

/// Decode id-keyed chore records, skipping the ones that fail.
///
/// Names stay unique: a record whose name or id was already seen is dropped.
pub(crate) fn decode_records(records: serde_json::Map<String, Value>) -> Decoded {
    let mut decoded = Decoded {
        source_version: CURRENT_VERSION,
        ..Decoded::default()
    };
    for (key, record) in records {
        match serde_json::from_value::<Chore>(record) {
            Ok(mut chore) => {
                clamp_ranges(&mut chore);
                if chore.id != key {
                    warn!("Chore stored under key {} has id {}; using the id", key, chore.id);
                }
                if decoded.chores.contains_key(&chore.id)
                    || decoded.chores.values().any(|c| c.name == chore.name)
                {
                    error!("Skipping duplicate chore '{}' ({})", chore.name, chore.id);
                    decoded.skipped += 1;
                    continue;
                }
                decoded.chores.insert(chore.id.clone(), chore);
            }
            Err(err) => {
                error!("Error loading chore {}: {}", key, err);
                decoded.skipped += 1;
            }
        }
    }
    decoded
}

/// A record in the version 1 layout.
#[derive(Debug, Deserialize)]
struct LegacyChore {
    name: String,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    frequency: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    assigned_to: Option<String>,
    #[serde(default)]
    chore_type: Option<String>,
    #[serde(default)]
    max_days: Option<u32>,
    #[serde(default)]
    adaptive_window: Option<u32>,
    #[serde(default)]
    last_completed: Option<String>,
}

fn migrate_v1(records: Vec<Value>, now: DateTime<Utc>) -> Decoded {
    info!("Migrating legacy chore list ({} records) to version {}", records.len(), CURRENT_VERSION);

    let mut decoded = Decoded {
        source_version: 1,
        ..Decoded::default()
    };
    for record in records {
        let legacy = match serde_json::from_value::<LegacyChore>(record) {
            Ok(legacy) => legacy,
            Err(err) => {
                error!("Skipping malformed legacy chore: {}", err);
                decoded.skipped += 1;
                continue;
            }
        };
        if decoded.chores.values().any(|c| c.name == legacy.name) {
            warn!("Skipping duplicate legacy chore '{}'", legacy.name);
            decoded.skipped += 1;
            continue;
        }
        let chore = upgrade_legacy(legacy, now);
        decoded.chores.insert(chore.id.clone(), chore);
    }
    decoded
}

fn upgrade_legacy(legacy: LegacyChore, now: DateTime<Utc>) -> Chore {
    let mut chore = Chore::new(legacy.name, now);
    chore.due_date = legacy
        .due_date
        .as_deref()
        .and_then(|d| parse_legacy_date(&chore.name, "due_date", d));
    if let Some(freq) = legacy.frequency {
        chore.frequency = freq.into();
    }
    if let Some(description) = legacy.description {
        chore.description = description;
    }
    if let Some(assigned_to) = legacy.assigned_to {
        chore.assigned_to = assigned_to;
    }
    if let Some(kind) = legacy.chore_type {
        chore.chore_type = kind.parse().unwrap_or_else(|_| {
            warn!("Unknown chore type '{}' for '{}', using fixed", kind, chore.name);
            ChoreType::Fixed
        });
    }
    if let Some(max_days) = legacy.max_days {
        chore.max_days = max_days;
    }
    if let Some(window) = legacy.adaptive_window {
        chore.adaptive_window = window;
    }
    chore.interval_days = chore.frequency.offset_days();
    clamp_ranges(&mut chore);
    chore.statistics.last_completed = legacy
        .last_completed
        .as_deref()
        .and_then(|d| parse_legacy_date(&chore.name, "last_completed", d))
        .map(|d| d.and_time(NaiveTime::MIN).and_utc());
    if let Some(entry) = chore.history.last_mut() {
        if entry.action == HistoryAction::Created {
            entry.notes = Some("migrated from legacy store".to_string());
        }
    }
    chore
}

/// Pull scheduling numbers read from disk back into their valid ranges.
fn clamp_ranges(chore: &mut Chore) {
    if let Err(err) = validation::validate_interval_days(chore.interval_days) {
        error!("Chore '{}': {}; clamping", chore.name, err);
        chore.interval_days = chore.interval_days.clamp(MIN_INTERVAL_DAYS, MAX_INTERVAL_DAYS);
    }
    if let Err(err) = validation::validate_window("max_days", chore.max_days) {
        error!("Chore '{}': {}; clamping", chore.name, err);
        chore.max_days = chore.max_days.clamp(MIN_WINDOW_DAYS, MAX_WINDOW_DAYS);
    }
    if let Err(err) = validation::validate_window("adaptive_window", chore.adaptive_window) {
        error!("Chore '{}': {}; clamping", chore.name, err);
        chore.adaptive_window = chore.adaptive_window.clamp(MIN_WINDOW_DAYS, MAX_WINDOW_DAYS);
    }
}

fn parse_legacy_date(name: &str, field: &str, value: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(err) => {
            warn!("Ignoring bad {} '{}' for chore '{}': {}", field, value, name, err);
            None
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
