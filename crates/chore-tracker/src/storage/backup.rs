//! Snapshot backups of the chore store.
//!
//! A backup is a standalone JSON document named
//! `chore_tracker_backup_<YYYYmmdd_HHMMSS>.json` holding the timestamp, the
//! format version and every chore.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::migrations::{self, CURRENT_VERSION};
use super::ChoreStore;
use crate::chore::Chore;
use crate::error::{Error, Result};

/// File name prefix of every backup.
pub const BACKUP_PREFIX: &str = "chore_tracker_backup_";

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Serialize)]
struct BackupDocument<'a> {
    timestamp: DateTime<Utc>,
    version: u32,
    chores: &'a BTreeMap<String, Chore>,
}

/// A backup file found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupInfo {
    /// Full path to the file.
    pub path: PathBuf,
    /// When the backup was taken.
    pub created_at: DateTime<Utc>,
    /// File size in bytes.
    pub size_bytes: u64,
}

/// Write a snapshot of `store` into `dir`.
///
/// Returns the path of the new file. A numeric suffix is added if a backup
/// with the same second-resolution name already exists.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file cannot
/// be written.
pub fn create_backup(store: &ChoreStore, dir: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreate {
        path: dir.to_path_buf(),
        source,
    })?;

    let stamp = now.format(STAMP_FORMAT).to_string();
    let mut path = dir.join(format!("{BACKUP_PREFIX}{stamp}.json"));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{BACKUP_PREFIX}{stamp}_{n}.json"));
        n += 1;
    }

    let doc = BackupDocument {
        timestamp: now,
        version: CURRENT_VERSION,
        chores: &store.chores,
    };
    let mut bytes = serde_json::to_vec_pretty(&doc)?;
    bytes.push(b'\n');
    std::fs::write(&path, bytes).map_err(|source| Error::StorageWrite {
        path: path.clone(),
        source,
    })?;

    info!("Created backup {} ({} chores)", path.display(), store.len());
    Ok(path)
}

/// Replace the contents of `store` with a backup and save it.
///
/// Returns the number of chores restored.
///
/// # Errors
///
/// Returns [`Error::Backup`] if the file is not a backup document, or a
/// storage error if the restored store cannot be saved.
pub fn restore_backup(store: &mut ChoreStore, path: &Path) -> Result<usize> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::StorageRead {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: Value = serde_json::from_str(&raw)
        .map_err(|e| Error::backup(format!("{} is not valid JSON: {e}", path.display())))?;
    let Value::Object(mut map) = doc else {
        return Err(Error::backup(format!("{} is not a backup document", path.display())));
    };
    let Some(Value::Object(chores)) = map.remove("chores") else {
        return Err(Error::backup(format!(
            "{} has no chores section",
            path.display()
        )));
    };

    let decoded = migrations::decode_records(chores);
    if decoded.skipped > 0 {
        warn!("Skipped {} unreadable chores in backup", decoded.skipped);
    }
    let count = decoded.chores.len();
    let previous = store.replace_all(decoded.chores);
    if let Err(err) = store.save() {
        store.replace_all(previous);
        return Err(err);
    }

    info!("Restored {} chores from {}", count, path.display());
    Ok(count)
}

/// Delete backups in `dir` older than `retention_days`.
///
/// Returns the number of files removed. A missing directory is not an
/// error.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed.
pub fn cleanup_backups(dir: &Path, retention_days: u32, now: DateTime<Utc>) -> Result<usize> {
    let cutoff = now - Duration::days(i64::from(retention_days));
    let mut removed = 0;
    for backup in list_backups(dir)? {
        if backup.created_at >= cutoff {
            continue;
        }
        match std::fs::remove_file(&backup.path) {
            Ok(()) => {
                debug!("Removed old backup {}", backup.path.display());
                removed += 1;
            }
            Err(err) => warn!("Failed to remove backup {}: {}", backup.path.display(), err),
        }
    }
    if removed > 0 {
        info!("Removed {} backups older than {} days", removed, retention_days);
    }
    Ok(removed)
}

/// List backups in `dir`, oldest first.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be read.
pub fn list_backups(dir: &Path) -> Result<Vec<BackupInfo>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut backups = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(BACKUP_PREFIX) || !name.ends_with(".json") {
            continue;
        }
        let metadata = entry.metadata()?;
        let created_at = parse_stamp(name)
            .or_else(|| metadata.modified().ok().map(DateTime::<Utc>::from))
            .unwrap_or_default();
        backups.push(BackupInfo {
            path,
            created_at,
            size_bytes: metadata.len(),
        });
    }
    backups.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.path.cmp(&b.path)));
    Ok(backups)
}

/// Timestamp encoded in a backup file name.
fn parse_stamp(name: &str) -> Option<DateTime<Utc>> {
    let stem = name.strip_prefix(BACKUP_PREFIX)?.strip_suffix(".json")?;
    let stamp = stem.get(..15)?;
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::temp_dir;
    use chrono::TimeZone;

    fn at(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, 6, 30, 0).unwrap()
    }

    fn store_with(dir: &Path, names: &[&str]) -> ChoreStore {
        let mut store = ChoreStore::open(dir.join("chores.json")).unwrap();
        for name in names {
            store.insert(Chore::new(*name, at(1, 1))).unwrap();
        }
        store.save().unwrap();
        store
    }

    #[test]
    fn test_parse_stamp() {
        assert_eq!(
            parse_stamp("chore_tracker_backup_20240102_063000.json"),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 6, 30, 0).unwrap())
        );
        assert!(parse_stamp("chore_tracker_backup_20240102_063000_1.json").is_some());
        assert!(parse_stamp("chore_tracker_backup_garbage.json").is_none());
        assert!(parse_stamp("other.json").is_none());
    }

    #[test]
    fn test_create_and_restore() {
        let dir = temp_dir("backup_restore");
        let backups = dir.join("backups");
        let mut store = store_with(&dir, &["Dishes", "Laundry"]);

        let path = create_backup(&store, &backups, at(2, 1)).unwrap();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("chore_tracker_backup_20240201_063000"));

        let id = store.resolve_id("Dishes").unwrap();
        store.remove(&id);
        store.save().unwrap();
        assert_eq!(store.len(), 1);

        assert_eq!(restore_backup(&mut store, &path).unwrap(), 2);
        let reopened = ChoreStore::open(dir.join("chores.json")).unwrap();
        assert!(reopened.find("Dishes").is_some());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_same_second_backups_get_suffix() {
        let dir = temp_dir("backup_suffix");
        let store = store_with(&dir, &["A"]);
        let first = create_backup(&store, &dir, at(2, 1)).unwrap();
        let second = create_backup(&store, &dir, at(2, 1)).unwrap();
        assert_ne!(first, second);
        assert_eq!(list_backups(&dir).unwrap().len(), 2);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_restore_drops_clashing_names() {
        let dir = temp_dir("backup_clash");
        let mut store = store_with(&dir, &["A"]);
        let first = Chore::new("Dishes", at(1, 1));
        let second = Chore::new("Dishes", at(1, 2));
        assert_ne!(first.id, second.id);
        let mut chores = serde_json::Map::new();
        for chore in [&first, &second] {
            chores.insert(chore.id.clone(), serde_json::to_value(chore).unwrap());
        }
        let path = dir.join("clash.json");
        let doc = serde_json::json!({ "version": CURRENT_VERSION, "chores": chores });
        std::fs::write(&path, doc.to_string()).unwrap();

        assert_eq!(restore_backup(&mut store, &path).unwrap(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.find("Dishes").is_some());
        assert!(store.find("A").is_none());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_restore_rejects_non_backup() {
        let dir = temp_dir("backup_reject");
        let mut store = store_with(&dir, &["A"]);
        let bogus = dir.join("bogus.json");
        std::fs::write(&bogus, r#"{"timestamp": "x"}"#).unwrap();

        let err = restore_backup(&mut store, &bogus).unwrap_err();
        assert!(matches!(err, Error::Backup { .. }));
        assert_eq!(store.len(), 1);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_cleanup_respects_retention() {
        let dir = temp_dir("backup_cleanup");
        let store = store_with(&dir, &["A"]);
        create_backup(&store, &dir, at(1, 1)).unwrap();
        create_backup(&store, &dir, at(3, 1)).unwrap();
        create_backup(&store, &dir, at(3, 20)).unwrap();

        let removed = cleanup_backups(&dir, 30, at(3, 25)).unwrap();
        assert_eq!(removed, 1);
        let left = list_backups(&dir).unwrap();
        assert_eq!(left.len(), 2);
        assert!(left[0].created_at < left[1].created_at);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = std::env::temp_dir().join("chore_tracker_no_such_backup_dir");
        assert!(list_backups(&dir).unwrap().is_empty());
        assert_eq!(cleanup_backups(&dir, 1, Utc::now()).unwrap(), 0);
    }
}
