//! Storage layer for chore-tracker.
//!
//! This module provides a JSON file store for chores: a single versioned
//! document holding every chore keyed by id, rewritten atomically on save.

pub mod backup;
pub mod migrations;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chore::{Chore, ChoreState};
use crate::error::{Error, Result};

pub use backup::BackupInfo;
pub use migrations::CURRENT_VERSION;

/// Suffix given to a store file that failed to parse.
const CORRUPT_SUFFIX: &str = "corrupt";

/// Suffix of the temporary file written before an atomic rename.
const TEMP_SUFFIX: &str = "tmp";

/// Serialized form of the store.
#[derive(Serialize)]
struct StoreDocument<'a> {
    version: u32,
    chores: &'a BTreeMap<String, Chore>,
}

/// Storage engine for chores.
///
/// Holds the full chore collection in memory. Mutating methods only touch
/// memory; call [`ChoreStore::save`] to persist.
#[derive(Debug)]
pub struct ChoreStore {
    /// Path to the store file, `None` for in-memory stores.
    path: Option<PathBuf>,
    /// Chores keyed by id.
    chores: BTreeMap<String, Chore>,
}

impl ChoreStore {
    /// Open or create a store at the given path.
    ///
    /// Creates parent directories if needed. A missing file yields an empty
    /// store. A file that cannot be parsed is moved aside to
    /// `<name>.corrupt` and replaced by an empty store. Legacy layouts are
    /// migrated and written back immediately. A store from a newer format
    /// version is refused and left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the file cannot
    /// be read, its format version is newer than supported, or a migrated
    /// store cannot be written back.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        if !path.exists() {
            info!("No chore store at {}, starting empty", path.display());
            return Ok(Self {
                path: Some(path),
                chores: BTreeMap::new(),
            });
        }

        debug!("Loading chore store from {}", path.display());
        let raw = std::fs::read_to_string(&path).map_err(|source| Error::StorageRead {
            path: path.clone(),
            source,
        })?;

        let document = serde_json::from_str::<serde_json::Value>(&raw);
        if let Ok(doc) = &document {
            migrations::ensure_supported(doc)?;
        }
        let decoded = document
            .map_err(Error::from)
            .and_then(|doc| migrations::decode(doc, Utc::now()));

        let mut store = Self {
            path: Some(path),
            chores: BTreeMap::new(),
        };
        match decoded {
            Ok(decoded) => {
                let migrated = decoded.migrated();
                store.chores = decoded.chores;
                if decoded.skipped > 0 {
                    warn!("Skipped {} unreadable chore records", decoded.skipped);
                }
                if migrated {
                    store.save()?;
                }
            }
            Err(err) => {
                warn!("Chore store is malformed ({}), starting empty", err);
                store.quarantine();
            }
        }

        info!("Loaded {} chores from storage", store.chores.len());
        Ok(store)
    }

    /// Create a store that never touches the disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            chores: BTreeMap::new(),
        }
    }

    /// Path of the backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Persist every chore to disk.
    ///
    /// The document is written to a temporary file and renamed into place.
    /// In-memory stores do nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any file operation fails.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let bytes = self.to_bytes()?;
        let tmp = sibling(path, TEMP_SUFFIX);
        std::fs::write(&tmp, &bytes).map_err(|source| Error::StorageWrite {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, path).map_err(|source| Error::StorageWrite {
            path: path.clone(),
            source,
        })?;

        debug!("Saved {} chores to {}", self.chores.len(), path.display());
        Ok(())
    }

    /// Serialize the store document.
    ///
    /// Output is deterministic: chores are ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let doc = StoreDocument {
            version: CURRENT_VERSION,
            chores: &self.chores,
        };
        let mut bytes = serde_json::to_vec_pretty(&doc)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Add a chore.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateChore`] if the id or name is already taken.
    pub fn insert(&mut self, chore: Chore) -> Result<()> {
        if self.chores.contains_key(&chore.id) {
            return Err(Error::DuplicateChore { key: chore.id });
        }
        if self.find_by_name(&chore.name).is_some() {
            return Err(Error::DuplicateChore { key: chore.name });
        }
        self.chores.insert(chore.id.clone(), chore);
        Ok(())
    }

    /// Get a chore by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Chore> {
        self.chores.get(id)
    }

    /// Get a mutable chore by id.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Chore> {
        self.chores.get_mut(id)
    }

    /// Find a chore by exact name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Chore> {
        self.chores.values().find(|c| c.name == name)
    }

    /// Find a chore by id, falling back to exact name.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&Chore> {
        self.get(key).or_else(|| self.find_by_name(key))
    }

    /// Resolve an id or name to an id.
    #[must_use]
    pub fn resolve_id(&self, key: &str) -> Option<String> {
        self.find(key).map(|c| c.id.clone())
    }

    /// Replace a stored chore with a new version, returning the old one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChoreNotFound`] if no chore has this id, or
    /// [`Error::DuplicateChore`] if a different chore already has its name.
    pub fn replace(&mut self, chore: Chore) -> Result<Chore> {
        if let Some(other) = self.find_by_name(&chore.name) {
            if other.id != chore.id {
                return Err(Error::DuplicateChore { key: chore.name });
            }
        }
        match self.chores.get_mut(&chore.id) {
            Some(slot) => Ok(std::mem::replace(slot, chore)),
            None => Err(Error::not_found(chore.id)),
        }
    }

    /// Remove a chore by id.
    pub fn remove(&mut self, id: &str) -> Option<Chore> {
        self.chores.remove(id)
    }

    /// Replace the whole collection.
    pub fn replace_all(&mut self, chores: BTreeMap<String, Chore>) -> BTreeMap<String, Chore> {
        std::mem::replace(&mut self.chores, chores)
    }

    /// All chores, ordered by due date (undated last) and then name.
    #[must_use]
    pub fn list(&self) -> Vec<&Chore> {
        let mut chores: Vec<&Chore> = self.chores.values().collect();
        chores.sort_by(|a, b| {
            let key = |c: &Chore| (c.due_date.is_none(), c.due_date);
            key(a).cmp(&key(b)).then_with(|| a.name.cmp(&b.name))
        });
        chores
    }

    /// Ids of all chores.
    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.chores.keys()
    }

    /// Iterate over all chores in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Chore> {
        self.chores.values()
    }

    /// Number of stored chores.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chores.len()
    }

    /// Whether the store holds no chores.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chores.is_empty()
    }

    /// Summary statistics about the store.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let count = |state| self.chores.values().filter(|c| c.state == state).count();
        let file_size_bytes = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map_or(0, |m| m.len());

        StoreStats {
            total_chores: self.chores.len(),
            pending: count(ChoreState::Pending),
            completed: count(ChoreState::Completed),
            overdue: count(ChoreState::Overdue),
            version: CURRENT_VERSION,
            path: self.path.clone(),
            file_size_bytes,
        }
    }

    /// Move an unreadable store file aside so it is not overwritten.
    fn quarantine(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let target = sibling(path, CORRUPT_SUFFIX);
        match std::fs::rename(path, &target) {
            Ok(()) => warn!("Moved unreadable chore store to {}", target.display()),
            Err(err) => warn!("Could not move unreadable chore store aside: {}", err),
        }
    }
}

/// `path` with an extra extension appended, e.g. `chores.json.tmp`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Statistics about the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Total number of chores.
    pub total_chores: usize,
    /// Chores in the pending state.
    pub pending: usize,
    /// Chores in the completed state.
    pub completed: usize,
    /// Chores in the overdue state.
    pub overdue: usize,
    /// Format version written on save.
    pub version: u32,
    /// Backing file, if any.
    pub path: Option<PathBuf>,
    /// Size of the backing file in bytes.
    pub file_size_bytes: u64,
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    /// A fresh, empty directory under the system temp dir.
    pub(crate) fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "chore_tracker_test_{}_{}",
            std::process::id(),
            tag
        ));
        let _ = std::fs::remove_dir_all(&dir);
        let _ = std::fs::remove_file(&dir);
        std::fs::create_dir_all(&dir).expect("failed to create temp dir");
        dir
    }
}
