//! # State Store
//!
//! The persisted record of "what is currently installed": one
//! [`ScriptRecord`] per installed script, keyed by name, plus an explicit
//! owner-count table of repository clones so a shared clone is never pruned
//! while any record still references it.
//!
//! ## Design
//!
//! The store is abstracted behind the [`StateStore`] trait so the
//! reconciliation engine never touches storage directly. Two
//! implementations exist:
//!
//! - **`JsonStateStore`**: the real store, a single JSON document written
//!   atomically (temp file + rename) so a reader never observes a partial
//!   write.
//! - **`MemoryStateStore`**: an in-memory store used by tests.
//!
//! The document carries a `schema_version`. New optional fields default
//! safely when loading an older document, and the version is bumped on the
//! next write; a document written by a newer version of the tool is
//! rejected rather than silently mangled.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Current on-disk schema version.
pub const SCHEMA_VERSION: u32 = 2;

/// One entry per installed script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRecord {
    /// Unique identifier; uniqueness is a store-wide invariant.
    pub name: String,
    /// Source repository.
    pub repository_url: String,
    /// Branch, tag, or commit as requested by the user; `None` means the
    /// remote's default branch.
    #[serde(default)]
    pub requested_ref: Option<String>,
    /// Concrete commit the ref resolved to at install/update time.
    pub resolved_commit: String,
    /// Path of the script within the clone working copy.
    pub script_relative_path: PathBuf,
    /// Ordered, unique dependency specifiers.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Absolute path of the materialized entry point.
    pub install_path: PathBuf,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A shared, reference-counted local clone of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneRecord {
    /// Local clone path (1:1 with the repository URL).
    pub path: PathBuf,
    /// Number of `ScriptRecord`s referencing this clone.
    pub ref_count: u32,
}

/// The full persisted state document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub schema_version: u32,
    /// Script records keyed by name. BTreeMap keeps iteration in stable
    /// name order, which batch operations rely on.
    #[serde(default)]
    pub scripts: BTreeMap<String, ScriptRecord>,
    /// Clone owner-count table keyed by repository URL.
    #[serde(default)]
    pub clones: BTreeMap<String, CloneRecord>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            scripts: BTreeMap::new(),
            clones: BTreeMap::new(),
        }
    }
}

impl State {
    pub fn get_script(&self, name: &str) -> Option<&ScriptRecord> {
        self.scripts.get(name)
    }

    /// Insert or replace a record and keep the clone owner-count table in
    /// step: a brand-new record takes a reference on its clone, and a
    /// record whose repository URL changed moves its reference over.
    pub fn upsert_script(&mut self, record: ScriptRecord, clone_path: &Path) {
        let previous = self.scripts.insert(record.name.clone(), record.clone());

        match previous {
            Some(prev) if prev.repository_url == record.repository_url => {}
            Some(prev) => {
                self.release_clone(&prev.repository_url);
                self.acquire_clone(&record.repository_url, clone_path);
            }
            None => self.acquire_clone(&record.repository_url, clone_path),
        }
    }

    /// Remove a record, decrementing its clone's reference count.
    ///
    /// Returns the removed record and, when the count reached zero, the
    /// clone path now eligible for pruning.
    pub fn remove_script(&mut self, name: &str) -> Option<(ScriptRecord, Option<PathBuf>)> {
        let record = self.scripts.remove(name)?;
        let prunable = self.release_clone(&record.repository_url);
        Some((record, prunable))
    }

    pub fn clone_ref_count(&self, repository_url: &str) -> u32 {
        self.clones
            .get(repository_url)
            .map(|c| c.ref_count)
            .unwrap_or(0)
    }

    fn acquire_clone(&mut self, repository_url: &str, clone_path: &Path) {
        let entry = self
            .clones
            .entry(repository_url.to_string())
            .or_insert_with(|| CloneRecord {
                path: clone_path.to_path_buf(),
                ref_count: 0,
            });
        entry.path = clone_path.to_path_buf();
        entry.ref_count += 1;
    }

    /// Decrement a clone's reference count; when it reaches zero the entry
    /// is dropped from the table and its path returned for pruning.
    fn release_clone(&mut self, repository_url: &str) -> Option<PathBuf> {
        let record = self.clones.get_mut(repository_url)?;
        record.ref_count = record.ref_count.saturating_sub(1);
        if record.ref_count == 0 {
            self.clones.remove(repository_url).map(|c| c.path)
        } else {
            None
        }
    }
}

/// A trait that defines the narrow read/write interface of the store.
///
/// The reconciliation engine loads state once per operation and writes it
/// back once per mutating operation; no partial writes are observable.
pub trait StateStore {
    fn load(&self) -> Result<State>;
    fn save(&self, state: &State) -> Result<()>;
}

/// The real store: a single JSON document on disk.
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Result<State> {
        if !self.path.exists() {
            return Ok(State::default());
        }

        let raw = fs::read_to_string(&self.path)?;
        let mut state: State = serde_json::from_str(&raw)?;

        if state.schema_version > SCHEMA_VERSION {
            return Err(Error::State {
                message: format!(
                    "state file {} has schema version {} but this build supports up to {}",
                    self.path.display(),
                    state.schema_version,
                    SCHEMA_VERSION
                ),
            });
        }
        if state.schema_version < SCHEMA_VERSION {
            // Older documents deserialize with safe defaults for new
            // fields; the bump is persisted on the next save.
            debug!(
                "upgrading state schema from version {} to {}",
                state.schema_version, SCHEMA_VERSION
            );
            state.schema_version = SCHEMA_VERSION;
        }

        Ok(state)
    }

    fn save(&self, state: &State) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| Error::State {
            message: format!("state file path {} has no parent", self.path.display()),
        })?;
        fs::create_dir_all(parent)?;

        // Rename-based write: the next reader sees either the old document
        // or the new one, never a partial file.
        let rendered = serde_json::to_string_pretty(state)?;
        let tmp_path = parent.join(format!(
            ".{}.tmp",
            self.path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "state.json".to_string())
        ));
        fs::write(&tmp_path, rendered)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<State>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<State> {
        let state = self.state.lock().map_err(|_| Error::State {
            message: "state lock poisoned".to_string(),
        })?;
        Ok(state.clone())
    }

    fn save(&self, state: &State) -> Result<()> {
        let mut guard = self.state.lock().map_err(|_| Error::State {
            message: "state lock poisoned".to_string(),
        })?;
        *guard = state.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(name: &str, url: &str) -> ScriptRecord {
        let now = Utc::now();
        ScriptRecord {
            name: name.to_string(),
            repository_url: url.to_string(),
            requested_ref: Some("main".to_string()),
            resolved_commit: "0123456789abcdef0123456789abcdef01234567".to_string(),
            script_relative_path: PathBuf::from(format!("{}.py", name)),
            dependencies: vec!["requests".to_string()],
            install_path: PathBuf::from(format!("/home/u/.local/bin/{}.py", name)),
            installed_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_upsert_new_record_takes_clone_reference() {
        let mut state = State::default();
        state.upsert_script(record("a.py", "https://x/repo"), Path::new("/clones/repo"));
        assert_eq!(state.clone_ref_count("https://x/repo"), 1);
        assert!(state.get_script("a.py").is_some());
    }

    #[test]
    fn test_upsert_same_record_does_not_double_count() {
        let mut state = State::default();
        let clone = Path::new("/clones/repo");
        state.upsert_script(record("a.py", "https://x/repo"), clone);
        state.upsert_script(record("a.py", "https://x/repo"), clone);
        assert_eq!(state.clone_ref_count("https://x/repo"), 1);
    }

    #[test]
    fn test_two_scripts_share_one_clone() {
        let mut state = State::default();
        let clone = Path::new("/clones/repo");
        state.upsert_script(record("a.py", "https://x/repo"), clone);
        state.upsert_script(record("b.py", "https://x/repo"), clone);
        assert_eq!(state.clone_ref_count("https://x/repo"), 2);

        // Removing one keeps the clone referenced
        let (_, prunable) = state.remove_script("a.py").unwrap();
        assert!(prunable.is_none());
        assert_eq!(state.clone_ref_count("https://x/repo"), 1);

        // Removing the second makes it eligible for pruning
        let (_, prunable) = state.remove_script("b.py").unwrap();
        assert_eq!(prunable, Some(PathBuf::from("/clones/repo")));
        assert_eq!(state.clone_ref_count("https://x/repo"), 0);
    }

    #[test]
    fn test_upsert_with_changed_url_moves_reference() {
        let mut state = State::default();
        state.upsert_script(record("a.py", "https://x/old"), Path::new("/clones/old"));
        state.upsert_script(record("a.py", "https://x/new"), Path::new("/clones/new"));

        assert_eq!(state.clone_ref_count("https://x/old"), 0);
        assert_eq!(state.clone_ref_count("https://x/new"), 1);
    }

    #[test]
    fn test_remove_unknown_script() {
        let mut state = State::default();
        assert!(state.remove_script("missing.py").is_none());
    }

    #[test]
    fn test_scripts_iterate_in_name_order() {
        let mut state = State::default();
        let clone = Path::new("/clones/repo");
        state.upsert_script(record("zeta.py", "https://x/repo"), clone);
        state.upsert_script(record("alpha.py", "https://x/repo"), clone);

        let names: Vec<_> = state.scripts.keys().cloned().collect();
        assert_eq!(names, vec!["alpha.py", "zeta.py"]);
    }

    #[test]
    fn test_json_store_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = JsonStateStore::new(temp.path().join("state.json"));

        let mut state = State::default();
        state.upsert_script(record("a.py", "https://x/repo"), Path::new("/clones/repo"));
        store.save(&state).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_json_store_missing_file_is_empty_state() {
        let temp = TempDir::new().unwrap();
        let store = JsonStateStore::new(temp.path().join("state.json"));
        let state = store.load().unwrap();
        assert!(state.scripts.is_empty());
        assert_eq!(state.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_json_store_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let store = JsonStateStore::new(temp.path().join("deep/nested/state.json"));
        store.save(&State::default()).unwrap();
        assert!(temp.path().join("deep/nested/state.json").exists());
    }

    #[test]
    fn test_json_store_save_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let store = JsonStateStore::new(temp.path().join("state.json"));
        store.save(&State::default()).unwrap();

        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.contains(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {:?}", leftovers);
    }

    #[test]
    fn test_json_store_upgrades_old_schema() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        // A version-1 document without the clone table or requested_ref
        fs::write(
            &path,
            r#"{
  "schema_version": 1,
  "scripts": {
    "a.py": {
      "name": "a.py",
      "repository_url": "https://x/repo",
      "resolved_commit": "0123456789abcdef0123456789abcdef01234567",
      "script_relative_path": "a.py",
      "install_path": "/home/u/.local/bin/a.py",
      "installed_at": "2024-01-01T00:00:00Z",
      "updated_at": "2024-01-01T00:00:00Z"
    }
  }
}"#,
        )
        .unwrap();

        let store = JsonStateStore::new(path);
        let state = store.load().unwrap();
        assert_eq!(state.schema_version, SCHEMA_VERSION);
        let rec = state.get_script("a.py").unwrap();
        assert_eq!(rec.requested_ref, None);
        assert!(rec.dependencies.is_empty());
    }

    #[test]
    fn test_json_store_rejects_future_schema() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        fs::write(&path, format!("{{\"schema_version\": {}}}", SCHEMA_VERSION + 1)).unwrap();

        let store = JsonStateStore::new(path);
        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("schema version"));
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStateStore::new();
        let mut state = State::default();
        state.upsert_script(record("a.py", "https://x/repo"), Path::new("/clones/repo"));
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), state);
    }
}
