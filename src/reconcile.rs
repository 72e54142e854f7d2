//! # Reconciliation Engine
//!
//! The orchestrator of the tool: given a desired script specification and
//! the current state record (if any), decides whether to install, skip,
//! update, or report a conflict, and drives the git synchronizer, dependency
//! resolver, and installer accordingly.
//!
//! State machine per script name:
//!
//! - **Absent** → synchronize, resolve dependencies, materialize, create
//!   record → `Installed`.
//! - **Present, unchanged** (same repository, ref resolves to the recorded
//!   commit, dependency set identical) → `Skipped`; no filesystem writes.
//! - **Present, changed** (commit or dependency drift, or `force`) → full
//!   re-synchronization and re-materialization → `Updated`.
//! - **Present, conflicting** (the entry point exists but is not owned by
//!   the record, or the record's artifact is missing) → `Conflict`; nothing
//!   destructive happens.
//! - **Removal** → entry point and record are deleted together and the
//!   owning clone's reference count is decremented; a count of zero makes
//!   the clone directory eligible for pruning → `Removed`.
//!
//! Any component failure aborts reconciliation for that single script and
//! leaves its prior record and artifact untouched. Batch operations report
//! results per script so one failure never aborts the rest of the batch.
//!
//! Execution is single-threaded and sequential; batches iterate records in
//! stable name order with no overlapping git or filesystem operations.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, info, warn};

use crate::config::Settings;
use crate::deps;
use crate::error::{Error, Result};
use crate::git::{self, GitSync, SystemGit};
use crate::installer;
use crate::state::{JsonStateStore, ScriptRecord, State, StateStore};

/// Desired state for one script, as requested by the user.
#[derive(Debug, Clone)]
pub struct DesiredScript {
    /// Entry-point name; equals the script's file name.
    pub name: String,
    pub repository_url: String,
    /// `None` requests the remote's default branch.
    pub requested_ref: Option<String>,
    pub script_relative_path: PathBuf,
    /// Explicitly requested dependencies; manifest entries are merged in
    /// during resolution.
    pub dependencies: Vec<String>,
}

impl DesiredScript {
    /// Build a desired spec from a repository source and a script path.
    pub fn new(source: &git::GitSource, script: &Path, dependencies: Vec<String>) -> Self {
        let name = script
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| script.to_string_lossy().into_owned());
        Self {
            name,
            repository_url: source.base_url.clone(),
            requested_ref: source.reference.clone(),
            script_relative_path: script.to_path_buf(),
            dependencies,
        }
    }
}

/// Outcome of reconciling one script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Installed,
    Skipped,
    Updated,
    Removed,
    /// The entry point exists but is not owned by the record, or the
    /// record's artifact is missing. Never auto-resolved.
    Conflict,
}

impl Action {
    /// Conflicts make the process exit non-zero.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Action::Conflict)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Installed => "installed",
            Action::Skipped => "up-to-date",
            Action::Updated => "updated",
            Action::Removed => "removed",
            Action::Conflict => "conflict",
        };
        f.write_str(s)
    }
}

/// The engine. Owns trait objects for git and storage so tests can inject
/// mocks without running `git` or touching a real state file.
pub struct Reconciler {
    settings: Settings,
    git: Box<dyn GitSync>,
    store: Box<dyn StateStore>,
}

impl Reconciler {
    /// Engine wired to the system git binary and the on-disk state file.
    pub fn new(settings: Settings) -> Self {
        let git = SystemGit::new(settings.repo_dir.clone(), settings.clone_depth);
        let store = JsonStateStore::new(settings.state_file.clone());
        Self {
            settings,
            git: Box::new(git),
            store: Box::new(store),
        }
    }

    /// Engine with injected components, used by tests.
    pub fn with_components(
        settings: Settings,
        git: Box<dyn GitSync>,
        store: Box<dyn StateStore>,
    ) -> Self {
        Self {
            settings,
            git,
            store,
        }
    }

    /// All records, in stable name order.
    pub fn records(&self) -> Result<Vec<ScriptRecord>> {
        Ok(self.store.load()?.scripts.into_values().collect())
    }

    /// Reconcile a desired script specification against the store.
    pub fn install(&self, desired: &DesiredScript, force: bool) -> Result<Action> {
        let mut state = self.store.load()?;

        if let Some(record) = state.get_script(&desired.name).cloned() {
            if let Some(conflict) = self.artifact_conflict(&state, &record) {
                warn!("conflict for '{}': {}", record.name, conflict);
                return Ok(Action::Conflict);
            }

            if !force && self.matches_record(&state, &record, desired)? {
                debug!("'{}' already up to date, skipping", desired.name);
                return Ok(Action::Skipped);
            }

            let (record, clone_path) = self.synchronize(desired, Some(&record))?;
            state.upsert_script(record, &clone_path);
            self.store.save(&state)?;
            info!("updated '{}'", desired.name);
            return Ok(Action::Updated);
        }

        let (record, clone_path) = self.synchronize(desired, None)?;
        state.upsert_script(record, &clone_path);
        self.store.save(&state)?;
        info!("installed '{}'", desired.name);
        Ok(Action::Installed)
    }

    /// Re-reconcile one installed script against its own recorded ref.
    pub fn update(&self, name: &str, force: bool) -> Result<Action> {
        let mut state = self.store.load()?;
        let record = state
            .get_script(name)
            .cloned()
            .ok_or_else(|| Error::ScriptNotFound {
                name: name.to_string(),
            })?;

        if let Some(conflict) = self.artifact_conflict(&state, &record) {
            warn!("conflict for '{}': {}", name, conflict);
            return Ok(Action::Conflict);
        }

        // With branch-following disabled, an installed script is pinned to
        // its recorded commit unless explicitly forced.
        if !force && !self.settings.follow_branches {
            debug!("'{}' pinned (follow_branches = false)", name);
            return Ok(Action::Skipped);
        }

        if !force {
            let commit = self
                .git
                .resolve(&record.repository_url, record.requested_ref.as_deref())?;
            let clone_ok = self
                .clone_path_of(&state, &record)
                .map(|p| p.is_dir())
                .unwrap_or(false);
            if commit == record.resolved_commit && clone_ok {
                debug!("'{}' already at {}, skipping", name, commit);
                return Ok(Action::Skipped);
            }
        }

        let desired = DesiredScript {
            name: record.name.clone(),
            repository_url: record.repository_url.clone(),
            requested_ref: record.requested_ref.clone(),
            script_relative_path: record.script_relative_path.clone(),
            // The recorded list already contains prior manifest entries;
            // re-resolution appends anything new from the fresh checkout.
            dependencies: record.dependencies.clone(),
        };
        let (updated, clone_path) = self.synchronize(&desired, Some(&record))?;
        state.upsert_script(updated, &clone_path);
        self.store.save(&state)?;
        info!("updated '{}'", name);
        Ok(Action::Updated)
    }

    /// Update every tracked script, one at a time in name order.
    ///
    /// Each script's ref is re-resolved independently; synchronization and
    /// re-materialization only happen for scripts that drifted. Failures
    /// are reported per script and never abort the batch.
    pub fn update_all(&self, force: bool) -> Result<Vec<(String, Result<Action>)>> {
        let names: Vec<String> = self.store.load()?.scripts.keys().cloned().collect();
        let mut results = Vec::with_capacity(names.len());
        for name in names {
            let outcome = self.update(&name, force);
            results.push((name, outcome));
        }
        Ok(results)
    }

    /// Remove an installed script: delete the entry point and the record
    /// together, decrement the clone's reference count, and prune the
    /// clone directory when requested and no longer referenced.
    pub fn remove(&self, name: &str, prune_clone: bool) -> Result<Action> {
        let mut state = self.store.load()?;
        let record = state
            .get_script(name)
            .cloned()
            .ok_or_else(|| Error::ScriptNotFound {
                name: name.to_string(),
            })?;

        // Never delete an entry point this record does not own.
        if installer::entry_exists(&record.install_path) {
            let owned = self
                .clone_path_of(&state, &record)
                .map(|clone| installer::is_owned_by_clone(&record.install_path, &clone))
                .unwrap_or(false);
            if !owned {
                warn!(
                    "conflict for '{}': entry point {} is not managed by uv-helper",
                    name,
                    record.install_path.display()
                );
                return Ok(Action::Conflict);
            }
        }

        installer::remove_entry_point(&record.install_path)?;

        let prunable = state
            .remove_script(name)
            .and_then(|(_, prunable)| prunable);
        self.store.save(&state)?;

        if let Some(clone_path) = prunable {
            if prune_clone && clone_path.is_dir() {
                info!("pruning unreferenced clone {}", clone_path.display());
                fs::remove_dir_all(&clone_path)?;
            } else {
                debug!(
                    "clone {} is no longer referenced and eligible for pruning",
                    clone_path.display()
                );
            }
        }

        info!("removed '{}'", name);
        Ok(Action::Removed)
    }

    /// Full synchronization for one script: git, dependency resolution,
    /// materialization. Returns the new record and the clone path.
    ///
    /// Nothing is persisted here; the caller writes the record only after
    /// every step succeeded, so a failure leaves prior state untouched.
    fn synchronize(
        &self,
        desired: &DesiredScript,
        previous: Option<&ScriptRecord>,
    ) -> Result<(ScriptRecord, PathBuf)> {
        let synced = self
            .git
            .ensure(&desired.repository_url, desired.requested_ref.as_deref())?;

        let dependencies = deps::resolve(
            &desired.dependencies,
            &synced.clone_path,
            &desired.script_relative_path,
        )?;

        let install_path = installer::materialize(
            &synced.clone_path,
            &desired.script_relative_path,
            &dependencies,
            &self.settings.install_dir,
            self.settings.auto_chmod,
        )?;

        let now = Utc::now();
        let record = ScriptRecord {
            name: desired.name.clone(),
            repository_url: desired.repository_url.clone(),
            requested_ref: desired.requested_ref.clone(),
            resolved_commit: synced.commit.clone(),
            script_relative_path: desired.script_relative_path.clone(),
            dependencies,
            install_path,
            installed_at: previous.map(|r| r.installed_at).unwrap_or(now),
            updated_at: now,
        };

        Ok((record, synced.clone_path))
    }

    /// Check whether the desired spec matches the existing record without
    /// performing any filesystem writes.
    fn matches_record(
        &self,
        state: &State,
        record: &ScriptRecord,
        desired: &DesiredScript,
    ) -> Result<bool> {
        if record.repository_url != desired.repository_url
            || record.requested_ref != desired.requested_ref
            || record.script_relative_path != desired.script_relative_path
        {
            return Ok(false);
        }

        // A missing clone means the dependency manifest cannot be compared
        // and the working copy must be rebuilt anyway.
        let clone_path = match self.clone_path_of(state, record) {
            Some(path) if path.is_dir() => path,
            _ => return Ok(false),
        };

        let commit = self
            .git
            .resolve(&desired.repository_url, desired.requested_ref.as_deref())?;
        if commit != record.resolved_commit {
            return Ok(false);
        }

        let dependencies = deps::resolve(
            &desired.dependencies,
            &clone_path,
            &desired.script_relative_path,
        )?;
        Ok(dependencies == record.dependencies)
    }

    /// The clone path a record's repository maps to, from the owner-count
    /// table.
    fn clone_path_of(&self, state: &State, record: &ScriptRecord) -> Option<PathBuf> {
        state
            .clones
            .get(&record.repository_url)
            .map(|c| c.path.clone())
    }

    /// Detect tampering: the record's entry point is missing, or exists
    /// but is not a symlink into the record's clone.
    fn artifact_conflict(&self, state: &State, record: &ScriptRecord) -> Option<String> {
        if !installer::entry_exists(&record.install_path) {
            return Some(format!(
                "entry point {} is missing",
                record.install_path.display()
            ));
        }
        let clone = self.clone_path_of(state, record)?;
        if !installer::is_owned_by_clone(&record.install_path, &clone) {
            return Some(format!(
                "entry point {} is not owned by this record",
                record.install_path.display()
            ));
        }
        None
    }
}
