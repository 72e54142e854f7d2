//! # uv-helper Library
//!
//! This library provides the core functionality for installing standalone
//! Python scripts from git repositories and keeping them up to date. It is
//! designed to be used by the `uv-helper` command-line tool but can also be
//! embedded in other applications that manage script installations.
//!
//! ## Core Concepts
//!
//! The library is built around a few key concepts:
//!
//! - **Reconciliation (`reconcile`)**: The heart of the tool. For each
//!   script it compares the desired state (repository, ref, dependencies)
//!   against the recorded state and decides whether to install, skip,
//!   update, or flag a conflict.
//! - **Git Synchronization (`git`)**: Shallow-clones repositories, fetches
//!   and resolves refs to concrete commits, and recovers from corrupted
//!   clones. Runs the system `git` binary rather than reimplementing the
//!   protocol.
//! - **State (`state`)**: The persisted record of what is installed, one
//!   entry per script plus a reference-counted table of shared repository
//!   clones. Written atomically as a single JSON document.
//! - **Dependency Resolution (`deps`)**: Merges explicitly requested
//!   dependencies with a repository-provided `requirements.txt` into a
//!   deterministic, de-duplicated list.
//! - **Installation (`installer`)**: Embeds inline script metadata (the
//!   `# /// script` block consumed by `uv run --script`) and materializes
//!   the entry-point symlink atomically.
//! - **Configuration (`config`)**: The `config.toml` schema with paths,
//!   git, and install sections, falling back to platform defaults.
//!
//! ## Execution Flow
//!
//! A typical `install` runs through these steps:
//!
//! 1. Parse the repository URL and optional ref suffix.
//! 2. Load the state document and check the script's record.
//! 3. If up to date, stop without touching the filesystem.
//! 4. Otherwise clone or fetch the repository and check out the ref.
//! 5. Resolve the dependency set and embed it into the script.
//! 6. Create the entry-point symlink and persist the new record.
//!
//! Every mutating operation persists state only after all filesystem steps
//! succeeded, so a failure leaves the previous installation intact.

pub mod config;
pub mod defaults;
pub mod deps;
pub mod error;
pub mod git;
pub mod installer;
pub mod output;
pub mod reconcile;
pub mod state;
