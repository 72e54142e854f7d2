//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `uv-helper` command-line tool. Each subcommand lives in its own file to
//! keep the logic separated and maintainable.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and
//!   options, derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic, calling into the `uv_helper` library.

pub mod completions;
pub mod install;
pub mod list;
pub mod remove;
pub mod update;
