//! # git-rewrite
//!
//! Rewrite the author and committer metadata of a linear range of commits.
//!
//! The work is split in two steps so the metadata can be edited in between:
//! - `dump` reads the identity and timestamps of every commit after a root
//!   commit and writes them to a JSON file
//! - `apply` reads that file back, creates a new branch at the root commit,
//!   and cherry-picks each commit onto it before amending it with the
//!   recorded metadata
//!
//! ## Usage
//!
//! ```bash
//! git-rewrite dump a84477f --output history.json
//! sed -i 's/John Doe/Jane Doe/g' history.json
//! git-rewrite apply --input history.json --branch fixed-authors
//! ```
//!
//! ## Modules
//!
//! - [`cli`] - Command-line interface and main entry point
//! - [`git`] - Git command runner and wrappers
//! - [`extract`] - Parsing commit metadata from `git show`
//! - [`history`] - The dumped record and its JSON form
//! - [`replay`] - Recreating a record on a new branch
//! - [`banner`] - Summary printed before a replay
//! - [`error`] - Error type shared by all of the above

pub mod banner;
pub mod cli;
pub mod error;
pub mod extract;
pub mod git;
pub mod history;
pub mod replay;

pub use error::{Error, Result};
