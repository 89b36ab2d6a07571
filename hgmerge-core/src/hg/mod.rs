//! Mercurial operations for hgmerge
//!
//! This module provides the repository handle and source URL helpers.

pub(crate) mod repo;
pub mod url;

pub use repo::{Changeset, HgRepo, PullOptions, RemoveOptions, Repository, UpdateOptions};
