//! hgmerge core - clone Mercurial repositories and merge several into one
//!
//! This crate drives the `hg` command line. Its main workflow takes a list of
//! source repositories and builds a combined repository where each source's
//! history lives on under its own folder.

mod client;
pub mod config;
pub mod error;
pub mod hg;
pub mod merge;
pub mod process;
pub mod relocate;
pub mod source;

pub use client::{Hg, HgVersion};
pub use config::Config;
pub use error::{Error, Result};
pub use hg::{Changeset, HgRepo, PullOptions, RemoveOptions, Repository, UpdateOptions};
pub use merge::{merge, MergeOrchestrator, MergeState};
pub use process::{CommandOutput, CommandRunner, Condition, Invocation, SystemRunner};
pub use source::SourceDescriptor;
