//! Error types for hgmerge

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::process::Condition;

/// Result type alias for hgmerge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for hgmerge operations
#[derive(Error, Debug)]
pub enum Error {
    /// A clone source is neither a path/URL, a credentialed descriptor,
    /// nor a flat list of those
    #[error("Invalid clone source type: {received}. Must be a string, an object with a url, or a list of those")]
    InvalidSourceType { received: String },

    /// The clone source does not exist
    #[error("Clone source not found: {source_name}: {message}")]
    SourceNotFound { source_name: String, message: String },

    /// An external command failed
    ///
    /// `message` carries the tool's own output untouched.
    #[error("{command} failed: {message}")]
    Command {
        command: String,
        message: String,
        condition: Option<Condition>,
    },

    /// Moving working files into their folder failed part way through
    #[error("Failed to move {} to {}: {message}", .from.display(), .to.display())]
    Relocation {
        from: PathBuf,
        to: PathBuf,
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// The classified condition of a failed command, if any
    pub fn condition(&self) -> Option<Condition> {
        match self {
            Error::Command { condition, .. } => *condition,
            _ => None,
        }
    }

    /// Whether this is a command failure tagged with one of `conditions`
    pub fn is_any_of(&self, conditions: &[Condition]) -> bool {
        self.condition().is_some_and(|c| conditions.contains(&c))
    }

    /// Report a [`Condition::NotFound`] command failure as a missing `source`
    ///
    /// Other errors are returned unchanged.
    pub fn for_source(self, source: &impl fmt::Display) -> Self {
        match self {
            Error::Command {
                message,
                condition: Some(Condition::NotFound),
                ..
            } => Error::SourceNotFound {
                source_name: source.to_string(),
                message,
            },
            other => other,
        }
    }
}
