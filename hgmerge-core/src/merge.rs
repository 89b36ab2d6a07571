//! Multi-source clone-and-merge workflow
//!
//! Each source is pulled into the destination as unrelated history, its
//! files are moved into a folder named after the source, and the result is
//! merged with everything combined so far. Sources are handled one at a time,
//! in the order given: the order decides both the merge history and the
//! folder names.

use std::path::Path;

use tracing::{info, warn};

use crate::hg::repo::{PullOptions, RemoveOptions, Repository, UpdateOptions};
use crate::hg::url::short_id;
use crate::process::Condition;
use crate::relocate::{list_entries, relocate_into, METADATA_DIR};
use crate::source::SourceDescriptor;
use crate::Result;

/// Revision checked out after each pull
const DEFAULT_REVISION: &str = "default";

/// Failures of `hg remove --after` that still leave the removals recorded
const REMOVE_BENIGN: &[Condition] = &[Condition::StillExists];

/// Failures of the merge commit that mean there was nothing to merge
const MERGE_BENIGN: &[Condition] = &[
    Condition::NothingToMerge,
    Condition::WorkingDirectoryAncestor,
];

/// Progress of one merge workflow
///
/// Owns the destination for as long as the workflow runs.
#[derive(Debug)]
pub struct MergeState<R> {
    destination: R,
    merged_names: Vec<String>,
    index: usize,
}

impl<R: Repository> MergeState<R> {
    fn new(destination: R) -> Self {
        Self {
            destination,
            merged_names: Vec::new(),
            index: 0,
        }
    }

    /// Folder names committed so far, in merge order
    pub fn merged_names(&self) -> &[String] {
        &self.merged_names
    }

    /// Index of the next source to process
    pub fn index(&self) -> usize {
        self.index
    }

    /// The destination repository
    pub fn destination(&self) -> &R {
        &self.destination
    }

    /// Give the destination repository back
    pub fn into_destination(self) -> R {
        self.destination
    }

    /// Folder name for a source, suffixed when the basename is taken
    fn unique_name(&self, source: &SourceDescriptor) -> Result<String> {
        let base = source.basename()?;
        let mut name = base.clone();
        while self.merged_names.contains(&name) {
            name = format!("{}-{}", base, short_id());
        }
        Ok(name)
    }

    fn record(&mut self, name: String) {
        self.merged_names.push(name);
        self.index += 1;
    }
}

/// Drives the clone-and-merge workflow against one destination repository
#[derive(Debug)]
pub struct MergeOrchestrator<R> {
    state: MergeState<R>,
}

impl<R: Repository> MergeOrchestrator<R> {
    /// Prepare to merge into `destination`, which should be an empty repository
    pub fn new(destination: R) -> Self {
        Self {
            state: MergeState::new(destination),
        }
    }

    /// Merge `sources` in order and return the final state
    ///
    /// The first source only gets its relocation commit; every later one is
    /// merged into the combined history. Any failure other than the known
    /// benign ones aborts at once and leaves the destination as it is.
    /// Nested lists and sources without a usable folder name are rejected
    /// before anything runs; a missing source fails with
    /// [`crate::Error::SourceNotFound`] naming that entry.
    pub async fn run(mut self, sources: &[SourceDescriptor]) -> Result<MergeState<R>> {
        SourceDescriptor::validate_entries(sources)?;

        for source in sources {
            self.merge_one(source).await?;
        }

        info!(
            destination = %self.state.destination.path().display(),
            merged = ?self.state.merged_names,
            "Merge complete"
        );
        Ok(self.state)
    }

    async fn merge_one(&mut self, source: &SourceDescriptor) -> Result<()> {
        let name = self.state.unique_name(source)?;
        let first = self.state.merged_names.is_empty();
        let repo = &mut self.state.destination;

        info!(
            source = %source,
            name = %name,
            index = self.state.index,
            "Pulling source"
        );

        repo.pull(&PullOptions {
            source: source.connection_url()?,
            force: true,
            revision: None,
        })
        .await
        .map_err(|e| e.for_source(source))?;

        repo.update(&UpdateOptions {
            clean: true,
            revision: Some(DEFAULT_REVISION.to_string()),
        })
        .await?;

        let root = repo.path().to_path_buf();
        relocate_working_files(&root, &name).await?;

        repo.add().await?;
        tolerate(
            repo.remove(&RemoveOptions { after: true }).await,
            REMOVE_BENIGN,
            "remove",
        )?;
        repo.commit(&format!("Moving repository {} into folder {}", name, name))
            .await?;

        if !first {
            info!(name = %name, "Merging into combined history");
            repo.merge().await?;
            tolerate(
                repo.commit(&format!("Merging {} into combined", name)).await,
                MERGE_BENIGN,
                "merge commit",
            )?;
        }

        self.state.record(name);
        Ok(())
    }
}

/// Merge `sources` into `destination` in order and return the destination
pub async fn merge<R: Repository>(sources: &[SourceDescriptor], destination: R) -> Result<R> {
    let state = MergeOrchestrator::new(destination).run(sources).await?;
    Ok(state.into_destination())
}

async fn relocate_working_files(root: &Path, name: &str) -> Result<()> {
    let entries = list_entries(root, METADATA_DIR).await?;
    relocate_into(root, name, &entries).await
}

fn tolerate(result: Result<()>, benign: &[Condition], step: &str) -> Result<()> {
    match result {
        Err(e) if e.is_any_of(benign) => {
            warn!(step, error = %e, "Ignoring benign failure");
            Ok(())
        }
        other => other,
    }
}
