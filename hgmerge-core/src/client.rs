//! Entry point for cloning, creating and converting repositories

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::hg::repo::{HgRepo, Repository};
use crate::hg::url::{absolute, default_destination, short_id};
use crate::merge;
use crate::process::{CommandRunner, SystemRunner};
use crate::source::SourceDescriptor;
use crate::Result;

/// Output of `hg --version`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HgVersion {
    /// Full output of the command
    pub raw: String,
    /// Version number from the first line, e.g. `6.5.2`
    pub version: Option<String>,
}

impl HgVersion {
    /// Parse the output of `hg --version`
    pub fn parse(raw: &str) -> Self {
        let version = raw.lines().next().and_then(|line| {
            let start = line.find("(version ")? + "(version ".len();
            let end = line[start..].find(')')? + start;
            Some(line[start..end].to_string())
        });

        Self {
            raw: raw.to_string(),
            version,
        }
    }
}

/// Mercurial client
///
/// Holds the configuration and the command runner shared by every
/// repository it hands out.
#[derive(Debug, Clone)]
pub struct Hg {
    config: Config,
    runner: Arc<dyn CommandRunner>,
}

impl Hg {
    /// Create a client that runs real commands
    pub fn new(config: Config) -> Self {
        let runner = SystemRunner::new().with_timeout(config.hg.timeout);
        Self::with_runner(config, Arc::new(runner))
    }

    /// Create a client with a custom command runner
    pub fn with_runner(config: Config, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Configuration this client runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle for an existing repository at `path`
    pub fn open(&self, path: impl Into<PathBuf>) -> HgRepo {
        HgRepo::new(path, self.config.hg.clone(), self.runner.clone())
    }

    /// Clone `from` into `to`
    ///
    /// A single source is cloned with `hg clone`. A list is merged into a
    /// fresh repository, one folder per source. Without `to`, single clones
    /// land in the configured base directory under the source's basename and
    /// merged lists in a generated directory under the system temp directory.
    ///
    /// Relative paths, for `to` and for local sources, are taken from the
    /// current directory. A source reported as missing fails with
    /// [`crate::Error::SourceNotFound`] naming that source, the failing list entry
    /// for merges.
    pub async fn clone(&self, from: &SourceDescriptor, to: Option<&Path>) -> Result<HgRepo> {
        let to = to.map(absolute).transpose()?;
        self.clone_single_or_multiple(from, to.as_deref())
            .await
            .map_err(|e| e.for_source(from))
    }

    async fn clone_single_or_multiple(
        &self,
        from: &SourceDescriptor,
        to: Option<&Path>,
    ) -> Result<HgRepo> {
        match from {
            SourceDescriptor::List(sources) => {
                SourceDescriptor::validate_entries(sources)?;

                let path = match to {
                    Some(path) => path.to_path_buf(),
                    None => std::env::temp_dir().join(format!("hgmerge-{}", short_id())),
                };
                info!(destination = %path.display(), sources = sources.len(), "Merging sources into new repository");

                let mut repo = self.open(path);
                repo.init().await?;
                merge::merge(sources, repo).await
            }
            SourceDescriptor::Credentialed { url: source, .. } | SourceDescriptor::Path(source) => {
                let path = self.destination_for(source, to)?;
                info!(source = %from, destination = %path.display(), "Cloning");
                HgRepo::clone_from(
                    &from.connection_url()?,
                    path,
                    self.config.hg.clone(),
                    self.runner.clone(),
                )
                .await
            }
        }
    }

    fn destination_for(&self, source: &str, to: Option<&Path>) -> Result<PathBuf> {
        match to {
            Some(path) => Ok(path.to_path_buf()),
            None => default_destination(&self.config.clone.base_dir()?, source),
        }
    }

    /// Create an empty repository at `to`
    pub async fn create(&self, to: impl Into<PathBuf>) -> Result<HgRepo> {
        let mut repo = self.open(to);
        repo.init().await?;
        info!(path = %repo.path().display(), "Created repository");
        Ok(repo)
    }

    /// Convert the repository at `repo_path` (default: current directory) to git
    ///
    /// Returns the path of the new git repository.
    pub async fn gitify(
        &self,
        repo_path: Option<&Path>,
        git_repo_path: Option<&Path>,
    ) -> Result<PathBuf> {
        let path = match repo_path {
            Some(path) => path.to_path_buf(),
            None => std::env::current_dir()?,
        };
        self.open(path).gitify(git_repo_path).await
    }

    /// Report the installed Mercurial version
    pub async fn version(&self) -> Result<HgVersion> {
        let invocation = HgRepo::hg_command(&self.config.hg).arg("--version");
        let output = self.runner.run(&invocation).await?;
        Ok(HgVersion::parse(&output.stdout))
    }
}
