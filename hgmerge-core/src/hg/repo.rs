//! Mercurial repository handle

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::config::HgConfig;
use crate::hg::url::absolute;
use crate::process::{CommandOutput, CommandRunner, Invocation};
use crate::{Error, Result};

/// Options for [`Repository::pull`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullOptions {
    /// Repository to pull from (path or URL, credentials already embedded)
    pub source: String,
    /// Pull even when the source is unrelated
    pub force: bool,
    /// Pull only up to this revision
    pub revision: Option<String>,
}

/// Options for [`Repository::update`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Discard uncommitted changes
    pub clean: bool,
    /// Revision to check out
    pub revision: Option<String>,
}

/// Options for [`Repository::remove`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Only record files that are already missing from disk
    pub after: bool,
}

/// Primitive operations on one on-disk repository
///
/// Each call is a single invocation of the external tool. Mutating calls take
/// `&mut self`: a workflow that holds the repository has exclusive use of its
/// working directory.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Root of the working directory
    fn path(&self) -> &Path;

    /// Create an empty repository at [`Repository::path`]
    async fn init(&mut self) -> Result<()>;

    /// Pull changesets from another repository
    async fn pull(&mut self, options: &PullOptions) -> Result<()>;

    /// Update the working directory
    async fn update(&mut self, options: &UpdateOptions) -> Result<()>;

    /// Merge the other head into the working directory
    async fn merge(&mut self) -> Result<()>;

    /// Schedule unknown files for addition
    async fn add(&mut self) -> Result<()>;

    /// Schedule files for removal
    async fn remove(&mut self, options: &RemoveOptions) -> Result<()>;

    /// Commit pending changes
    async fn commit(&mut self, message: &str) -> Result<()>;
}

/// One changeset as reported by `hg log -Tjson`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Changeset {
    /// Local revision number
    pub rev: i64,
    /// Full changeset hash
    pub node: String,
    /// Commit message
    pub desc: String,
    /// Parent hashes
    #[serde(default)]
    pub parents: Vec<String>,
    /// Branch name
    #[serde(default)]
    pub branch: String,
}

impl Changeset {
    /// Whether this changeset joins two lines of history
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// A Mercurial repository driven through the `hg` command line
#[derive(Clone)]
pub struct HgRepo {
    path: PathBuf,
    config: HgConfig,
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for HgRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HgRepo")
            .field("path", &self.path)
            .field("hg_path", &self.config.hg_path)
            .field("python_path", &self.config.python_path)
            .finish_non_exhaustive()
    }
}

impl HgRepo {
    /// Create a handle for the repository at `path`
    ///
    /// Nothing is checked or created on disk.
    pub fn new(path: impl Into<PathBuf>, config: HgConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            path: path.into(),
            config,
            runner,
        }
    }

    /// Tool configuration this handle runs with
    pub fn config(&self) -> &HgConfig {
        &self.config
    }

    /// Build an `hg` invocation with the global options applied
    pub(crate) fn hg_command(config: &HgConfig) -> Invocation {
        let mut invocation = Invocation::new(&config.hg_path).env("HGPLAIN", "1");
        if let Some(ref username) = config.username {
            invocation = invocation.args(["--config".to_string(), format!("ui.username={}", username)]);
        }
        invocation
    }

    async fn hg<I, S>(&self, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S> + Send,
        S: Into<OsString>,
    {
        let invocation = Self::hg_command(&self.config)
            .args(args)
            .current_dir(&self.path);
        self.runner.run(&invocation).await
    }

    /// Clone `url` into `path` and return a handle to the new repository
    ///
    /// A relative `path` is taken from the current directory and the handle
    /// keeps the absolute form. `url` is passed through as given.
    pub async fn clone_from(
        url: &str,
        path: impl Into<PathBuf>,
        config: HgConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self> {
        let repo = Self::new(absolute(&path.into())?, config, runner);

        let parent = match repo.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir()?,
        };
        tokio::fs::create_dir_all(&parent).await?;

        let invocation = Self::hg_command(&repo.config)
            .arg("clone")
            .arg(url)
            .arg(repo.path.as_os_str())
            .current_dir(&parent);
        repo.runner.run(&invocation).await?;

        Ok(repo)
    }

    /// Changesets in the repository, newest first
    pub async fn log(&self) -> Result<Vec<Changeset>> {
        let output = self.hg(["log", "-Tjson"]).await?;
        Ok(serde_json::from_str(&output.stdout)?)
    }

    /// Convert this repository into a git repository with hg-fast-export
    ///
    /// The git repository is created at `git_repo_path`, or next to this one
    /// with a `-git` suffix. Returns the git repository path.
    pub async fn gitify(&self, git_repo_path: Option<&Path>) -> Result<PathBuf> {
        let target = match git_repo_path {
            Some(path) => path.to_path_buf(),
            None => {
                let mut name = self
                    .path
                    .file_name()
                    .ok_or_else(|| {
                        Error::Config(format!(
                            "Cannot derive a git repository path from {}",
                            self.path.display()
                        ))
                    })?
                    .to_os_string();
                name.push("-git");
                self.path.with_file_name(name)
            }
        };

        tokio::fs::create_dir_all(&target).await?;

        let git_init = Invocation::new(&self.config.git_path)
            .arg("init")
            .arg(target.as_os_str())
            .current_dir(&target);
        self.runner.run(&git_init).await?;

        let fast_export = Invocation::new(&self.config.fast_export_path)
            .arg("-r")
            .arg(self.path.as_os_str())
            .env("PYTHON", &self.config.python_path)
            .current_dir(&target);
        self.runner.run(&fast_export).await?;

        let checkout = Invocation::new(&self.config.git_path)
            .args(["checkout", "HEAD"])
            .current_dir(&target);
        self.runner.run(&checkout).await?;

        info!(hg = %self.path.display(), git = %target.display(), "Converted repository to git");
        Ok(target)
    }
}

#[async_trait]
impl Repository for HgRepo {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn init(&mut self) -> Result<()> {
        tokio::fs::create_dir_all(&self.path).await?;
        self.hg(["init"]).await?;
        Ok(())
    }

    async fn pull(&mut self, options: &PullOptions) -> Result<()> {
        let mut args = vec!["pull".to_string()];
        if options.force {
            args.push("--force".to_string());
        }
        if let Some(ref rev) = options.revision {
            args.push("--rev".to_string());
            args.push(rev.clone());
        }
        args.push(options.source.clone());
        self.hg(args).await?;
        Ok(())
    }

    async fn update(&mut self, options: &UpdateOptions) -> Result<()> {
        let mut args = vec!["update".to_string()];
        if options.clean {
            args.push("--clean".to_string());
        }
        if let Some(ref rev) = options.revision {
            args.push("--rev".to_string());
            args.push(rev.clone());
        }
        self.hg(args).await?;
        Ok(())
    }

    async fn merge(&mut self) -> Result<()> {
        self.hg(["merge"]).await?;
        Ok(())
    }

    async fn add(&mut self) -> Result<()> {
        self.hg(["add"]).await?;
        Ok(())
    }

    async fn remove(&mut self, options: &RemoveOptions) -> Result<()> {
        let mut args = vec!["remove"];
        if options.after {
            args.push("--after");
        }
        self.hg(args).await?;
        Ok(())
    }

    async fn commit(&mut self, message: &str) -> Result<()> {
        self.hg(["commit", "--message", message]).await?;
        Ok(())
    }
}
