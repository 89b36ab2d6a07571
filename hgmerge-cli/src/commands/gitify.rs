//! Gitify command - convert a Mercurial repository to git

use std::path::PathBuf;

use clap::Args;
use hgmerge_core::Hg;

/// Arguments for the gitify command
#[derive(Args, Debug)]
pub struct GitifyArgs {
    /// Mercurial repository to convert (defaults to current directory)
    #[arg(short, long)]
    pub repo: Option<PathBuf>,

    /// Where to create the git repository (defaults to `<repo>-git`)
    #[arg(short, long)]
    pub git_repo: Option<PathBuf>,
}

impl GitifyArgs {
    /// Execute the gitify command
    pub async fn execute(&self, hg: &Hg) -> anyhow::Result<()> {
        let target = hg
            .gitify(self.repo.as_deref(), self.git_repo.as_deref())
            .await?;
        println!("Git repository created at {}", target.display());
        Ok(())
    }
}
