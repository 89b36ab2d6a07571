//! Clone command - clone one repository or merge several into one

use std::path::PathBuf;

use clap::Args;
use hgmerge_core::{Hg, Repository, SourceDescriptor};

/// Arguments for the clone command
#[derive(Args, Debug)]
pub struct CloneArgs {
    /// Source paths or URLs; more than one merges them in the given order
    #[arg(required_unless_present = "sources_json")]
    pub sources: Vec<String>,

    /// Read sources from a JSON file (a string, an object with url/username/password, or a list)
    #[arg(long, conflicts_with = "sources")]
    pub sources_json: Option<PathBuf>,

    /// Destination directory
    #[arg(short = 'd', long)]
    pub dest: Option<PathBuf>,

    /// Username to embed in source URLs
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password to embed in source URLs
    #[arg(short, long, env = "HGMERGE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl CloneArgs {
    /// Build the source descriptor these arguments describe
    pub fn source(&self) -> anyhow::Result<SourceDescriptor> {
        if let Some(ref path) = self.sources_json {
            let text = std::fs::read_to_string(path)?;
            return Ok(SourceDescriptor::from_json(&text)?);
        }

        let single = |url: &str| match self.username {
            Some(ref username) => SourceDescriptor::Credentialed {
                url: url.to_string(),
                username: username.clone(),
                password: self.password.clone().unwrap_or_default(),
            },
            None => SourceDescriptor::Path(url.to_string()),
        };

        match self.sources.as_slice() {
            [] => anyhow::bail!("No sources given"),
            [source] => Ok(single(source)),
            sources => Ok(SourceDescriptor::List(
                sources.iter().map(|s| single(s)).collect(),
            )),
        }
    }

    /// Execute the clone command
    pub async fn execute(&self, hg: &Hg, verbose: bool) -> anyhow::Result<()> {
        let source = self.source()?;

        if verbose {
            tracing::info!(source = %source, dest = ?self.dest, "Starting clone");
        }

        let repo = hg.clone(&source, self.dest.as_deref()).await?;

        match source {
            SourceDescriptor::List(ref sources) => {
                println!(
                    "Merged {} repositories into {}",
                    sources.len(),
                    repo.path().display()
                );
                if verbose {
                    for changeset in repo.log().await? {
                        println!("  {:>4} {}", changeset.rev, changeset.desc);
                    }
                }
            }
            _ => println!("Cloned {} into {}", source, repo.path().display()),
        }

        Ok(())
    }
}
