//! Moving a working directory's files into a subfolder

use std::path::Path;

use tracing::debug;

use crate::hg::url::short_id;
use crate::{Error, Result};

/// Name of Mercurial's metadata directory
pub const METADATA_DIR: &str = ".hg";

/// List the top-level entries of `dir`, hidden ones included
///
/// `exclude` is left out. Entries are sorted by name.
pub async fn list_entries(dir: &Path, exclude: &str) -> Result<Vec<String>> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name != exclude {
            entries.push(name);
        }
    }

    entries.sort();
    Ok(entries)
}

/// Move each of `entries` from `source_dir` into `dest_dir`
///
/// `dest_dir` is created if needed. Stops at the first failed move; entries
/// moved before it stay moved.
pub async fn move_entries(source_dir: &Path, dest_dir: &Path, entries: &[String]) -> Result<()> {
    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| Error::Relocation {
            from: source_dir.to_path_buf(),
            to: dest_dir.to_path_buf(),
            message: e.to_string(),
        })?;

    for entry in entries {
        let from = source_dir.join(entry);
        let to = dest_dir.join(entry);
        debug!(from = %from.display(), to = %to.display(), "Moving entry");
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| Error::Relocation {
                from,
                to,
                message: e.to_string(),
            })?;
    }

    Ok(())
}

/// Move `entries` of `root` into the subfolder `root/name`
///
/// Entries go through a staging directory first, so an entry that is itself
/// called `name` ends up at `root/name/name`.
pub async fn relocate_into(root: &Path, name: &str, entries: &[String]) -> Result<()> {
    let target = root.join(name);
    let staging = root.join(format!(".hgmerge-{}-{}", name, short_id()));

    move_entries(root, &staging, entries).await?;

    tokio::fs::rename(&staging, &target)
        .await
        .map_err(|e| Error::Relocation {
            from: staging,
            to: target,
            message: e.to_string(),
        })
}
