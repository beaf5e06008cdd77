use crate::collect::CollectError;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::warn;
use walkdir::WalkDir;

/// A regular file found under the source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub size: u64,
}

/// Recursively list regular files under `root`, sorted by path.
///
/// Anything under one of the `skip` paths is left out, which keeps the run's
/// own output from being read back as input. Symlinks are followed within
/// the root's file system. Entries that cannot be read (unreadable
/// directories, dangling links, files removed mid-walk) are logged and
/// skipped.
pub fn enumerate_files(root: &Path, skip: &[PathBuf]) -> Result<Vec<FileEntry>, CollectError> {
    if !root.is_dir() {
        return Err(CollectError::NotADirectory(root.to_path_buf()));
    }

    let mut entries = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .same_file_system(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !skip.iter().any(|dir| entry.path() == dir.as_path()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %CollectError::from(e), "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        entries.push(FileEntry {
            path: entry.into_path(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: metadata.len(),
        });
    }

    Ok(entries)
}

/// Keep files modified within `window` of the newest file in the list.
pub fn retain_recent(entries: Vec<FileEntry>, window: Duration) -> Vec<FileEntry> {
    let Some(newest) = entries.iter().map(|entry| entry.modified).max() else {
        return entries;
    };
    let threshold = newest.checked_sub(window).unwrap_or(SystemTime::UNIX_EPOCH);

    entries
        .into_iter()
        .filter(|entry| entry.modified >= threshold)
        .collect()
}
