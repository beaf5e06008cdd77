pub mod archive;
pub mod select;
pub mod walk;

use std::path::PathBuf;
use thiserror::Error;

pub use archive::{extract_archive, inflate_member, reset_directory, validate_archive};
pub use select::FileSelector;
pub use walk::{enumerate_files, retain_recent, FileEntry};

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("io error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a valid .tar.gz file: '{0}'")]
    InvalidArchive(PathBuf),

    #[error("not a valid directory: '{0}'")]
    NotADirectory(PathBuf),

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

impl CollectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
