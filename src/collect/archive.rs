use crate::collect::CollectError;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Check that `path` is an existing `.tar.gz` file.
pub fn validate_archive(path: &Path) -> Result<(), CollectError> {
    let is_tar_gz = path
        .file_name()
        .map(|name| name.to_string_lossy().ends_with(".tar.gz"))
        .unwrap_or(false);

    if path.is_file() && is_tar_gz {
        Ok(())
    } else {
        Err(CollectError::InvalidArchive(path.to_path_buf()))
    }
}

/// Remove `dir` with everything under it, then recreate it empty.
pub fn reset_directory(dir: &Path) -> Result<(), CollectError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => debug!(path = %dir.display(), "Removed previous directory"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(CollectError::io(dir, e)),
    }
    fs::create_dir_all(dir).map_err(|e| CollectError::io(dir, e))
}

/// Unpack a gzip-compressed tarball into `dest`.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<(), CollectError> {
    validate_archive(archive)?;
    fs::create_dir_all(dest).map_err(|e| CollectError::io(dest, e))?;

    let file = File::open(archive).map_err(|e| CollectError::io(archive, e))?;
    let mut tarball = tar::Archive::new(GzDecoder::new(file));
    tarball
        .unpack(dest)
        .map_err(|e| CollectError::io(archive, e))?;

    info!(archive = %archive.display(), dest = %dest.display(), "Extracted archive");
    Ok(())
}

/// Inflate a `.gz` member into `target`, creating its parent directory.
///
/// The compressed file is left untouched.
pub fn inflate_member(path: &Path, target: &Path) -> Result<(), CollectError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| CollectError::io(parent, e))?;
    }
    let input = File::open(path).map_err(|e| CollectError::io(path, e))?;
    let mut output = File::create(target).map_err(|e| CollectError::io(target, e))?;

    io::copy(&mut GzDecoder::new(input), &mut output).map_err(|e| CollectError::io(path, e))?;

    debug!(source = %path.display(), target = %target.display(), "Inflated member");
    Ok(())
}
