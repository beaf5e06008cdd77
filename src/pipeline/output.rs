use std::collections::HashSet;
use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// UTF-8 byte order mark written at the start of per-file work output.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Write one line per item, each terminated by `\n`. Returns the line count.
pub fn write_lines<W, I>(writer: &mut W, lines: I) -> io::Result<usize>
where
    W: Write,
    I: IntoIterator,
    I::Item: Display,
{
    let mut count = 0;
    for line in lines {
        writeln!(writer, "{}", line)?;
        count += 1;
    }
    Ok(count)
}

/// Create (or truncate) `path` and write `lines` into it, optionally
/// preceded by a byte order mark.
pub fn write_artifact<I>(path: &Path, lines: I, bom: bool) -> Result<usize, OutputError>
where
    I: IntoIterator,
    I::Item: Display,
{
    let to_error = |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(to_error)?;
    let mut writer = BufWriter::new(file);
    if bom {
        writer.write_all(UTF8_BOM).map_err(to_error)?;
    }
    let count = write_lines(&mut writer, lines).map_err(to_error)?;
    writer.flush().map_err(to_error)?;

    debug!(path = %path.display(), lines = count, "Wrote artifact");
    Ok(count)
}

/// Subdirectory of the work directory holding inflated `.gz` members.
pub const INFLATED_DIR: &str = ".inflated";

/// Hands out per-file output paths inside the work directory.
///
/// Output is named after the source file's base name. Bundles often hold
/// several files with the same name in different directories, so a repeat
/// gets the first free `.1`, `.2`, ... suffix. Names already handed out are
/// never reused, including ones that came from a real rotated log.
#[derive(Debug)]
pub struct WorkDir {
    root: PathBuf,
    taken: HashSet<String>,
}

impl WorkDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            taken: HashSet::from([INFLATED_DIR.to_string()]),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&mut self, source: &Path) -> PathBuf {
        let base = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());

        let mut name = base.clone();
        let mut suffix = 0;
        while self.taken.contains(&name) {
            suffix += 1;
            name = format!("{}.{}", base, suffix);
        }
        self.taken.insert(name.clone());

        self.root.join(name)
    }
}
