use crate::collect::FileEntry;
use crate::config::types::{SelectionConfig, SelectionMode};
use tracing::trace;

/// Decides which enumerated files are worth processing.
///
/// Small files are skipped outright, then a path is rejected if it contains
/// any exclusion substring. In minimal mode a path must also contain one of
/// the inclusion substrings.
#[derive(Debug, Clone)]
pub struct FileSelector {
    mode: SelectionMode,
    min_size: u64,
    exclude: Vec<String>,
    include: Vec<String>,
}

impl FileSelector {
    pub fn new(mode: SelectionMode, min_size: u64) -> Self {
        Self {
            mode,
            min_size,
            exclude: Vec::new(),
            include: Vec::new(),
        }
    }

    pub fn from_config(config: &SelectionConfig) -> Self {
        Self {
            mode: config.mode,
            min_size: config.min_size_bytes,
            exclude: config.exclude.clone(),
            include: config.include.clone(),
        }
    }

    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    pub fn with_include(mut self, patterns: Vec<String>) -> Self {
        self.include = patterns;
        self
    }

    pub fn accepts(&self, entry: &FileEntry) -> bool {
        if entry.size < self.min_size {
            trace!(path = %entry.path.display(), size = entry.size, "Skipping small file");
            return false;
        }

        let path = entry.path.to_string_lossy();
        if self.exclude.iter().any(|part| path.contains(part.as_str())) {
            trace!(path = %path, "Skipping excluded file");
            return false;
        }

        match self.mode {
            SelectionMode::All => true,
            SelectionMode::Minimal => self.include.iter().any(|part| path.contains(part.as_str())),
        }
    }

    pub fn select(&self, entries: Vec<FileEntry>) -> Vec<FileEntry> {
        entries
            .into_iter()
            .filter(|entry| self.accepts(entry))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn entry(path: &str, size: u64) -> FileEntry {
        FileEntry {
            path: PathBuf::from(path),
            modified: SystemTime::UNIX_EPOCH,
            size,
        }
    }

    #[test]
    fn test_small_files_skipped() {
        let selector = FileSelector::new(SelectionMode::All, 200);
        assert!(!selector.accepts(&entry("/x/tiny.log", 199)));
        assert!(selector.accepts(&entry("/x/big.log", 200)));
    }

    #[test]
    fn test_exclusion_substrings() {
        let selector = FileSelector::new(SelectionMode::All, 0)
            .with_exclude(vec!["lastlog".to_string(), "var/log/sysstat/".to_string()]);

        let kept = selector.select(vec![
            entry("/b/var/log/lastlog", 500),
            entry("/b/var/log/sysstat/sa01", 500),
            entry("/b/var/log/messages", 500),
        ]);
        assert_eq!(kept, vec![entry("/b/var/log/messages", 500)]);
    }

    #[test]
    fn test_minimal_mode_requires_inclusion() {
        let selector = FileSelector::new(SelectionMode::Minimal, 0)
            .with_include(vec!["trace/".to_string()])
            .with_exclude(vec!["stats_file.csv".to_string()]);

        assert!(selector.accepts(&entry("/b/var/log/trace/aaad.trace", 500)));
        assert!(!selector.accepts(&entry("/b/var/log/trace/stats_file.csv", 500)));
        assert!(!selector.accepts(&entry("/b/var/log/messages", 500)));
    }

    #[test]
    fn test_from_config_defaults() {
        let selector = FileSelector::from_config(&SelectionConfig::default());
        assert!(!selector.accepts(&entry("/b/small", 10)));
        assert!(selector.accepts(&entry("/b/var/log/messages", 4096)));
    }
}
