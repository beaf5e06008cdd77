use crate::collect::{
    enumerate_files, extract_archive, inflate_member, reset_directory, retain_recent, CollectError,
    FileSelector,
};
use crate::config::types::{Config, NormalizeConfig, OutputConfig, SelectionConfig};
use crate::pipeline::output::{write_artifact, OutputError, WorkDir, INFLATED_DIR};
use crate::sequencer::merge::Corpus;
use crate::sequencer::window::{TimeWindow, WindowError};
use crate::source::encoding;
use crate::source::reader::{LineProcessor, ProcessedFile};
use crate::source::timestamp::{RuleSet, TimestampError};
use crate::source::year::YearDisambiguator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Errors that end a run
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("collect error: {0}")]
    Collect(#[from] CollectError),

    #[error("timestamp rule error: {0}")]
    Timestamp(#[from] TimestampError),

    #[error("window error: {0}")]
    Window(#[from] WindowError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),

    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Everything a single run needs, after config and command-line flags have
/// been merged.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Bundle to extract into `output.directory`. Without one the output
    /// directory is taken to hold an already-extracted bundle.
    pub archive: Option<PathBuf>,
    /// Tree to read logs from; defaults to `output.directory`.
    pub source_dir: Option<PathBuf>,
    pub output: OutputConfig,
    pub selection: SelectionConfig,
    pub normalize: NormalizeConfig,
    pub window: TimeWindow,
    pub years: YearDisambiguator,
}

impl RunConfig {
    pub fn from_config(config: &Config) -> Result<Self, RunError> {
        let window = TimeWindow::parse(&config.window.start, &config.window.end)?;
        let years =
            YearDisambiguator::for_today().with_floor(config.normalize.year_floor);

        Ok(Self {
            archive: None,
            source_dir: None,
            output: config.output.clone(),
            selection: config.selection.clone(),
            normalize: config.normalize.clone(),
            window,
            years,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output.directory
    }

    pub fn work_dir(&self) -> PathBuf {
        self.output.directory.join(&self.output.work_dir)
    }

    pub fn combined_path(&self) -> PathBuf {
        self.output.directory.join(&self.output.combined)
    }

    pub fn sorted_path(&self) -> PathBuf {
        self.output.directory.join(&self.output.sorted)
    }

    pub fn trimmed_path(&self) -> PathBuf {
        self.output.directory.join(&self.output.trimmed)
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files_selected: usize,
    pub lines_read: usize,
    pub lines_normalized: usize,
    pub lines_dropped: usize,
    pub lines_corrected: usize,
    /// Files holding at least one year typical of an unset clock.
    pub suspicious_files: Vec<String>,
    pub combined: usize,
    pub sorted: usize,
    pub trimmed: usize,
}

/// Extract, select, normalize, merge and trim.
///
/// Writes the per-file work output plus the combined, sorted and trimmed
/// artifacts into the output directory.
pub async fn run_pipeline(config: &RunConfig) -> Result<RunSummary, RunError> {
    if config.normalize.hour_adjustment != 0 {
        info!(
            hour_adjustment = config.normalize.hour_adjustment,
            "Hour adjustment recorded, timestamps are not shifted"
        );
    }

    if config.window.is_empty() {
        warn!(
            start = %config.window.start(),
            end = %config.window.end(),
            "Window start is after its end, the trimmed log will be empty"
        );
    }

    prepare_output(config)?;

    let files = collect_files(config)?;
    info!(files = files.len(), "Selected files");

    let rules = RuleSet::builtin_with(&config.normalize.extra_rule_table())?;
    debug!(rules = rules.len(), "Timestamp rules loaded");

    let processor = Arc::new(
        LineProcessor::new(rules, config.years).with_tag_width(config.normalize.tag_width),
    );
    let processed = process_files(processor, files).await?;

    let mut summary = RunSummary {
        files_selected: processed.len(),
        ..RunSummary::default()
    };

    let mut work_dir = WorkDir::new(config.work_dir());
    let mut corpus = Corpus::new();
    for file in processed {
        summary.lines_read += file.stats.read;
        summary.lines_normalized += file.stats.normalized;
        summary.lines_dropped += file.stats.dropped;
        summary.lines_corrected += file.stats.corrected;

        if file.has_suspicious_clock() {
            warn!(
                file = %file.source,
                "File has timestamps from an unset clock, its ordering may be wrong"
            );
            summary.suspicious_files.push(file.source.clone());
        }

        info!(
            file = %file.source,
            encoding = file.encoding,
            read = file.stats.read,
            normalized = file.stats.normalized,
            dropped = file.stats.dropped,
            "Normalized file"
        );

        let target = work_dir.path_for(Path::new(&file.source));
        write_artifact(&target, &file.lines, true)?;
        corpus.append(file.lines);
    }

    summary.combined = write_artifact(&config.combined_path(), corpus.iter(), false)?;

    let rendered: Vec<String> = corpus
        .into_sorted()
        .iter()
        .map(ToString::to_string)
        .collect();
    summary.sorted = write_artifact(&config.sorted_path(), &rendered, false)?;

    let trimmed = config
        .window
        .filter_lines(rendered.iter().map(String::as_str))?;
    summary.trimmed = write_artifact(&config.trimmed_path(), &trimmed, false)?;

    info!(
        combined = summary.combined,
        sorted = summary.sorted,
        trimmed = summary.trimmed,
        dropped = summary.lines_dropped,
        corrected = summary.lines_corrected,
        output = %config.output_dir().display(),
        "Run complete"
    );

    Ok(summary)
}

/// Trim an existing sorted log to `window`, writing the kept lines to
/// `output`. Returns the number of lines kept.
pub fn trim_file(input: &Path, output: &Path, window: &TimeWindow) -> Result<usize, RunError> {
    let raw = std::fs::read(input).map_err(|source| RunError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let decoded = encoding::decode(&raw);

    let lines = decoded
        .text
        .lines()
        .filter(|line| !line.trim().is_empty());
    let kept = window.filter_lines(lines)?;

    let count = write_artifact(output, &kept, false)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        kept = count,
        "Trimmed log"
    );
    Ok(count)
}

/// Reset the output tree for this run.
fn prepare_output(config: &RunConfig) -> Result<(), RunError> {
    match &config.archive {
        Some(archive) => {
            crate::collect::validate_archive(archive)?;
            reset_directory(config.output_dir())?;
            extract_archive(archive, config.output_dir())?;
        }
        None => {
            std::fs::create_dir_all(config.output_dir())
                .map_err(|e| CollectError::io(config.output_dir(), e))?;
        }
    }
    reset_directory(&config.work_dir())?;
    Ok(())
}

/// Enumerate, filter and inflate the files to process, in path order.
fn collect_files(config: &RunConfig) -> Result<Vec<PathBuf>, RunError> {
    let root = config
        .source_dir
        .as_deref()
        .unwrap_or_else(|| config.output_dir());
    let root = root.canonicalize().map_err(|e| CollectError::io(root, e))?;

    let output_dir = config
        .output_dir()
        .canonicalize()
        .map_err(|e| CollectError::io(config.output_dir(), e))?;
    let skip = [
        output_dir.join(&config.output.work_dir),
        output_dir.join(&config.output.combined),
        output_dir.join(&config.output.sorted),
        output_dir.join(&config.output.trimmed),
    ];

    let mut entries = enumerate_files(&root, &skip)?;
    debug!(root = %root.display(), files = entries.len(), "Enumerated source tree");

    if let Some(window) = config.selection.recent_window {
        entries = retain_recent(entries, window);
    }
    let entries = FileSelector::from_config(&config.selection).select(entries);

    // Inflated copies live under the work directory, which the walk skips
    let mut inflated = WorkDir::new(config.work_dir().join(INFLATED_DIR));
    let mut files = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.path.extension().is_some_and(|ext| ext == "gz") {
            let target = inflated.path_for(&entry.path.with_extension(""));
            match inflate_member(&entry.path, &target) {
                Ok(()) => files.push(target),
                Err(e) => error!(error = %e, "Skipping compressed member"),
            }
        } else {
            files.push(entry.path);
        }
    }

    Ok(files)
}

/// Normalize every file on the blocking pool. Results come back in the
/// order of `files` no matter which worker finishes first.
async fn process_files(
    processor: Arc<LineProcessor>,
    files: Vec<PathBuf>,
) -> Result<Vec<ProcessedFile>, RunError> {
    let mut tasks = JoinSet::new();
    for (index, path) in files.into_iter().enumerate() {
        let processor = processor.clone();
        tasks.spawn_blocking(move || (index, processor.process_file(&path)));
    }

    let mut slots: Vec<Option<ProcessedFile>> = Vec::new();
    slots.resize_with(tasks.len(), || None);
    while let Some(result) = tasks.join_next().await {
        let (index, file) = result?;
        slots[index] = Some(file);
    }

    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn test_config(output: &Path) -> RunConfig {
        let mut config = RunConfig::from_config(&Config::default()).unwrap();
        config.output.directory = output.to_path_buf();
        config.selection.min_size_bytes = 0;
        config.selection.recent_window = None;
        config.window = TimeWindow::parse("2024-05-05 13:00:00", "2024-05-05 13:00:02").unwrap();
        config.years = YearDisambiguator::new(2024);
        config
    }

    #[tokio::test]
    async fn test_process_files_keeps_input_order() {
        let temp_dir = TempDir::new().unwrap();
        let mut paths = Vec::new();
        for i in 0..8 {
            let path = temp_dir.path().join(format!("file{}.log", i));
            fs::write(&path, format!("2024-05-05 13:00:0{},000 line {}\n", i, i)).unwrap();
            paths.push(path);
        }

        let processor = Arc::new(LineProcessor::new(
            RuleSet::builtin().unwrap(),
            YearDisambiguator::new(2024),
        ));
        let processed = process_files(processor, paths).await.unwrap();

        let sources: Vec<_> = processed
            .iter()
            .map(|file| Path::new(&file.source).file_name().unwrap().to_owned())
            .collect();
        let expected: Vec<_> = (0..8)
            .map(|i| std::ffi::OsString::from(format!("file{}.log", i)))
            .collect();
        assert_eq!(sources, expected);
    }

    #[tokio::test]
    async fn test_inverted_window_trims_everything() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path();
        fs::write(out.join("a.log"), "2024-05-05 13:00:01,000 userA login\n").unwrap();

        let mut config = test_config(out);
        config.window = TimeWindow::parse("2024-05-05 13:00:02", "2024-05-05 13:00:00").unwrap();
        let summary = run_pipeline(&config).await.unwrap();

        assert_eq!(summary.sorted, 1);
        assert_eq!(summary.trimmed, 0);
        assert!(fs::read(config.trimmed_path()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_on_extracted_tree() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path();
        fs::create_dir_all(out.join("var/log")).unwrap();
        fs::write(
            out.join("var/log/a.log"),
            "2024-05-05 13:00:01,000 userA login\nnoise\n",
        )
        .unwrap();
        fs::write(
            out.join("var/log/b.log"),
            "<INFO> 05-May-2024::13:00:00.500 userB login\n",
        )
        .unwrap();

        let config = test_config(out);
        let summary = run_pipeline(&config).await.unwrap();

        assert_eq!(summary.files_selected, 2);
        assert_eq!(summary.lines_read, 3);
        assert_eq!(summary.lines_dropped, 1);
        assert_eq!(summary.trimmed, 2);

        let sorted = fs::read_to_string(config.sorted_path()).unwrap();
        let lines: Vec<_> = sorted.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("userB"));
        assert!(lines[1].contains("userA"));

        assert!(config.work_dir().join("a.log").exists());
    }

    #[tokio::test]
    async fn test_rerun_ignores_previous_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path();
        fs::write(out.join("a.log"), "2024-05-05 13:00:01,000 userA login\n").unwrap();

        let config = test_config(out);
        let first = run_pipeline(&config).await.unwrap();
        let second = run_pipeline(&config).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.files_selected, 1);
    }

    #[tokio::test]
    async fn test_rerun_reads_compressed_member_once() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path();
        fs::create_dir_all(out.join("var/log")).unwrap();
        let mut encoder = GzEncoder::new(
            fs::File::create(out.join("var/log/a.log.gz")).unwrap(),
            Compression::default(),
        );
        encoder
            .write_all(b"2024-05-05 13:00:01,000 userA login\n")
            .unwrap();
        encoder.finish().unwrap();

        let mut config = test_config(out);
        config.selection.recent_window = Some(std::time::Duration::from_secs(7 * 86400));
        let first = run_pipeline(&config).await.unwrap();
        let second = run_pipeline(&config).await.unwrap();

        assert_eq!(first.sorted, 1);
        assert_eq!(second.sorted, 1);
        assert_eq!(first, second);
        assert!(!out.join("var/log/a.log").exists());
        assert!(config.work_dir().join(INFLATED_DIR).join("a.log").exists());
        assert!(config.work_dir().join("a.log").exists());
    }

    #[tokio::test]
    async fn test_run_with_missing_archive() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir.path().join("out"));
        config.archive = Some(temp_dir.path().join("missing.tar.gz"));

        let result = run_pipeline(&config).await;
        assert!(matches!(
            result,
            Err(RunError::Collect(CollectError::InvalidArchive(_)))
        ));
    }

    #[test]
    fn test_trim_file_fails_on_malformed_line() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("sorted_log.txt");
        let output = temp_dir.path().join("trimmed.txt");
        fs::write(
            &input,
            "2024-05-05 13:00:01.000000  a.log        ok\ngarbage line\n",
        )
        .unwrap();

        let window = TimeWindow::parse("2024-05-05 13:00:00", "2024-05-05 13:00:02").unwrap();
        let result = trim_file(&input, &output, &window);
        assert!(matches!(
            result,
            Err(RunError::Window(WindowError::MalformedLine { line_number: 2, .. }))
        ));
    }

    #[test]
    fn test_trim_file_keeps_window() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("sorted_log.txt");
        let output = temp_dir.path().join("trimmed.txt");
        fs::write(
            &input,
            "2024-05-05 12:59:59.999999  a.log        early\n\
             2024-05-05 13:00:00.000000  a.log        start\n\
             2024-05-05 13:00:02.900000* b.log        end\n\
             2024-05-05 13:00:03.000000  b.log        late\n",
        )
        .unwrap();

        let window = TimeWindow::parse("2024-05-05 13:00:00", "2024-05-05 13:00:02").unwrap();
        assert_eq!(trim_file(&input, &output, &window).unwrap(), 2);

        let kept = fs::read_to_string(&output).unwrap();
        assert!(kept.contains("start"));
        assert!(kept.contains("end"));
        assert!(!kept.contains("early"));
    }
}
