use crate::source::encoding;
use crate::source::timestamp::{CanonicalTimestamp, RuleSet, TimestampExtractor};
use crate::source::year::YearDisambiguator;
use chrono::{Datelike, NaiveDateTime};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, trace};

/// Width of the source tag column in normalized output.
pub const DEFAULT_TAG_WIDTH: usize = 12;

/// Years typical of a device whose real-time clock was never set.
pub const SUSPICIOUS_YEARS: [i32; 4] = [2000, 2001, 2135, 2136];

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A raw input line and the file it came from.
#[derive(Debug, Clone, Copy)]
pub struct LogLine<'a> {
    pub raw_text: &'a str,
    pub source: &'a str,
}

/// A line whose timestamp has been recognized and rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLine {
    pub timestamp: CanonicalTimestamp,
    pub source_tag: String,
    pub message: String,
}

impl NormalizedLine {
    pub fn instant(&self) -> NaiveDateTime {
        self.timestamp.instant()
    }
}

impl fmt::Display for NormalizedLine {
    /// `<timestamp>  <tag> <message>`, without a trailing newline.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {} {}", self.timestamp, self.source_tag, self.message)
    }
}

/// Counters for one processed file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    /// Non-blank lines seen.
    pub read: usize,
    pub normalized: usize,
    pub dropped: usize,
    pub corrected: usize,
}

/// Everything produced from one input file.
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub source: String,
    pub encoding: &'static str,
    pub lines: Vec<NormalizedLine>,
    pub stats: LineStats,
}

impl ProcessedFile {
    fn empty(source: &str) -> Self {
        Self {
            source: source.to_string(),
            encoding: "",
            lines: Vec::new(),
            stats: LineStats::default(),
        }
    }

    /// True when some line carries a year typical of an unset device clock.
    pub fn has_suspicious_clock(&self) -> bool {
        self.lines
            .iter()
            .any(|line| SUSPICIOUS_YEARS.contains(&line.instant().year()))
    }
}

/// Turns one file's bytes into normalized lines.
///
/// Holds no mutable state, so a single instance can be shared across worker
/// threads processing different files.
#[derive(Debug, Clone)]
pub struct LineProcessor {
    extractor: TimestampExtractor,
    years: YearDisambiguator,
    tag_width: usize,
}

impl LineProcessor {
    pub fn new(rules: Arc<RuleSet>, years: YearDisambiguator) -> Self {
        Self {
            extractor: TimestampExtractor::new(rules),
            years,
            tag_width: DEFAULT_TAG_WIDTH,
        }
    }

    pub fn with_tag_width(mut self, tag_width: usize) -> Self {
        self.tag_width = tag_width;
        self
    }

    pub fn tag_width(&self) -> usize {
        self.tag_width
    }

    /// Normalize a single line, or `None` if no rule recognizes it.
    pub fn normalize_line(&self, line: LogLine<'_>, source_tag: &str) -> Option<NormalizedLine> {
        let Some(extracted) = self.extractor.extract(line.raw_text.trim()) else {
            trace!(file = %line.source, line = line.raw_text, "No timestamp recognized");
            return None;
        };
        let Some(timestamp) = self.years.resolve(extracted.timestamp) else {
            trace!(file = %line.source, line = line.raw_text, "Date does not exist in the current year");
            return None;
        };

        Some(NormalizedLine {
            timestamp,
            source_tag: source_tag.to_string(),
            message: extracted.message.replace(';', ""),
        })
    }

    /// Process a file's raw bytes. Unrecognized lines are dropped.
    pub fn process(&self, file_id: &str, raw: &[u8]) -> ProcessedFile {
        let decoded = encoding::decode(raw);
        if decoded.had_errors {
            debug!(file = %file_id, encoding = decoded.encoding.name(), "Replaced undecodable bytes");
        }

        let tag = source_tag(file_id, self.tag_width);
        let mut lines = Vec::new();
        let mut stats = LineStats::default();

        for raw_text in decoded.text.split(['\n', '\r']) {
            if raw_text.trim().is_empty() {
                continue;
            }
            stats.read += 1;

            let line = LogLine {
                raw_text,
                source: file_id,
            };
            match self.normalize_line(line, &tag) {
                Some(normalized) => {
                    if normalized.timestamp.is_corrected() {
                        stats.corrected += 1;
                    }
                    lines.push(normalized);
                }
                None => stats.dropped += 1,
            }
        }
        stats.normalized = lines.len();

        debug!(
            file = %file_id,
            encoding = decoded.encoding.name(),
            read = stats.read,
            normalized = stats.normalized,
            dropped = stats.dropped,
            "Processed file"
        );

        ProcessedFile {
            source: file_id.to_string(),
            encoding: decoded.encoding.name(),
            lines,
            stats,
        }
    }

    /// Read and process a file. An unreadable file is logged and yields an
    /// empty result.
    pub fn process_file(&self, path: &Path) -> ProcessedFile {
        let file_id = path.display().to_string();
        match read_source(path) {
            Ok(raw) => self.process(&file_id, &raw),
            Err(e) => {
                error!(error = %e, "Skipping unreadable file");
                ProcessedFile::empty(&file_id)
            }
        }
    }
}

fn read_source(path: &Path) -> Result<Vec<u8>, ReaderError> {
    std::fs::read(path).map_err(|source| ReaderError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Base name of `file_id`, truncated or right-padded to `width` characters.
pub fn source_tag(file_id: &str, width: usize) -> String {
    let base = Path::new(file_id)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_id.to_string());

    let truncated: String = base.chars().take(width).collect();
    format!("{truncated:<width$}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn processor() -> LineProcessor {
        LineProcessor::new(RuleSet::builtin().unwrap(), YearDisambiguator::new(2024))
    }

    fn rendered(file: &ProcessedFile) -> Vec<String> {
        file.lines.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_source_tag_padding_and_truncation() {
        assert_eq!(source_tag("/var/log/messages", 12), "messages    ");
        assert_eq!(source_tag("/var/log/a_very_long_name.log", 12), "a_very_long_");
        assert_eq!(source_tag("exactly12chr", 12), "exactly12chr");
        assert_eq!(source_tag("/tmp/x", 3), "x  ");
    }

    #[test]
    fn test_process_mixed_file() {
        let raw = b"2024-05-05 13:00:01,000 userA login\n\
                    hello world\n\
                    \n\
                    Jan  2 03:04:05 kernel: up\n";
        let file = processor().process("/logs/auth.log", raw);

        assert_eq!(
            rendered(&file),
            vec![
                "2024-05-05 13:00:01.000000  auth.log     userA login",
                "2024-01-02 03:04:05.000000*  auth.log     kernel: up",
            ]
        );
        assert_eq!(
            file.stats,
            LineStats {
                read: 3,
                normalized: 2,
                dropped: 1,
                corrected: 1,
            }
        );
        assert_eq!(file.encoding, "UTF-8");
    }

    #[test]
    fn test_normalize_single_line() {
        let processor = processor();
        let line = LogLine {
            raw_text: "  2024-05-05 13:00:01,000 userA login",
            source: "/var/log/auth.log",
        };
        let normalized = processor.normalize_line(line, "auth").unwrap();
        assert_eq!(normalized.source_tag, "auth");
        assert_eq!(normalized.message, "userA login");

        let unmatched = LogLine {
            raw_text: "hello world",
            source: "/var/log/auth.log",
        };
        assert!(processor.normalize_line(unmatched, "auth").is_none());
    }

    #[test]
    fn test_unmatched_line_contributes_nothing() {
        let file = processor().process("a", b"hello world\n");
        assert!(file.lines.is_empty());
        assert_eq!(file.stats.dropped, 1);
    }

    #[test]
    fn test_semicolons_stripped_from_message() {
        let file = processor().process("a", b"2024-01-01 00:00:00 k1=v1; k2=v2;\n");
        assert_eq!(file.lines[0].message, "k1=v1 k2=v2");
    }

    #[test]
    fn test_leading_whitespace_and_crlf() {
        let file = processor().process("a", b"   2024/01/01 00:00:00 one\r\n2024/01/01 00:00:01 two\r\n");
        assert_eq!(file.lines.len(), 2);
        assert_eq!(file.lines[0].message, "one");
        assert_eq!(file.lines[1].message, "two");
    }

    #[test]
    fn test_latin1_file_decoded() {
        let file = processor().process("a", b"2024/01/01 00:00:00 caf\xE9\n");
        assert_eq!(file.encoding, "windows-1252");
        assert_eq!(file.lines[0].message, "café");
    }

    #[test]
    fn test_explicit_year_never_marked() {
        let file = processor().process("a", b"2001-01-01 00:00:00 rtc\n");
        assert!(!file.lines[0].timestamp.is_corrected());
        assert!(file.has_suspicious_clock());
    }

    #[test]
    fn test_process_file_reads_from_disk() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "|2024-03-03 10:11:12.013| fan speed").unwrap();
        temp_file.flush().unwrap();

        let file = processor().process_file(temp_file.path());
        assert_eq!(file.lines.len(), 1);
        assert_eq!(file.lines[0].message, "fan speed");
    }

    #[test]
    fn test_missing_file_yields_empty() {
        let file = processor().process_file(Path::new("/nonexistent/bundlelog/file.log"));
        assert!(file.lines.is_empty());
        assert_eq!(file.stats, LineStats::default());
    }
}
