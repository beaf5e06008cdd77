use crate::source::reader::NormalizedLine;
use chrono::{NaiveDateTime, Timelike};
use thiserror::Error;

/// Format of window bounds and of the prefix read from each line.
pub const BOUND_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Characters of a rendered line holding its second-precision timestamp.
pub const PREFIX_LEN: usize = 19;

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("invalid time bound '{value}', expected YYYY-MM-DD HH:MM:SS: {source}")]
    InvalidBound {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("line {line_number} has no timestamp prefix: '{line}'")]
    MalformedLine { line_number: usize, line: String },
}

/// Parse a `YYYY-MM-DD HH:MM:SS` bound.
pub fn parse_bound(value: &str) -> Result<NaiveDateTime, WindowError> {
    NaiveDateTime::parse_from_str(value.trim(), BOUND_FORMAT).map_err(|source| {
        WindowError::InvalidBound {
            value: value.to_string(),
            source,
        }
    })
}

/// Inclusive `[start, end]` range at one-second precision.
///
/// A start after the end is allowed and contains nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, WindowError> {
        Ok(Self::new(parse_bound(start)?, parse_bound(end)?))
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Sub-second digits are ignored, matching the prefix comparison.
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        let truncated = instant.with_nanosecond(0).unwrap_or(instant);
        self.start <= truncated && truncated <= self.end
    }

    /// Keep rendered lines whose first 19 characters fall inside the window.
    ///
    /// Fails on the first line whose prefix is not a timestamp; nothing is
    /// returned in that case.
    pub fn filter_lines<'a, I>(&self, lines: I) -> Result<Vec<&'a str>, WindowError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut kept = Vec::new();
        for (index, line) in lines.into_iter().enumerate() {
            let prefix = match line.char_indices().nth(PREFIX_LEN) {
                Some((end, _)) => &line[..end],
                None => line,
            };
            let instant = NaiveDateTime::parse_from_str(prefix, BOUND_FORMAT).map_err(|_| {
                WindowError::MalformedLine {
                    line_number: index + 1,
                    line: line.to_string(),
                }
            })?;
            if self.contains(instant) {
                kept.push(line);
            }
        }
        Ok(kept)
    }

    /// Keep normalized lines inside the window.
    pub fn filter_corpus(&self, lines: Vec<NormalizedLine>) -> Vec<NormalizedLine> {
        lines
            .into_iter()
            .filter(|line| self.contains(line.instant()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::timestamp::CanonicalTimestamp;

    fn window() -> TimeWindow {
        TimeWindow::parse("2024-05-05 13:00:00", "2024-05-05 13:00:02").unwrap()
    }

    #[test]
    fn test_bounds_inclusive() {
        let lines = [
            "2024-05-05 12:59:59.999999  a            just before",
            "2024-05-05 13:00:00.000000  a            at start",
            "2024-05-05 13:00:01.000000  a            inside",
            "2024-05-05 13:00:02.999999  a            at end",
            "2024-05-05 13:00:03.000000  a            after",
        ];

        let kept = window().filter_lines(lines).unwrap();
        assert_eq!(kept, &lines[1..4]);
    }

    #[test]
    fn test_marker_does_not_affect_prefix() {
        let kept = window()
            .filter_lines(["2024-05-05 13:00:01.000000*  a            inferred"])
            .unwrap();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_malformed_line_fails_whole_filter() {
        let lines = [
            "2024-05-05 13:00:00.000000  a            fine",
            "garbage without timestamp",
        ];

        let result = window().filter_lines(lines);
        assert!(matches!(
            result,
            Err(WindowError::MalformedLine { line_number: 2, .. })
        ));
    }

    #[test]
    fn test_short_line_fails() {
        let result = window().filter_lines(["2024-05-05"]);
        assert!(matches!(result, Err(WindowError::MalformedLine { .. })));
    }

    #[test]
    fn test_inverted_window_keeps_nothing() {
        let window = TimeWindow::parse("2024-05-05 13:00:02", "2024-05-05 13:00:00").unwrap();
        assert!(window.is_empty());
        assert!(!self::window().is_empty());

        let kept = window
            .filter_lines([
                "2024-05-05 13:00:00.000000  a            at end",
                "2024-05-05 13:00:01.000000  a            between",
                "2024-05-05 13:00:02.000000  a            at start",
            ])
            .unwrap();
        assert!(kept.is_empty());
    }

    #[test]
    fn test_invalid_bound_rejected() {
        let result = TimeWindow::parse("2024-05-05T13:00:00", "2024-05-05 13:00:02");
        assert!(matches!(result, Err(WindowError::InvalidBound { .. })));
    }

    #[test]
    fn test_filter_corpus() {
        let line = |ts: &str| NormalizedLine {
            timestamp: CanonicalTimestamp::parse(ts).unwrap(),
            source_tag: "a".to_string(),
            message: ts.to_string(),
        };
        let lines = vec![
            line("2024-05-05 12:59:59.000000"),
            line("2024-05-05 13:00:00.000000"),
            line("2024-05-05 13:00:02.500000"),
        ];

        let kept = window().filter_corpus(lines);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].message, "2024-05-05 13:00:00.000000");
    }
}
