use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Output format of every normalized timestamp.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Appended to the canonical text when the year was inferred.
pub const CORRECTION_MARKER: char = '*';

/// Year assigned by formats that carry no `%Y`.
pub const SENTINEL_YEAR: i32 = 1900;

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const WEEKDAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

/// Built-in rule table, highest priority first.
///
/// The order resolves ambiguous lines: qualified forms (year, fraction, tag or
/// bracket delimiters) come before the bare syslog `Mon DD HH:MM:SS`.
const BUILTIN_RULES: &[(&str, &str)] = &[
    (
        r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2},\d+)",
        "%Y-%m-%d %H:%M:%S,%f",
    ),
    (
        r"^<DEBUG> (\d{1,2}-\w{3}-\d{4}::\d{2}:\d{2}:\d{2}\.\d+)",
        "%d-%b-%Y::%H:%M:%S.%f",
    ),
    (
        r"^<ERROR> (\d{1,2}-\w{3}-\d{4}::\d{2}:\d{2}:\d{2}\.\d+)",
        "%d-%b-%Y::%H:%M:%S.%f",
    ),
    (
        r"^<INFO> (\d{1,2}-\w{3}-\d{4}::\d{2}:\d{2}:\d{2}\.\d+)",
        "%d-%b-%Y::%H:%M:%S.%f",
    ),
    (
        r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d+)",
        "%Y-%m-%dT%H:%M:%S.%f",
    ),
    (r"^(\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2})", "%Y/%m/%d %H:%M:%S"),
    (
        r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d+);",
        "%Y-%m-%d %H:%M:%S.%f",
    ),
    (
        r"^\|(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3})\|",
        "%Y-%m-%d %H:%M:%S.%f",
    ),
    (
        r"^(\w{3} \w{3}  ?\d{1,2} \d{2}:\d{2}:\d{2} \d{4}):",
        "%a %b %d %H:%M:%S %Y",
    ),
    (r"^(\w{3}  ?\d{1,2} \d{2}:\d{2}:\d{2})", "%b %d %H:%M:%S"),
    (
        r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2},\d{3}\.\d{3})",
        "%Y-%m-%d %H:%M:%S,%f.%f",
    ),
    (r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})", "%Y-%m-%d %H:%M:%S"),
];

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("regex compilation failed: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("pattern '{pattern}' must have exactly one capture group, found {found}")]
    CaptureGroups { pattern: String, found: usize },

    #[error("invalid input format '{format}': {reason}")]
    InvalidFormat { format: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormatItem {
    Year,
    Month,
    Day,
    MonthName,
    WeekdayName,
    Hour,
    Minute,
    Second,
    Fraction,
    Whitespace,
    Literal(char),
}

/// A compiled strptime-style parse format.
///
/// Supported directives: `%Y %m %d %b %a %H %M %S %f %%`. `%f` reads one to
/// six digits as a fraction of a second; consecutive `%f` directives
/// concatenate their digits (`,%f.%f` reads `,123.456` as 123456 µs). A run
/// of whitespace matches one or more whitespace characters and literals
/// compare ASCII case-insensitively. The whole input must be consumed.
#[derive(Debug, Clone)]
pub struct InputFormat {
    text: String,
    items: Vec<FormatItem>,
}

#[derive(Debug, Default)]
struct Fields {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: u32,
    minute: u32,
    second: u32,
    fraction: String,
}

impl InputFormat {
    pub fn new(text: &str) -> Result<Self, TimestampError> {
        let invalid = |reason: String| TimestampError::InvalidFormat {
            format: text.to_string(),
            reason,
        };

        let mut items = Vec::new();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            let item = if c == '%' {
                match chars.next() {
                    Some('Y') => FormatItem::Year,
                    Some('m') => FormatItem::Month,
                    Some('d') => FormatItem::Day,
                    Some('b') => FormatItem::MonthName,
                    Some('a') => FormatItem::WeekdayName,
                    Some('H') => FormatItem::Hour,
                    Some('M') => FormatItem::Minute,
                    Some('S') => FormatItem::Second,
                    Some('f') => FormatItem::Fraction,
                    Some('%') => FormatItem::Literal('%'),
                    Some(other) => return Err(invalid(format!("unsupported directive %{other}"))),
                    None => return Err(invalid("dangling '%' at end of format".to_string())),
                }
            } else if c.is_whitespace() {
                while chars.peek().is_some_and(|next| next.is_whitespace()) {
                    chars.next();
                }
                FormatItem::Whitespace
            } else {
                FormatItem::Literal(c)
            };
            items.push(item);
        }

        if items.is_empty() {
            return Err(invalid("format is empty".to_string()));
        }

        Ok(Self {
            text: text.to_string(),
            items,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Parse `text`, returning `None` unless it fully matches and forms a
    /// real calendar instant.
    pub fn parse(&self, text: &str) -> Option<ParsedTimestamp> {
        let mut rest = text;
        let mut fields = Fields::default();

        for item in &self.items {
            rest = match *item {
                FormatItem::Year => {
                    let (value, rest) = take_number(rest, 4, 4)?;
                    fields.year = Some(value as i32);
                    rest
                }
                FormatItem::Month => {
                    let (value, rest) = take_number(rest, 1, 2)?;
                    fields.month = Some(value);
                    rest
                }
                FormatItem::Day => {
                    let (value, rest) = take_number(rest, 1, 2)?;
                    fields.day = Some(value);
                    rest
                }
                FormatItem::Hour => {
                    let (value, rest) = take_number(rest, 1, 2)?;
                    fields.hour = value;
                    rest
                }
                FormatItem::Minute => {
                    let (value, rest) = take_number(rest, 1, 2)?;
                    fields.minute = value;
                    rest
                }
                FormatItem::Second => {
                    let (value, rest) = take_number(rest, 1, 2)?;
                    fields.second = value;
                    rest
                }
                FormatItem::MonthName => {
                    let (index, rest) = take_name(rest, &MONTHS)?;
                    fields.month = Some(index as u32 + 1);
                    rest
                }
                FormatItem::WeekdayName => take_name(rest, &WEEKDAYS)?.1,
                FormatItem::Fraction => {
                    let end = rest
                        .find(|c: char| !c.is_ascii_digit())
                        .unwrap_or(rest.len())
                        .min(6);
                    if end == 0 {
                        return None;
                    }
                    fields.fraction.push_str(&rest[..end]);
                    &rest[end..]
                }
                FormatItem::Whitespace => {
                    let trimmed = rest.trim_start();
                    if trimmed.len() == rest.len() {
                        return None;
                    }
                    trimmed
                }
                FormatItem::Literal(expected) => {
                    let mut chars = rest.chars();
                    let found = chars.next()?;
                    if found != expected && !found.eq_ignore_ascii_case(&expected) {
                        return None;
                    }
                    chars.as_str()
                }
            };
        }

        if !rest.is_empty() {
            return None;
        }

        fields.into_timestamp()
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Fields {
    fn into_timestamp(self) -> Option<ParsedTimestamp> {
        if self.fraction.len() > 6 {
            return None;
        }
        let micros = if self.fraction.is_empty() {
            0
        } else {
            // right-pad: ".5" is half a second
            format!("{:0<6}", self.fraction).parse().ok()?
        };

        let date = NaiveDate::from_ymd_opt(
            self.year.unwrap_or(SENTINEL_YEAR),
            self.month.unwrap_or(1),
            self.day.unwrap_or(1),
        )?;
        let time = NaiveTime::from_hms_micro_opt(self.hour, self.minute, self.second, micros)?;

        Some(ParsedTimestamp(date.and_time(time)))
    }
}

/// Read between `min` and `max` ASCII digits from the front of `text`.
fn take_number(text: &str, min: usize, max: usize) -> Option<(u32, &str)> {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len())
        .min(max);
    if end < min {
        return None;
    }
    let value = text[..end].parse().ok()?;
    Some((value, &text[end..]))
}

/// Match a three-letter English abbreviation case-insensitively.
fn take_name<'a>(text: &'a str, names: &[&str]) -> Option<(usize, &'a str)> {
    let head = text.get(..3)?;
    let index = names
        .iter()
        .position(|name| name.eq_ignore_ascii_case(head))?;
    Some((index, &text[3..]))
}

/// A timestamp produced by an [`InputFormat`], always a valid instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParsedTimestamp(NaiveDateTime);

impl ParsedTimestamp {
    pub fn instant(&self) -> NaiveDateTime {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Same instant in another year, `None` when the date does not exist
    /// there (29 February).
    pub fn with_year(&self, year: i32) -> Option<Self> {
        self.0.with_year(year).map(Self)
    }
}

impl From<NaiveDateTime> for ParsedTimestamp {
    fn from(value: NaiveDateTime) -> Self {
        Self(value)
    }
}

/// A normalized timestamp: the instant plus whether its year was inferred.
///
/// Renders as `YYYY-MM-DD HH:MM:SS.ffffff`, followed by `*` when corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanonicalTimestamp {
    instant: NaiveDateTime,
    corrected: bool,
}

impl CanonicalTimestamp {
    pub fn literal(parsed: ParsedTimestamp) -> Self {
        Self {
            instant: parsed.instant(),
            corrected: false,
        }
    }

    pub fn corrected(parsed: ParsedTimestamp) -> Self {
        Self {
            instant: parsed.instant(),
            corrected: true,
        }
    }

    pub fn instant(&self) -> NaiveDateTime {
        self.instant
    }

    pub fn is_corrected(&self) -> bool {
        self.corrected
    }

    /// Parse canonical text, with or without the correction marker.
    pub fn parse(text: &str) -> Option<Self> {
        let (body, corrected) = match text.strip_suffix(CORRECTION_MARKER) {
            Some(body) => (body, true),
            None => (text, false),
        };
        let instant = NaiveDateTime::parse_from_str(body, CANONICAL_FORMAT).ok()?;
        Some(Self { instant, corrected })
    }
}

impl fmt::Display for CanonicalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.instant.format(CANONICAL_FORMAT))?;
        if self.corrected {
            write!(f, "{CORRECTION_MARKER}")?;
        }
        Ok(())
    }
}

/// One recognized timestamp encoding: a regex with exactly one capture group
/// around the timestamp, and the format used to parse that group.
#[derive(Debug)]
pub struct TimestampRule {
    pattern: Regex,
    format: InputFormat,
}

impl TimestampRule {
    pub fn new(pattern: &str, format: &str) -> Result<Self, TimestampError> {
        let regex = Regex::new(pattern)?;

        // captures_len counts the implicit whole-match group
        let groups = regex.captures_len() - 1;
        if groups != 1 {
            return Err(TimestampError::CaptureGroups {
                pattern: pattern.to_string(),
                found: groups,
            });
        }

        Ok(Self {
            pattern: regex,
            format: InputFormat::new(format)?,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn format(&self) -> &InputFormat {
        &self.format
    }

    /// Apply the rule to a line.
    ///
    /// Returns `None` when the pattern does not match or the captured text
    /// does not parse. The message is whatever follows the whole match.
    pub fn apply<'a>(&self, line: &'a str) -> Option<(ParsedTimestamp, &'a str)> {
        let captures = self.pattern.captures(line)?;
        let whole = captures.get(0)?;
        let timestamp = self.format.parse(captures.get(1)?.as_str())?;
        Some((timestamp, line[whole.end()..].trim()))
    }
}

/// Ordered, immutable rule table shared by every extractor.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<TimestampRule>,
}

static BUILTIN: OnceLock<Arc<RuleSet>> = OnceLock::new();

impl RuleSet {
    /// Compile a table of `(pattern, format)` pairs, preserving order.
    pub fn from_table<P, F>(table: &[(P, F)]) -> Result<Self, TimestampError>
    where
        P: AsRef<str>,
        F: AsRef<str>,
    {
        let rules = table
            .iter()
            .map(|(pattern, format)| TimestampRule::new(pattern.as_ref(), format.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// The built-in table, compiled once per process.
    pub fn builtin() -> Result<Arc<Self>, TimestampError> {
        if let Some(rules) = BUILTIN.get() {
            return Ok(Arc::clone(rules));
        }
        let rules = Arc::new(Self::from_table(BUILTIN_RULES)?);
        Ok(Arc::clone(BUILTIN.get_or_init(|| rules)))
    }

    /// The built-in table followed by `extra` rules at lowest priority.
    pub fn builtin_with<P, F>(extra: &[(P, F)]) -> Result<Arc<Self>, TimestampError>
    where
        P: AsRef<str>,
        F: AsRef<str>,
    {
        if extra.is_empty() {
            return Self::builtin();
        }
        let mut rules = Self::from_table(BUILTIN_RULES)?.rules;
        rules.extend(Self::from_table(extra)?.rules);
        Ok(Arc::new(Self { rules }))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimestampRule> {
        self.rules.iter()
    }
}

/// A successful extraction from one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted<'a> {
    /// Position of the winning rule in the rule set.
    pub rule: usize,
    pub timestamp: ParsedTimestamp,
    pub message: &'a str,
}

/// Finds the first rule that both matches and parses a line.
#[derive(Debug, Clone)]
pub struct TimestampExtractor {
    rules: Arc<RuleSet>,
}

impl TimestampExtractor {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Extract the timestamp and message from a log line.
    ///
    /// A rule whose pattern matches but whose format rejects the text does
    /// not stop the search; the next rule is tried.
    pub fn extract<'a>(&self, line: &'a str) -> Option<Extracted<'a>> {
        self.rules
            .iter()
            .enumerate()
            .find_map(|(rule, candidate)| {
                candidate.apply(line).map(|(timestamp, message)| Extracted {
                    rule,
                    timestamp,
                    message,
                })
            })
    }
}
