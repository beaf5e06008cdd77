use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub selection: SelectionConfig,
    pub normalize: NormalizeConfig,
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where the archive is extracted and artifacts are written.
    pub directory: PathBuf,
    /// Subdirectory of `directory` holding per-file normalized output.
    pub work_dir: String,
    pub combined: String,
    pub sorted: String,
    pub trimmed: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("bundlelog-out"),
            work_dir: "WIP".to_string(),
            combined: "combined_log.txt".to_string(),
            sorted: "sorted_log.txt".to_string(),
            trimmed: "Trim_sorted_log.txt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Every file that survives the size and exclusion filters.
    #[default]
    All,
    /// Only files matching an inclusion substring.
    Minimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub mode: SelectionMode,
    pub min_size_bytes: u64,
    /// Keep only files modified within this span of the newest file.
    #[serde(with = "humantime_serde")]
    pub recent_window: Option<Duration>,
    pub exclude: Vec<String>,
    pub include: Vec<String>,
}

/// Core system logs kept by `minimal` mode.
fn default_include() -> Vec<String> {
    [
        "var/log/messages",
        "var/log/syslog",
        "var/log/kern",
        "var/log/daemon",
        "var/log/auth",
        "var/log/trace/",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_exclude() -> Vec<String> {
    ["lastlog", "wtmp", "btmp", "faillog"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            mode: SelectionMode::All,
            min_size_bytes: 200,
            recent_window: Some(Duration::from_secs(7 * 24 * 60 * 60)),
            exclude: default_exclude(),
            include: default_include(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub tag_width: usize,
    pub year_floor: i32,
    /// Accepted and reported, never applied to timestamps.
    pub hour_adjustment: i32,
    /// Appended after the built-in rules, lowest priority.
    pub extra_rules: Vec<RuleConfig>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            tag_width: crate::source::reader::DEFAULT_TAG_WIDTH,
            year_floor: crate::source::year::DEFAULT_YEAR_FLOOR,
            hour_adjustment: 0,
            extra_rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Regex with exactly one capture group around the timestamp.
    pub pattern: String,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub start: String,
    pub end: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            start: "2024-01-01 00:00:00".to_string(),
            end: "2024-12-31 23:59:59".to_string(),
        }
    }
}

impl NormalizeConfig {
    pub fn extra_rule_table(&self) -> Vec<(&str, &str)> {
        self.extra_rules
            .iter()
            .map(|rule| (rule.pattern.as_str(), rule.format.as_str()))
            .collect()
    }
}
