use super::types::*;
use crate::config::{expand_env_vars, expand_tilde};
use crate::sequencer::window::TimeWindow;
use crate::source::timestamp::TimestampRule;
use regex::Regex;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    use std::io::Read;

    let mut file = File::open(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open config file '{}': {}", path.display(), e),
        ))
    })?;

    let mut yaml_string = String::new();
    file.read_to_string(&mut yaml_string).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string).map_err(|e| match e {
        ConfigError::YamlParse(e) => ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), e),
        )),
        other => other,
    })
}

/// Parse and validate config from a YAML string.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    // Expand environment variables in the YAML string before parsing
    let yaml = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml)?;

    // An empty document means all defaults
    let mut config: Config = if yaml.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(&yaml)?
    };

    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let Ok(re) = Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}") else {
        return Ok(());
    };
    let mut unexpanded_vars: Vec<String> = re
        .captures_iter(yaml_string)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    let error_msg = if unexpanded_vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=/path/to/directory\n\
             2. Replace $env{{{0}}} in the config file with an actual path",
            unexpanded_vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variables (e.g., export BUNDLE_DIR=/tmp/bundle)\n\
             2. Replace the variables in the config file with actual paths",
            unexpanded_vars.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}

/// Expands tilde (~) in all PathBuf fields in the config.
fn expand_paths(config: &mut Config) {
    config.output.directory = expand_tilde(&config.output.directory);
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    validate_output(&config.output, &mut errors);
    validate_selection(&config.selection, &mut errors);
    validate_normalize(&config.normalize, &mut errors);

    if let Err(e) = TimeWindow::parse(&config.window.start, &config.window.end) {
        errors.push(format!("window: {}", e));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

fn validate_output(output: &OutputConfig, errors: &mut Vec<String>) {
    let names = [
        ("work_dir", &output.work_dir),
        ("combined", &output.combined),
        ("sorted", &output.sorted),
        ("trimmed", &output.trimmed),
    ];

    for (field, value) in names {
        if value.trim().is_empty() {
            errors.push(format!("output.{}: name cannot be empty", field));
        } else if value.contains('/') || value.contains('\\') {
            errors.push(format!(
                "output.{}: '{}' must be a plain name, not a path",
                field, value
            ));
        }
    }

    let mut files = vec![&output.combined, &output.sorted, &output.trimmed];
    files.sort();
    files.dedup();
    if files.len() != 3 {
        errors.push("output: combined, sorted and trimmed names must differ".to_string());
    }
}

fn validate_selection(selection: &SelectionConfig, errors: &mut Vec<String>) {
    if selection.mode == SelectionMode::Minimal && selection.include.is_empty() {
        errors.push(
            "selection.include must list at least one path substring when mode is 'minimal'"
                .to_string(),
        );
    }

    for (i, pattern) in selection.exclude.iter().enumerate() {
        if pattern.is_empty() {
            errors.push(format!(
                "selection.exclude[{}]: empty substring would exclude every file",
                i
            ));
        }
    }

    if selection.recent_window == Some(std::time::Duration::ZERO) {
        errors.push(
            "selection.recent_window must be positive; use null to disable the filter".to_string(),
        );
    }
}

fn validate_normalize(normalize: &NormalizeConfig, errors: &mut Vec<String>) {
    if normalize.tag_width == 0 {
        errors.push("normalize.tag_width must be at least 1".to_string());
    }

    if !(1000..=9999).contains(&normalize.year_floor) {
        errors.push(format!(
            "normalize.year_floor: {} is not a four-digit year",
            normalize.year_floor
        ));
    }

    for (i, rule) in normalize.extra_rules.iter().enumerate() {
        if let Err(e) = TimestampRule::new(&rule.pattern, &rule.format) {
            errors.push(format!("normalize.extra_rules[{}]: {}", i, e));
        }
    }
}
