use crate::config::parse::{load_config, validate_config};
use crate::config::types::{Config, SelectionMode};
use crate::config::expand_tilde;
use crate::pipeline::{run_pipeline, trim_file, RunConfig, RunError};
use crate::sequencer::window::TimeWindow;
use std::path::PathBuf;
use tracing::info;

/// Flags for a full run. Each one overrides the matching config value.
#[derive(Debug, Default, Clone, clap::Args)]
pub struct RunArgs {
    /// Diagnostic bundle (.tar.gz) to extract into the output directory
    #[arg(long, short = 'a')]
    pub archive: Option<PathBuf>,

    /// Directory receiving the extracted bundle and all artifacts
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,

    /// Tree to read logs from (defaults to the output directory)
    #[arg(long, short = 's')]
    pub source_dir: Option<PathBuf>,

    /// Hour adjustment; recorded but never applied to timestamps
    #[arg(long, allow_hyphen_values = true)]
    pub change_hour: Option<i32>,

    /// Window start, 'YYYY-MM-DD HH:MM:SS'
    #[arg(long)]
    pub start: Option<String>,

    /// Window end, 'YYYY-MM-DD HH:MM:SS'
    #[arg(long)]
    pub end: Option<String>,

    /// File selection mode
    #[arg(long, value_enum)]
    pub mode: Option<SelectionMode>,
}

/// Flags for trimming an existing sorted log.
#[derive(Debug, Default, Clone, clap::Args)]
pub struct TrimArgs {
    /// Sorted log to read (defaults to the configured sorted artifact)
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,

    /// Where to write kept lines (defaults to the configured trimmed artifact)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Window start, 'YYYY-MM-DD HH:MM:SS'
    #[arg(long)]
    pub start: Option<String>,

    /// Window end, 'YYYY-MM-DD HH:MM:SS'
    #[arg(long)]
    pub end: Option<String>,
}

pub async fn run(
    config_path: Option<PathBuf>,
    args: RunArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_or_default(config_path.as_ref())?;
    let run_config = build_run_config(config, &args)?;

    let summary = run_pipeline(&run_config).await?;

    println!(
        "{} files, {} lines sorted, {} in window",
        summary.files_selected, summary.sorted, summary.trimmed
    );
    println!("Combined: {}", run_config.combined_path().display());
    println!("Sorted:   {}", run_config.sorted_path().display());
    println!("Trimmed:  {}", run_config.trimmed_path().display());
    if !summary.suspicious_files.is_empty() {
        eprintln!(
            "Warning: {} file(s) carry timestamps from an unset clock:",
            summary.suspicious_files.len()
        );
        for file in &summary.suspicious_files {
            eprintln!("  {}", file);
        }
    }

    Ok(())
}

pub fn trim(config_path: Option<PathBuf>, args: TrimArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_or_default(config_path.as_ref())?;
    if let Some(start) = args.start {
        config.window.start = start;
    }
    if let Some(end) = args.end {
        config.window.end = end;
    }
    let window = TimeWindow::parse(&config.window.start, &config.window.end)?;

    let input = args
        .input
        .unwrap_or_else(|| config.output.directory.join(&config.output.sorted));
    let output = args
        .output
        .unwrap_or_else(|| config.output.directory.join(&config.output.trimmed));

    let kept = trim_file(&input, &output, &window)?;
    println!("{} lines written to {}", kept, output.display());
    Ok(())
}

/// The config file is optional; without one every setting is a default.
fn load_or_default(config_path: Option<&PathBuf>) -> Result<Config, RunError> {
    match config_path {
        Some(path) => {
            info!(config_path = %path.display(), "Loading configuration");
            Ok(load_config(path)?)
        }
        None => {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

/// Apply command-line overrides and re-validate the result.
pub fn build_run_config(mut config: Config, args: &RunArgs) -> Result<RunConfig, RunError> {
    if let Some(dir) = &args.output_dir {
        config.output.directory = expand_tilde(dir);
    }
    if let Some(hours) = args.change_hour {
        config.normalize.hour_adjustment = hours;
    }
    if let Some(start) = &args.start {
        config.window.start = start.clone();
    }
    if let Some(end) = &args.end {
        config.window.end = end.clone();
    }
    if let Some(mode) = args.mode {
        config.selection.mode = mode;
    }
    validate_config(&config)?;

    let mut run_config = RunConfig::from_config(&config)?;
    run_config.archive = args.archive.as_deref().map(expand_tilde);
    run_config.source_dir = args.source_dir.as_deref().map(expand_tilde);
    Ok(run_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn test_flags_override_config() {
        let args = RunArgs {
            output_dir: Some(PathBuf::from("/tmp/bundle-out")),
            change_hour: Some(-3),
            start: Some("2024-05-05 13:00:00".to_string()),
            end: Some("2024-05-05 14:00:00".to_string()),
            ..RunArgs::default()
        };

        let run_config = build_run_config(Config::default(), &args).unwrap();
        assert_eq!(run_config.output_dir(), std::path::Path::new("/tmp/bundle-out"));
        assert_eq!(run_config.normalize.hour_adjustment, -3);
        assert_eq!(
            run_config.window,
            TimeWindow::parse("2024-05-05 13:00:00", "2024-05-05 14:00:00").unwrap()
        );
        assert!(run_config.archive.is_none());
    }

    #[test]
    fn test_minimal_mode_flag_with_default_config() {
        let args = RunArgs {
            mode: Some(SelectionMode::Minimal),
            ..RunArgs::default()
        };

        let run_config = build_run_config(Config::default(), &args).unwrap();
        assert_eq!(run_config.selection.mode, SelectionMode::Minimal);
        assert!(!run_config.selection.include.is_empty());
    }

    #[test]
    fn test_minimal_mode_flag_needs_includes() {
        let args = RunArgs {
            mode: Some(SelectionMode::Minimal),
            ..RunArgs::default()
        };
        let mut config = Config::default();
        config.selection.include.clear();

        let result = build_run_config(config, &args);
        assert!(matches!(
            result,
            Err(RunError::Config(ConfigError::ValidationList(_)))
        ));
    }

    #[test]
    fn test_inverted_window_accepted() {
        let args = RunArgs {
            start: Some("2024-05-05 14:00:00".to_string()),
            end: Some("2024-05-05 13:00:00".to_string()),
            ..RunArgs::default()
        };

        let run_config = build_run_config(Config::default(), &args).unwrap();
        assert!(run_config.window.is_empty());
    }

    #[test]
    fn test_malformed_window_rejected() {
        let args = RunArgs {
            start: Some("2024-05-05T14:00:00".to_string()),
            ..RunArgs::default()
        };

        assert!(build_run_config(Config::default(), &args).is_err());
    }
}
