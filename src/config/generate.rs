pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# BUNDLELOG CONFIGURATION
# =============================================================================
# Bundlelog unpacks a diagnostic bundle (.tar.gz), normalizes every log line to
# a sortable timestamp, and writes three artifacts into the output directory:
#
#   combined:  every normalized line, in file order
#   sorted:    the same lines ordered by timestamp
#   trimmed:   sorted lines inside the [window.start, window.end] range
#
# Every section is optional; missing keys fall back to the defaults shown here.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/bundlelog/config.yml
#   3. /etc/bundlelog/config.yml

# =============================================================================
# OUTPUT
# =============================================================================
# With an archive, this directory is wiped and the archive is extracted into it.
# Without one, it is treated as an already-extracted bundle and only work_dir
# is reset.

output:
  directory: ~/bundlelog-out
  # Per-file normalized output, written with a UTF-8 byte order mark
  work_dir: WIP
  combined: combined_log.txt
  sorted: sorted_log.txt
  trimmed: Trim_sorted_log.txt

# =============================================================================
# SELECTION
# =============================================================================
# Which extracted files are read.

selection:
  # 'all' reads everything that passes the filters below.
  # 'minimal' additionally requires the path to contain an 'include' substring.
  mode: all

  # Files smaller than this are skipped
  min_size_bytes: 200

  # Only files modified within this span of the newest file are read.
  # Humantime format (e.g. '7days', '12h'); null disables the filter.
  recent_window: 7days

  # Paths containing any of these substrings are skipped
  exclude:
    - lastlog
    - wtmp
    - btmp
    - faillog

  # Used by 'minimal' mode only
  include:
    - var/log/messages
    - var/log/syslog
    - var/log/kern
    - var/log/daemon
    - var/log/auth
    - var/log/trace/

# =============================================================================
# NORMALIZE
# =============================================================================

normalize:
  # Source tag column width; file names are padded or truncated to fit
  tag_width: 12

  # Parsed years below this are treated as missing and replaced by the
  # current year. Corrected timestamps are marked with '*'.
  year_floor: 2000

  # Recorded in the run summary; timestamps are never shifted
  hour_adjustment: 0

  # Extra timestamp rules, tried after the built-in ones. The pattern needs
  # exactly one capture group around the timestamp; the format uses strptime
  # directives (%Y %m %d %H %M %S %f %b %a).
  extra_rules: []
  # extra_rules:
  #   - pattern: '^\[(\d{2}\.\d{2}\.\d{4} \d{2}:\d{2}:\d{2})\]'
  #     format: '%d.%m.%Y %H:%M:%S'

# =============================================================================
# WINDOW
# =============================================================================
# Inclusive bounds for the trimmed artifact, 'YYYY-MM-DD HH:MM:SS'.

window:
  start: "2024-01-01 00:00:00"
  end: "2024-12-31 23:59:59"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_starter_config_is_valid() {
        let config = parse_config(&generate_starter_config()).unwrap();
        assert_eq!(config.output.work_dir, "WIP");
        assert_eq!(config.selection.exclude.len(), 4);
        assert_eq!(
            config.selection.include,
            crate::config::types::SelectionConfig::default().include
        );
        assert!(config.normalize.extra_rules.is_empty());
    }

    #[test]
    fn test_commented_rule_is_valid() {
        use crate::source::timestamp::TimestampRule;

        let rule = TimestampRule::new(
            r"^\[(\d{2}\.\d{2}\.\d{4} \d{2}:\d{2}:\d{2})\]",
            "%d.%m.%Y %H:%M:%S",
        );
        assert!(rule.is_ok());
    }
}
