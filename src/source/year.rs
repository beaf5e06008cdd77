use crate::source::timestamp::{CanonicalTimestamp, ParsedTimestamp};
use chrono::{Datelike, Local};

/// Years below this are treated as missing or bogus.
pub const DEFAULT_YEAR_FLOOR: i32 = 2000;

/// Replaces implausible years with the current one.
///
/// Formats without a year parse into the sentinel year 1900, and devices with
/// an unset clock log 1970 or similar. Either way the year is swapped for the
/// current calendar year and the result is flagged as corrected. There is no
/// cross-year-boundary or timezone reasoning: a December line read in January
/// lands eleven months in the future.
#[derive(Debug, Clone, Copy)]
pub struct YearDisambiguator {
    floor: i32,
    current_year: i32,
}

impl YearDisambiguator {
    pub fn new(current_year: i32) -> Self {
        Self {
            floor: DEFAULT_YEAR_FLOOR,
            current_year,
        }
    }

    /// Use the local calendar year at the time of the call.
    pub fn for_today() -> Self {
        Self::new(Local::now().year())
    }

    pub fn with_floor(mut self, floor: i32) -> Self {
        self.floor = floor;
        self
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    /// Returns `None` only when the date has no counterpart in the current
    /// year (29 February outside a leap year).
    pub fn resolve(&self, parsed: ParsedTimestamp) -> Option<CanonicalTimestamp> {
        if parsed.year() >= self.floor {
            return Some(CanonicalTimestamp::literal(parsed));
        }

        parsed
            .with_year(self.current_year)
            .map(CanonicalTimestamp::corrected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn parsed(year: i32, month: u32, day: u32) -> ParsedTimestamp {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
            .into()
    }

    #[test]
    fn test_sentinel_year_replaced_and_marked() {
        let years = YearDisambiguator::new(2024);
        let resolved = years.resolve(parsed(1900, 1, 2)).unwrap();
        assert!(resolved.is_corrected());
        assert_eq!(resolved.to_string(), "2024-01-02 03:04:05.000000*");
    }

    #[test]
    fn test_plausible_year_untouched() {
        let years = YearDisambiguator::new(2024);
        let resolved = years.resolve(parsed(2000, 6, 1)).unwrap();
        assert!(!resolved.is_corrected());
        assert_eq!(resolved.to_string(), "2000-06-01 03:04:05.000000");
    }

    #[test]
    fn test_just_below_floor() {
        let years = YearDisambiguator::new(2031);
        let resolved = years.resolve(parsed(1999, 12, 31)).unwrap();
        assert!(resolved.is_corrected());
        assert_eq!(resolved.to_string(), "2031-12-31 03:04:05.000000*");
    }

    #[test]
    fn test_leap_day_without_counterpart_dropped() {
        let years = YearDisambiguator::new(2023);
        assert!(years.resolve(parsed(1996, 2, 29)).is_none());

        let years = YearDisambiguator::new(2024);
        assert!(years.resolve(parsed(1996, 2, 29)).is_some());
    }

    #[test]
    fn test_custom_floor() {
        let years = YearDisambiguator::new(2024).with_floor(2010);
        assert!(years.resolve(parsed(2005, 1, 1)).unwrap().is_corrected());
        assert!(!years.resolve(parsed(2010, 1, 1)).unwrap().is_corrected());
    }
}
