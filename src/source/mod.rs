pub mod encoding;
pub mod reader;
pub mod timestamp;
pub mod year;

pub use reader::{LineProcessor, NormalizedLine, ProcessedFile};
pub use timestamp::{CanonicalTimestamp, RuleSet, TimestampError, TimestampExtractor, TimestampRule};
pub use year::YearDisambiguator;
