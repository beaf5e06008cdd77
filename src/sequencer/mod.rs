pub mod merge;
pub mod window;

pub use merge::Corpus;
pub use window::{TimeWindow, WindowError};
