pub mod output;
pub mod runner;

pub use output::{write_artifact, OutputError, WorkDir};
pub use runner::{run_pipeline, trim_file, RunConfig, RunError, RunSummary};
