pub mod cli;
pub mod collect;
pub mod config;
pub mod pipeline;
pub mod sequencer;
pub mod source;
