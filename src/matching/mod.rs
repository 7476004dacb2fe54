pub mod acronym;
pub mod cascade;
pub mod fuzzy;
pub mod manager;
pub mod skip_filter;

pub use cascade::ResolutionCascade;
pub use manager::{run_resolution, RunOptions};
