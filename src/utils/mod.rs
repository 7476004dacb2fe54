pub mod config;
pub mod env;
pub mod layout;
pub mod progress_bars;
