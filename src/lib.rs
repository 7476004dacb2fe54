pub mod aggregation;
pub mod directory;
pub mod matching;
pub mod models;
pub mod storage;
pub mod utils;
