pub mod frequency;

pub use frequency::{aggregate_records, collect_raw_names, AggregationSummary};
