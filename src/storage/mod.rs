pub mod jsonl;
pub mod reference_stores;
pub mod report;

pub use jsonl::{raw_lines, JsonlStore, OrderedTable};
pub use reference_stores::{ReferenceData, ReferenceStores, SaveReport};
pub use report::{summarize, StoreReport};
