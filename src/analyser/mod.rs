//! Dataset handling: cell values, the filter engine, cleaning and the version store.

pub mod cells;
pub mod filter;
pub mod lifecycle;
pub mod logic;

pub use cells::Cell;
pub use filter::{DateFallback, FilterEngine, FilterNode};
pub use lifecycle::{Lineage, Version, VersionStore};
pub use logic::{CleaningOptions, Cleaner};
