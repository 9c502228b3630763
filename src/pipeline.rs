//! Command documents and their execution against versioned datasets.
//!
//! A command combines an optional filter with optional cleaning options and
//! names the version it produces. Commands arrive as JSON (hand-written,
//! assembled with [`builder`], or generated from free text by [`crate::ai`])
//! and are applied by a [`Session`].
//!
//! # Example
//!
//! ```no_run
//! use datajanitor::analyser::logic::load_df;
//! use datajanitor::pipeline::{Session, batch_from_json};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut session = Session::default();
//! session.load_data("orders.csv", load_df(Path::new("orders.csv"))?);
//!
//! let commands = batch_from_json(r#"[
//!     {"filename": "large.csv", "description": "Large orders",
//!      "filters": {"amount": {"op": ">", "value": 100}}},
//!     {"filename": "tidy.csv", "description": "Deduplicated",
//!      "scruff": {"drop_duplicate_rows": true}}
//! ]"#)?;
//!
//! let report = session.apply_commands(&commands)?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod executor;
pub mod report;
pub mod spec;

pub use builder::{FilterGroup, FilterRow, build_filters, create_command, scruff_command};
pub use executor::{BatchEntry, BatchReport, CommandOutcome, Session};
pub use report::report_command;
pub use spec::{
    Command, DEFAULT_FILENAME, batch_from_file, batch_from_json, batch_from_value, batch_to_file,
    batch_to_json,
};
