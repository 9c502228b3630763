//! # datajanitor - declarative filtering and cleaning of tabular data
//!
//! datajanitor applies JSON "commands" to a dataset. A command combines a
//! boolean filter over the rows with optional cleaning options, and every
//! command produces a new named version of the dataset. Versions of one
//! upload form a lineage that can be undone step by step, reset, pruned and
//! exported.
//!
//! ## Quick Start
//!
//! ```no_run
//! use datajanitor::analyser::logic::load_df;
//! use datajanitor::pipeline::{Command, Session};
//! use serde_json::json;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut session = Session::default();
//! session.load_data("orders.csv", load_df(Path::new("orders.csv"))?);
//!
//! let command = Command::new("large.csv", "Orders over 100")
//!     .with_filters(json!({"amount": {"op": ">", "value": 100}}));
//! let outcome = session.apply_command(&command, None)?;
//! println!("{} rows in {}", outcome.row_count, outcome.version);
//!
//! session.undo()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`analyser`]: the data side
//!   - [`analyser::filter`]: filter specifications compiled to row masks
//!   - [`analyser::logic`]: the cleaning pipeline and CSV I/O
//!   - [`analyser::lifecycle`]: versions, lineages and export
//! - [`pipeline`]: command documents, the session orchestrator, builders and reports
//! - [`ai`]: free-text to command generation through a chat-completion API
//! - [`config`]: application settings
//! - [`logging`]: console and file logging, per-session dataset logging
//! - [`error`]: error types and handling utilities
//!
//! ## Filter Specifications
//!
//! A filter maps column names to `{"op": ..., "value": ...}` conditions.
//! Sibling keys are combined with AND; `"AND"`, `"OR"` and `"XOR"` keys
//! hold arrays of nested specifications:
//!
//! ```json
//! {
//!   "OR": [
//!     {"region": {"op": "==", "value": "north"}},
//!     {"AND": [
//!       {"amount": {"op": "between", "value": [100, 500]}},
//!       {"order_date": {"op": ">=", "value": "2024-01-01"}}
//!     ]}
//!   ]
//! }
//! ```

#![warn(clippy::all, rust_2018_idioms)]

pub mod ai;
pub mod analyser;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
