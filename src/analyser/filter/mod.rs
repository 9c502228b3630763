//! Predicate engine.
//!
//! Compiles a filter specification into a boolean mask over a [`DataFrame`]:
//!
//! ```no_run
//! use datajanitor::analyser::filter;
//! use polars::prelude::*;
//! use serde_json::json;
//!
//! # fn example(df: &DataFrame) -> anyhow::Result<()> {
//! let spec = json!({"amount": {"op": ">", "value": 100}});
//! let (filtered, count) = filter::apply_filter(df, &spec)?;
//! println!("{count} matching rows");
//! # Ok(())
//! # }
//! ```

pub mod dates;
pub mod node;
pub mod ops;

pub use node::{Condition, FilterNode, GroupKind};
pub use ops::{Operand, Operator};

use crate::analyser::cells::column_cells;
use crate::error::FilterError;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What to do when a date-named column or its value does not parse as dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFallback {
    /// Compare the raw values instead.
    #[default]
    Lenient,
    /// Fail the condition with `DateCoercion`.
    Strict,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FilterEngine {
    date_fallback: DateFallback,
}

impl FilterEngine {
    pub fn new(date_fallback: DateFallback) -> Self {
        Self { date_fallback }
    }

    pub fn date_fallback(&self) -> DateFallback {
        self.date_fallback
    }

    /// Evaluate a wire-format specification to a row mask.
    ///
    /// # Errors
    ///
    /// Any [`FilterError`] raised while parsing or evaluating a leaf.
    pub fn evaluate(&self, df: &DataFrame, spec: &Value) -> Result<BooleanChunked, FilterError> {
        let node = FilterNode::parse(spec)?;
        self.evaluate_node(df, &node)
    }

    pub fn evaluate_node(
        &self,
        df: &DataFrame,
        node: &FilterNode,
    ) -> Result<BooleanChunked, FilterError> {
        let bits = self.mask(df, node)?;
        Ok(BooleanChunked::from_slice("mask".into(), &bits))
    }

    /// Like [`FilterEngine::evaluate`], also returning how many rows match.
    pub fn evaluate_with_count(
        &self,
        df: &DataFrame,
        spec: &Value,
    ) -> Result<(BooleanChunked, usize), FilterError> {
        let node = FilterNode::parse(spec)?;
        let bits = self.mask(df, &node)?;
        let count = bits.iter().filter(|b| **b).count();
        Ok((BooleanChunked::from_slice("mask".into(), &bits), count))
    }

    /// Keep only the matching rows.
    pub fn apply(&self, df: &DataFrame, spec: &Value) -> Result<(DataFrame, usize), FilterError> {
        let (mask, count) = self.evaluate_with_count(df, spec)?;
        let filtered = df.filter(&mask)?;
        tracing::debug!(
            rows_before = df.height(),
            rows_after = count,
            "Applied filter"
        );
        Ok((filtered, count))
    }

    fn mask(&self, df: &DataFrame, node: &FilterNode) -> Result<Vec<bool>, FilterError> {
        match node {
            FilterNode::Leaf(cond) => self.leaf_mask(df, cond),
            FilterNode::Group { kind, children } => {
                let masks = children
                    .iter()
                    .map(|child| self.mask(df, child))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(combine(*kind, &masks, df.height()))
            }
        }
    }

    fn leaf_mask(&self, df: &DataFrame, cond: &Condition) -> Result<Vec<bool>, FilterError> {
        let Ok(column) = df.column(&cond.column) else {
            return Err(FilterError::UnknownColumn {
                column: cond.column.clone(),
            });
        };

        let mut cells = column_cells(column)?;
        let mut operand = Operand::from_json(cond.value.as_ref());

        if dates::is_date_column(&cond.column) {
            match (dates::coerce_cells(&cells), dates::coerce_operand(&operand)) {
                (Some(coerced_cells), Some(coerced_operand)) => {
                    cells = coerced_cells;
                    operand = coerced_operand;
                }
                _ if self.date_fallback == DateFallback::Strict => {
                    return Err(FilterError::DateCoercion {
                        column: cond.column.clone(),
                    });
                }
                _ => {
                    tracing::debug!(
                        column = %cond.column,
                        "Date parsing failed, comparing raw values"
                    );
                }
            }
        }

        ops::evaluate(cond.op, &cells, &operand, &cond.column)
    }
}

fn combine(kind: GroupKind, masks: &[Vec<bool>], height: usize) -> Vec<bool> {
    (0..height)
        .map(|row| {
            let hits = masks
                .iter()
                .filter(|mask| mask.get(row).copied().unwrap_or(false))
                .count();
            match kind {
                GroupKind::And => hits == masks.len(),
                GroupKind::Or => hits > 0,
                GroupKind::Xor => hits == 1,
            }
        })
        .collect()
}

/// Evaluate with the default (lenient) engine.
pub fn evaluate(df: &DataFrame, spec: &Value) -> Result<BooleanChunked, FilterError> {
    FilterEngine::default().evaluate(df, spec)
}

pub fn evaluate_with_count(
    df: &DataFrame,
    spec: &Value,
) -> Result<(BooleanChunked, usize), FilterError> {
    FilterEngine::default().evaluate_with_count(df, spec)
}

pub fn apply_filter(df: &DataFrame, spec: &Value) -> Result<(DataFrame, usize), FilterError> {
    FilterEngine::default().apply(df, spec)
}
