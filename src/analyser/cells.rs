//! Row-level view of polars columns.
//!
//! The predicate engine and value replacement work on individual cells with
//! loose, pandas-like comparison rules. [`Cell`] is that scalar, and
//! [`column_cells`] / [`cells_to_series`] move between it and polars.

use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDateTime),
}

impl Cell {
    /// Convert a JSON value from a command document into a cell.
    ///
    /// Arrays and objects are kept as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map_or(Self::Null, Self::Float),
            },
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => Self::Text(value.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view used by comparisons and arithmetic. Booleans count as 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    fn numeric_or_parsed(&self) -> Option<f64> {
        match self {
            Self::Text(s) => s.trim().parse::<f64>().ok(),
            other => other.as_f64(),
        }
    }

    /// Truthiness of a computed value: non-zero, non-NaN, non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0 && !f.is_nan(),
            Self::Text(s) => !s.is_empty(),
            Self::Date(_) => true,
        }
    }

    /// Ordering between two cells, `None` when they are not comparable.
    ///
    /// Numbers compare across int/float/bool; text compares against a number
    /// only when it parses as one.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => None,
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Date(_), _) | (_, Self::Date(_)) => None,
            (a, b) => {
                let (x, y) = (a.numeric_or_parsed()?, b.numeric_or_parsed()?);
                x.partial_cmp(&y)
            }
        }
    }

    /// Equality with the same loose rules as [`Cell::compare`]. Null never equals anything.
    pub fn loose_eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// A stable string key, used to detect duplicate rows.
    pub fn key(&self) -> String {
        match self {
            Self::Null => "\u{0}null".to_owned(),
            Self::Bool(b) => format!("b:{b}"),
            Self::Int(i) => format!("n:{}", *i as f64),
            Self::Float(f) => format!("n:{f}"),
            Self::Text(s) => format!("s:{s}"),
            Self::Date(d) => format!("d:{d}"),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{d}"),
        }
    }
}

/// Read every value of a column as a [`Cell`].
///
/// Integers widen to `i64`, floats to `f64` (NaN reads as null), dates and
/// datetimes become naive datetimes, and any other dtype is read as text.
pub fn column_cells(column: &Column) -> PolarsResult<Vec<Cell>> {
    let series = column.as_materialized_series();
    let dtype = series.dtype();

    let cells = if dtype.is_bool() {
        series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(Cell::Null, Cell::Bool))
            .collect()
    } else if dtype.is_integer() {
        series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.map_or(Cell::Null, Cell::Int))
            .collect()
    } else if dtype.is_float() {
        series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| match v {
                Some(f) if !f.is_nan() => Cell::Float(f),
                _ => Cell::Null,
            })
            .collect()
    } else if matches!(dtype, DataType::Date | DataType::Datetime(_, _)) {
        series
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| {
                v.and_then(DateTime::from_timestamp_millis)
                    .map_or(Cell::Null, |dt| Cell::Date(dt.naive_utc()))
            })
            .collect()
    } else {
        series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map_or(Cell::Null, |s| Cell::Text(s.to_owned())))
            .collect()
    };

    Ok(cells)
}

/// Build a series from cells, picking the narrowest dtype that holds all of them.
///
/// Mixed kinds fall back to a string column.
pub fn cells_to_series(name: PlSmallStr, cells: &[Cell]) -> PolarsResult<Series> {
    let mut has_bool = false;
    let mut has_int = false;
    let mut has_float = false;
    let mut has_text = false;
    let mut has_date = false;
    for cell in cells {
        match cell {
            Cell::Null => {}
            Cell::Bool(_) => has_bool = true,
            Cell::Int(_) => has_int = true,
            Cell::Float(_) => has_float = true,
            Cell::Text(_) => has_text = true,
            Cell::Date(_) => has_date = true,
        }
    }

    let numeric = has_int || has_float;
    let kinds = [has_bool, numeric, has_text, has_date]
        .iter()
        .filter(|k| **k)
        .count();

    if kinds == 1 && has_bool {
        let values: Vec<Option<bool>> = cells
            .iter()
            .map(|c| match c {
                Cell::Bool(b) => Some(*b),
                _ => None,
            })
            .collect();
        return Ok(Series::new(name, values));
    }
    if kinds == 1 && has_int && !has_float {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|c| match c {
                Cell::Int(i) => Some(*i),
                _ => None,
            })
            .collect();
        return Ok(Series::new(name, values));
    }
    if kinds == 1 && numeric {
        let values: Vec<Option<f64>> = cells.iter().map(Cell::as_f64).collect();
        return Ok(Series::new(name, values));
    }
    if kinds == 1 && has_date {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|c| match c {
                Cell::Date(d) => Some(d.and_utc().timestamp_millis()),
                _ => None,
            })
            .collect();
        return Series::new(name, values).cast(&DataType::Datetime(TimeUnit::Milliseconds, None));
    }

    let values: Vec<Option<String>> = cells
        .iter()
        .map(|c| (!c.is_null()).then(|| c.to_string()))
        .collect();
    Ok(Series::new(name, values))
}
