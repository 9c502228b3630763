//! Date coercion for columns whose name mentions "date".

use super::ops::Operand;
use crate::analyser::cells::Cell;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
];

pub fn is_date_column(name: &str) -> bool {
    name.to_lowercase().contains("date")
}

/// Parse a date or datetime written in any of the common layouts.
///
/// Month-first is assumed for slash-separated dates.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn coerce_cell(cell: &Cell) -> Option<Cell> {
    match cell {
        Cell::Null | Cell::Date(_) => Some(cell.clone()),
        Cell::Text(s) => parse_datetime(s).map(Cell::Date),
        Cell::Bool(_) | Cell::Int(_) | Cell::Float(_) => None,
    }
}

/// Coerce every cell to a date. `None` if any non-null cell does not parse.
pub fn coerce_cells(cells: &[Cell]) -> Option<Vec<Cell>> {
    cells.iter().map(coerce_cell).collect()
}

pub fn coerce_operand(operand: &Operand) -> Option<Operand> {
    match operand {
        Operand::Absent => Some(Operand::Absent),
        Operand::Scalar(cell) => coerce_cell(cell).map(Operand::Scalar),
        Operand::List(cells) => coerce_cells(cells).map(Operand::List),
    }
}
