//! Leaf operators and their per-row semantics.

use crate::analyser::cells::Cell;
use crate::error::FilterError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    IsNa,
    NotNa,
    Between,
    Contains,
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Invert,
    Shl,
    Shr,
}

impl Operator {
    pub const ALL: [Self; 25] = [
        Self::Eq,
        Self::Ne,
        Self::Lt,
        Self::Le,
        Self::Gt,
        Self::Ge,
        Self::In,
        Self::NotIn,
        Self::IsNa,
        Self::NotNa,
        Self::Between,
        Self::Contains,
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::FloorDiv,
        Self::Mod,
        Self::Pow,
        Self::BitAnd,
        Self::BitOr,
        Self::BitXor,
        Self::Invert,
        Self::Shl,
        Self::Shr,
    ];

    /// The wire spelling used in filter documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::IsNa => "isna",
            Self::NotNa => "notna",
            Self::Between => "between",
            Self::Contains => "contains",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Invert => "~",
            Self::Shl => "<<",
            Self::Shr => ">>",
        }
    }

    /// Human-readable name shown by the filter builder.
    pub fn label(self) -> &'static str {
        match self {
            Self::Eq => "equals",
            Self::Ne => "not equals",
            Self::Lt => "less than",
            Self::Le => "less than or equal",
            Self::Gt => "greater than",
            Self::Ge => "greater than or equal",
            Self::In => "in list",
            Self::NotIn => "not in list",
            Self::IsNa => "is missing",
            Self::NotNa => "is not missing",
            Self::Between => "between",
            Self::Contains => "contains",
            Self::Add => "plus",
            Self::Sub => "minus",
            Self::Mul => "times",
            Self::Div => "divided by",
            Self::FloorDiv => "floor divided by",
            Self::Mod => "modulo",
            Self::Pow => "to the power of",
            Self::BitAnd => "bitwise and",
            Self::BitOr => "bitwise or",
            Self::BitXor => "bitwise xor",
            Self::Invert => "bitwise not",
            Self::Shl => "shifted left by",
            Self::Shr => "shifted right by",
        }
    }

    /// `isna` and `notna` are the only operators evaluated without a value.
    pub fn takes_value(self) -> bool {
        !matches!(self, Self::IsNa | Self::NotNa)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| FilterError::UnsupportedOperator { op: s.to_owned() })
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The right-hand side of a leaf condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Absent,
    Scalar(Cell),
    List(Vec<Cell>),
}

impl Operand {
    pub fn from_json(value: Option<&serde_json::Value>) -> Self {
        match value {
            None | Some(serde_json::Value::Null) => Self::Absent,
            Some(serde_json::Value::Array(items)) => {
                Self::List(items.iter().map(Cell::from_json).collect())
            }
            Some(other) => Self::Scalar(Cell::from_json(other)),
        }
    }

    fn scalar(&self, op: Operator, column: &str) -> Result<&Cell, FilterError> {
        match self {
            Self::Scalar(cell) => Ok(cell),
            Self::Absent => Err(FilterError::MissingValue {
                column: column.to_owned(),
                op: op.as_str().to_owned(),
            }),
            Self::List(_) => Err(FilterError::InvalidFilterFormat(format!(
                "operator '{op}' on column '{column}' expects a single value, not a list"
            ))),
        }
    }

    fn members(&self) -> Vec<Cell> {
        match self {
            Self::Absent => Vec::new(),
            Self::Scalar(cell) => vec![cell.clone()],
            Self::List(cells) => cells.clone(),
        }
    }
}

/// Evaluate one operator over every cell of a column.
pub fn evaluate(
    op: Operator,
    cells: &[Cell],
    operand: &Operand,
    column: &str,
) -> Result<Vec<bool>, FilterError> {
    if op.takes_value() && *operand == Operand::Absent {
        return Err(FilterError::MissingValue {
            column: column.to_owned(),
            op: op.as_str().to_owned(),
        });
    }

    let mask = match op {
        Operator::IsNa => cells.iter().map(Cell::is_null).collect(),
        Operator::NotNa => cells.iter().map(|c| !c.is_null()).collect(),
        Operator::Eq | Operator::Ne | Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge => {
            let rhs = operand.scalar(op, column)?;
            cells.iter().map(|c| compare(op, c, rhs)).collect()
        }
        Operator::In | Operator::NotIn => {
            let set = operand.members();
            let negate = op == Operator::NotIn;
            cells
                .iter()
                .map(|c| set.iter().any(|m| c.loose_eq(m)) != negate)
                .collect()
        }
        Operator::Between => {
            let bounds = match operand {
                Operand::List(bounds) => bounds.as_slice(),
                _ => &[],
            };
            let [low, high] = bounds else {
                return Err(FilterError::InvalidFilterFormat(format!(
                    "'between' on column '{column}' expects a [low, high] pair"
                )));
            };
            cells
                .iter()
                .map(|c| {
                    matches!(c.compare(low), Some(Ordering::Greater | Ordering::Equal))
                        && matches!(c.compare(high), Some(Ordering::Less | Ordering::Equal))
                })
                .collect()
        }
        Operator::Contains => {
            let pattern = contains_pattern(&operand.scalar(op, column)?.to_string(), column)?;
            cells
                .iter()
                .map(|c| !c.is_null() && pattern.is_match(&c.to_string()))
                .collect()
        }
        Operator::Invert => cells.iter().map(|c| invert(c).is_truthy()).collect(),
        Operator::Add
        | Operator::Sub
        | Operator::Mul
        | Operator::Div
        | Operator::FloorDiv
        | Operator::Mod
        | Operator::Pow => {
            let rhs = operand.scalar(op, column)?;
            cells
                .iter()
                .map(|c| arithmetic(op, c, rhs).is_truthy())
                .collect()
        }
        Operator::BitAnd | Operator::BitOr | Operator::BitXor | Operator::Shl | Operator::Shr => {
            let rhs = operand.scalar(op, column)?;
            cells.iter().map(|c| bitwise(op, c, rhs).is_truthy()).collect()
        }
    };

    Ok(mask)
}

fn compare(op: Operator, lhs: &Cell, rhs: &Cell) -> bool {
    let ordering = lhs.compare(rhs);
    match op {
        Operator::Eq => ordering == Some(Ordering::Equal),
        Operator::Ne => ordering != Some(Ordering::Equal),
        Operator::Lt => ordering == Some(Ordering::Less),
        Operator::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        Operator::Gt => ordering == Some(Ordering::Greater),
        Operator::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        _ => false,
    }
}

/// Case-insensitive regex; patterns that do not compile match literally.
fn contains_pattern(pattern: &str, column: &str) -> Result<Regex, FilterError> {
    let build = |p: &str| RegexBuilder::new(p).case_insensitive(true).build();
    build(pattern)
        .or_else(|_| build(&regex::escape(pattern)))
        .map_err(|e| {
            FilterError::InvalidFilterFormat(format!(
                "pattern for column '{column}' cannot be used: {e}"
            ))
        })
}

/// Compute `lhs <op> rhs` with Python numeric semantics.
///
/// Integer arithmetic stays integral until it overflows or divides; anything
/// non-numeric yields null.
pub fn arithmetic(op: Operator, lhs: &Cell, rhs: &Cell) -> Cell {
    match (lhs, rhs) {
        (Cell::Int(a), Cell::Int(b)) => int_arithmetic(op, *a, *b),
        (Cell::Text(a), Cell::Text(b)) if op == Operator::Add => Cell::Text(format!("{a}{b}")),
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => Cell::Float(float_arithmetic(op, a, b)),
            _ => Cell::Null,
        },
    }
}

fn int_arithmetic(op: Operator, a: i64, b: i64) -> Cell {
    let exact = match op {
        Operator::Add => a.checked_add(b),
        Operator::Sub => a.checked_sub(b),
        Operator::Mul => a.checked_mul(b),
        Operator::FloorDiv => a.checked_div(b).map(|q| {
            if a % b != 0 && ((a < 0) != (b < 0)) {
                q - 1
            } else {
                q
            }
        }),
        Operator::Mod => a.checked_rem(b).map(|r| {
            if r != 0 && ((r < 0) != (b < 0)) {
                r + b
            } else {
                r
            }
        }),
        Operator::Pow => u32::try_from(b).ok().and_then(|e| a.checked_pow(e)),
        _ => None,
    };
    exact.map_or_else(
        || Cell::Float(float_arithmetic(op, a as f64, b as f64)),
        Cell::Int,
    )
}

fn float_arithmetic(op: Operator, a: f64, b: f64) -> f64 {
    match op {
        Operator::Add => a + b,
        Operator::Sub => a - b,
        Operator::Mul => a * b,
        Operator::Div => a / b,
        Operator::FloorDiv => (a / b).floor(),
        Operator::Mod if b == 0.0 => f64::NAN,
        Operator::Mod => a - b * (a / b).floor(),
        Operator::Pow => a.powf(b),
        _ => f64::NAN,
    }
}

fn as_integral(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Int(i) => Some(*i),
        Cell::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Compute `lhs <op> rhs` for the bitwise operators. Booleans stay logical.
pub fn bitwise(op: Operator, lhs: &Cell, rhs: &Cell) -> Cell {
    if let (Cell::Bool(a), Cell::Bool(b)) = (lhs, rhs) {
        match op {
            Operator::BitAnd => return Cell::Bool(a & b),
            Operator::BitOr => return Cell::Bool(a | b),
            Operator::BitXor => return Cell::Bool(a ^ b),
            _ => {}
        }
    }

    let (Some(a), Some(b)) = (as_integral(lhs), as_integral(rhs)) else {
        return Cell::Null;
    };
    let shift = || u32::try_from(b).ok();
    let value = match op {
        Operator::BitAnd => Some(a & b),
        Operator::BitOr => Some(a | b),
        Operator::BitXor => Some(a ^ b),
        Operator::Shl => shift().and_then(|s| a.checked_shl(s)),
        Operator::Shr => shift().and_then(|s| a.checked_shr(s)),
        _ => None,
    };
    value.map_or(Cell::Null, Cell::Int)
}

/// `~` applied to the column itself.
pub fn invert(cell: &Cell) -> Cell {
    match cell {
        Cell::Bool(b) => Cell::Bool(!b),
        Cell::Int(i) => Cell::Int(!i),
        _ => Cell::Null,
    }
}
