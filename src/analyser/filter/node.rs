//! Filter specification tree.
//!
//! The wire format is a nested JSON mapping:
//!
//! ```json
//! {
//!   "region": {"op": "==", "value": "EU"},
//!   "OR": [
//!     {"amount": {"op": ">", "value": 100}},
//!     {"priority": {"op": "isna"}}
//!   ]
//! }
//! ```
//!
//! Sibling keys are combined with AND. `AND`, `OR` and `XOR` take one mapping
//! or a list of mappings. The document is parsed once into a [`FilterNode`].

use super::ops::Operator;
use crate::error::FilterError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupKind {
    And,
    Or,
    Xor,
}

impl GroupKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            "XOR" => Some(Self::Xor),
            _ => None,
        }
    }
}

/// A single `column <op> value` test.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: Operator,
    pub value: Option<Value>,
}

impl Condition {
    pub fn new(column: impl Into<String>, op: Operator, value: Option<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value,
        }
    }

    fn parse(column: &str, body: &Map<String, Value>) -> Result<Self, FilterError> {
        let op = match body.get("op") {
            Some(Value::String(s)) => s.parse::<Operator>()?,
            Some(other) => {
                return Err(FilterError::UnsupportedOperator {
                    op: other.to_string(),
                });
            }
            None => {
                return Err(FilterError::InvalidFilterFormat(format!(
                    "condition for '{column}' has no 'op'"
                )));
            }
        };

        let value = body.get("value").filter(|v| !v.is_null()).cloned();
        if op.takes_value() && value.is_none() {
            return Err(FilterError::MissingValue {
                column: column.to_owned(),
                op: op.as_str().to_owned(),
            });
        }

        Ok(Self::new(column, op, value))
    }

    fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("op".to_owned(), Value::String(self.op.as_str().to_owned()));
        if let Some(value) = &self.value {
            body.insert("value".to_owned(), value.clone());
        }
        Value::Object(body)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Leaf(Condition),
    Group {
        kind: GroupKind,
        children: Vec<FilterNode>,
    },
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

impl FilterNode {
    /// Parse a wire-format filter specification.
    ///
    /// # Errors
    ///
    /// `InvalidFilterFormat` when part of the document is not a mapping,
    /// `UnsupportedOperator` / `MissingValue` for bad leaves.
    pub fn parse(spec: &Value) -> Result<Self, FilterError> {
        let Value::Object(map) = spec else {
            return Err(FilterError::InvalidFilterFormat(format!(
                "expected a mapping, found {}",
                describe(spec)
            )));
        };

        let mut children = map
            .iter()
            .map(|(key, value)| Self::parse_entry(key, value))
            .collect::<Result<Vec<_>, _>>()?;

        if children.len() == 1
            && let Some(only) = children.pop()
        {
            return Ok(only);
        }
        Ok(Self::Group {
            kind: GroupKind::And,
            children,
        })
    }

    fn parse_entry(key: &str, value: &Value) -> Result<Self, FilterError> {
        if let Some(kind) = GroupKind::from_key(key) {
            let children = match value {
                Value::Array(items) => items.iter().map(Self::parse).collect::<Result<_, _>>()?,
                Value::Object(_) => vec![Self::parse(value)?],
                other => {
                    return Err(FilterError::InvalidFilterFormat(format!(
                        "'{key}' expects a mapping or a list of mappings, found {}",
                        describe(other)
                    )));
                }
            };
            return Ok(Self::Group { kind, children });
        }

        match value {
            Value::Object(body) if body.contains_key("op") => {
                Condition::parse(key, body).map(Self::Leaf)
            }
            // A mapping without an operator is a nested specification.
            Value::Object(_) => Self::parse(value),
            other => Err(FilterError::InvalidFilterFormat(format!(
                "condition for '{key}' must be a mapping with an 'op', found {}",
                describe(other)
            ))),
        }
    }

    pub fn leaf(column: impl Into<String>, op: Operator, value: Option<Value>) -> Self {
        Self::Leaf(Condition::new(column, op, value))
    }

    pub fn group(kind: GroupKind, children: Vec<Self>) -> Self {
        Self::Group { kind, children }
    }

    /// Render back to the wire format.
    ///
    /// An AND of leaves on distinct columns becomes a flat mapping; everything
    /// else is written under its logical key.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Leaf(cond) => {
                let mut map = Map::new();
                map.insert(cond.column.clone(), cond.body());
                Value::Object(map)
            }
            Self::Group { kind, children } => {
                if *kind == GroupKind::And
                    && let Some(flat) = flat_leaves(children)
                {
                    return Value::Object(flat);
                }
                let mut map = Map::new();
                map.insert(
                    kind.as_str().to_owned(),
                    Value::Array(children.iter().map(Self::to_value).collect()),
                );
                Value::Object(map)
            }
        }
    }

    /// Every column referenced by a leaf, in document order.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Self::Leaf(cond) => vec![cond.column.as_str()],
            Self::Group { children, .. } => children.iter().flat_map(Self::columns).collect(),
        }
    }
}

fn flat_leaves(children: &[FilterNode]) -> Option<Map<String, Value>> {
    let mut map = Map::new();
    for child in children {
        let FilterNode::Leaf(cond) = child else {
            return None;
        };
        if map.contains_key(&cond.column) {
            return None;
        }
        map.insert(cond.column.clone(), cond.body());
    }
    Some(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sibling_keys_become_implicit_and() -> Result<(), FilterError> {
        let node = FilterNode::parse(&json!({
            "region": {"op": "==", "value": "EU"},
            "amount": {"op": ">", "value": 100}
        }))?;
        let FilterNode::Group { kind, children } = node else {
            panic!("expected a group");
        };
        assert_eq!(kind, GroupKind::And);
        assert_eq!(children.len(), 2);
        Ok(())
    }

    #[test]
    fn test_logical_key_accepts_single_mapping() -> Result<(), FilterError> {
        let node = FilterNode::parse(&json!({"OR": {"amount": {"op": ">", "value": 1}}}))?;
        assert_eq!(
            node,
            FilterNode::group(
                GroupKind::Or,
                vec![FilterNode::leaf("amount", Operator::Gt, Some(json!(1)))]
            )
        );
        Ok(())
    }

    #[test]
    fn test_bad_shapes_are_rejected() {
        assert!(matches!(
            FilterNode::parse(&json!([1, 2])),
            Err(FilterError::InvalidFilterFormat(_))
        ));
        assert!(matches!(
            FilterNode::parse(&json!({"amount": 5})),
            Err(FilterError::InvalidFilterFormat(_))
        ));
        assert!(matches!(
            FilterNode::parse(&json!({"AND": "amount"})),
            Err(FilterError::InvalidFilterFormat(_))
        ));
        assert_eq!(
            FilterNode::parse(&json!({"amount": {"op": "~="}})),
            Err(FilterError::UnsupportedOperator {
                op: "~=".to_owned()
            })
        );
        assert_eq!(
            FilterNode::parse(&json!({"amount": {"op": "<", "value": null}})),
            Err(FilterError::MissingValue {
                column: "amount".to_owned(),
                op: "<".to_owned()
            })
        );
    }

    #[test]
    fn test_null_checks_need_no_value() -> Result<(), FilterError> {
        let node = FilterNode::parse(&json!({"notes": {"op": "isna"}}))?;
        assert_eq!(node, FilterNode::leaf("notes", Operator::IsNa, None));
        Ok(())
    }

    #[test]
    fn test_to_value_reparses_to_same_tree() -> Result<(), FilterError> {
        let spec = json!({
            "status": {"op": "in", "value": ["open", "pending"]},
            "XOR": [
                {"amount": {"op": ">", "value": 100}},
                {"amount": {"op": "<", "value": 10}}
            ]
        });
        let node = FilterNode::parse(&spec)?;
        assert_eq!(FilterNode::parse(&node.to_value())?, node);
        assert_eq!(node.columns(), vec!["status", "amount", "amount"]);
        Ok(())
    }
}
