//! Builds command documents from interactively assembled filter groups.

use super::spec::Command;
use crate::analyser::filter::{GroupKind, Operator};
use crate::analyser::lifecycle::version::base_name;
use crate::analyser::logic::CleaningOptions;
use crate::error::FilterError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// One condition row; incomplete rows are skipped when building.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterRow {
    pub column: Option<String>,
    pub op: Option<Operator>,
    #[serde(default)]
    pub value: Option<Value>,
}

impl FilterRow {
    pub fn new(column: impl Into<String>, op: Operator, value: Option<Value>) -> Self {
        Self {
            column: Some(column.into()),
            op: Some(op),
            value,
        }
    }

    fn to_entry(&self) -> Option<Value> {
        let (Some(column), Some(op)) = (&self.column, self.op) else {
            return None;
        };
        let condition = if op.takes_value() {
            json!({"op": op.as_str(), "value": self.value.clone().unwrap_or(Value::Null)})
        } else {
            json!({"op": op.as_str()})
        };
        let mut entry = Map::new();
        entry.insert(column.clone(), condition);
        Some(Value::Object(entry))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub logical_op: GroupKind,
    pub filters: Vec<FilterRow>,
}

impl Default for FilterGroup {
    fn default() -> Self {
        Self {
            logical_op: GroupKind::And,
            filters: Vec::new(),
        }
    }
}

/// Merge filter groups into one filter specification.
///
/// A group with a single complete row contributes that row as a plain
/// leaf. Larger groups are listed under their logical key, extending the
/// key if an earlier group already used it.
pub fn build_filters(groups: &[FilterGroup]) -> Map<String, Value> {
    let mut result = Map::new();

    for group in groups {
        let mut entries: Vec<Value> = group.filters.iter().filter_map(FilterRow::to_entry).collect();
        match entries.len() {
            0 => {}
            1 => {
                if let Some(Value::Object(leaf)) = entries.pop() {
                    result.extend(leaf);
                }
            }
            _ => {
                let key = group.logical_op.as_str();
                match result.get_mut(key) {
                    Some(Value::Array(existing)) => existing.extend(entries),
                    Some(other) => {
                        let mut merged = vec![other.take()];
                        merged.extend(entries);
                        *other = Value::Array(merged);
                    }
                    None => {
                        result.insert(key.to_owned(), Value::Array(entries));
                    }
                }
            }
        }
    }

    result
}

/// A filter command from builder groups.
///
/// # Errors
///
/// `InvalidFilterFormat` when the groups hold no complete filter.
pub fn create_command(
    description: impl Into<String>,
    filename: impl Into<String>,
    groups: &[FilterGroup],
) -> Result<Command, FilterError> {
    let filters = build_filters(groups);
    if filters.is_empty() {
        return Err(FilterError::InvalidFilterFormat(
            "add at least one filter before creating a command".to_owned(),
        ));
    }
    Ok(Command::new(filename, description).with_filters(Value::Object(filters)))
}

/// A cleaning-only command deriving `{base}_scruffed.csv` from `filename`.
pub fn scruff_command(filename: &str, description: &str, options: CleaningOptions) -> Command {
    let new_description = format!(
        "{description}. Scruffed with: {}",
        options.active_summary().join(", ")
    );
    Command::new(format!("{}_scruffed.csv", base_name(filename)), new_description)
        .with_scruff(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_rows_merge_as_leaves() {
        let groups = vec![
            FilterGroup {
                logical_op: GroupKind::And,
                filters: vec![FilterRow::new("age", Operator::Gt, Some(json!(30)))],
            },
            FilterGroup {
                logical_op: GroupKind::Or,
                filters: vec![FilterRow::new("email", Operator::IsNa, Some(json!("ignored")))],
            },
        ];
        assert_eq!(
            Value::Object(build_filters(&groups)),
            json!({"age": {"op": ">", "value": 30}, "email": {"op": "isna"}})
        );
    }

    #[test]
    fn test_groups_extend_existing_logical_key() {
        let or_group = |a: &str, b: &str| FilterGroup {
            logical_op: GroupKind::Or,
            filters: vec![
                FilterRow::new(a, Operator::Eq, Some(json!(1))),
                FilterRow::new(b, Operator::Eq, Some(json!(2))),
            ],
        };
        let filters = build_filters(&[or_group("a", "b"), or_group("c", "d")]);
        let or = filters.get("OR").and_then(Value::as_array).map(Vec::len);
        assert_eq!(or, Some(4));
    }

    #[test]
    fn test_incomplete_rows_are_skipped() {
        let groups = vec![FilterGroup {
            logical_op: GroupKind::And,
            filters: vec![FilterRow::default(), FilterRow::default()],
        }];
        assert!(build_filters(&groups).is_empty());
        assert!(matches!(
            create_command("nothing", "out.csv", &groups),
            Err(FilterError::InvalidFilterFormat(_))
        ));
    }

    #[test]
    fn test_scruff_command_naming() {
        let options = CleaningOptions {
            drop_duplicate_rows: true,
            ..Default::default()
        };
        let command = scruff_command("sales.csv", "Quarterly sales", options);
        assert_eq!(command.filename, "sales_scruffed.csv");
        assert_eq!(
            command.description,
            "Quarterly sales. Scruffed with: drop duplicate rows"
        );
        assert!(command.has_scruff());
        assert!(!command.has_filters());
    }
}
