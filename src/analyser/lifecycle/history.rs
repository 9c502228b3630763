//! Operation history of a lineage.
//!
//! Each successful command or cleaning run appends one [`Operation`]. The
//! version each operation ran against is recorded, so replaying the history
//! over the original upload reproduces the same versions.

use crate::analyser::logic::CleaningOptions;
use crate::pipeline::spec::Command;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// A filter and/or scruff command, run against `target`.
    Command { command: Command, target: String },
    /// A standalone cleaning run on `target`, stored as `output`.
    Clean {
        options: CleaningOptions,
        target: String,
        output: String,
    },
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Command { .. } => "command",
            Self::Clean { .. } => "clean",
        }
    }

    /// The version this operation read from.
    pub fn target(&self) -> &str {
        match self {
            Self::Command { target, .. } | Self::Clean { target, .. } => target,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Command { command, target } => {
                format!("{} on {target}", command.filename)
            }
            Self::Clean {
                options,
                target,
                output,
            } => format!(
                "{output} from {target} ({})",
                options.active_summary().join(", ")
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationHistory {
    entries: Vec<Operation>,
}

impl OperationHistory {
    pub fn push(&mut self, operation: Operation) {
        self.entries.push(operation);
    }

    pub fn pop(&mut self) -> Option<Operation> {
        self.entries.pop()
    }

    pub fn entries(&self) -> &[Operation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_history_serializes_with_kind_tag() -> serde_json::Result<()> {
        let mut history = OperationHistory::default();
        history.push(Operation::Command {
            command: Command::new("big.csv", "amount over 100")
                .with_filters(json!({"amount": {"op": ">", "value": 100}})),
            target: "sales.csv".to_owned(),
        });
        history.push(Operation::Clean {
            options: CleaningOptions::default(),
            target: "sales_big.csv".to_owned(),
            output: "sales_big_cleaned.csv".to_owned(),
        });

        let value = serde_json::to_value(&history)?;
        assert_eq!(value[0]["kind"], "command");
        assert_eq!(value[1]["kind"], "clean");
        assert_eq!(value[1]["target"], "sales_big.csv");

        let back: OperationHistory = serde_json::from_value(value)?;
        assert_eq!(back, history);
        Ok(())
    }

    #[test]
    fn test_pop_returns_latest() {
        let mut history = OperationHistory::default();
        assert!(history.pop().is_none());
        history.push(Operation::Clean {
            options: CleaningOptions::default(),
            target: "a.csv".to_owned(),
            output: "a_cleaned.csv".to_owned(),
        });
        assert_eq!(history.pop().map(|op| op.kind()), Some("clean"));
        assert!(history.is_empty());
    }
}
