//! Command document data structures.
//!
//! A command pairs an optional filter specification with optional cleaning
//! options and names the version it produces. Batches are JSON arrays of
//! commands; a single object is read as a batch of one.

use crate::analyser::filter::FilterNode;
use crate::analyser::logic::CleaningOptions;
use crate::error::FilterError;
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Version name used when a command does not give one
pub const DEFAULT_FILENAME: &str = "unnamed_command.csv";

/// A declarative filter and/or cleaning request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Command {
    /// Name of the version the command produces
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Filter specification in wire format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Value>,

    /// Cleaning options applied after filtering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scruff: Option<CleaningOptions>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Command>),
    One(Box<Command>),
}

impl Command {
    pub fn new(filename: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            description: description.into(),
            filters: None,
            scruff: None,
        }
    }

    #[must_use]
    pub fn with_filters(mut self, filters: Value) -> Self {
        self.filters = Some(filters);
        self
    }

    #[must_use]
    pub fn with_scruff(mut self, options: CleaningOptions) -> Self {
        self.scruff = Some(options);
        self
    }

    /// The empty starting point offered to users editing commands by hand
    pub fn default_template() -> Self {
        Self {
            filename: "filter_data.csv".to_owned(),
            description: "Empty default JSON structure".to_owned(),
            filters: Some(Value::Object(serde_json::Map::new())),
            scruff: Some(CleaningOptions::default()),
        }
    }

    /// Whether the command carries a non-empty filter specification
    pub fn has_filters(&self) -> bool {
        match &self.filters {
            None | Some(Value::Null) => false,
            Some(Value::Object(map)) => !map.is_empty(),
            Some(_) => true,
        }
    }

    /// Whether the command carries cleaning options that change anything
    pub fn has_scruff(&self) -> bool {
        self.scruff.as_ref().is_some_and(|options| !options.is_noop())
    }

    /// Parse the filter specification, if any
    pub fn filter_node(&self) -> Result<Option<FilterNode>, FilterError> {
        match &self.filters {
            Some(spec) if self.has_filters() => FilterNode::parse(spec).map(Some),
            _ => Ok(None),
        }
    }

    /// Parse a single command from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse command JSON")
    }

    /// Serialize the command to a JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize command")
    }
}

/// Parse a batch from JSON text: an array of commands or one command object
pub fn batch_from_json(json: &str) -> Result<Vec<Command>> {
    let value: Value = serde_json::from_str(json).context("Failed to parse command batch JSON")?;
    batch_from_value(value)
}

pub fn batch_from_value(value: Value) -> Result<Vec<Command>> {
    match serde_json::from_value(value).context("Invalid command document")? {
        OneOrMany::Many(commands) => Ok(commands),
        OneOrMany::One(command) => Ok(vec![*command]),
    }
}

/// Load a command batch from a JSON file
pub fn batch_from_file(path: impl AsRef<Path>) -> Result<Vec<Command>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read command file: {}", path.display()))?;
    batch_from_json(&content)
}

pub fn batch_to_json(commands: &[Command]) -> Result<String> {
    serde_json::to_string_pretty(commands).context("Failed to serialize command batch")
}

/// Save a command batch to a JSON file
pub fn batch_to_file(commands: &[Command], path: impl AsRef<Path>) -> Result<()> {
    let json = batch_to_json(commands)?;
    std::fs::write(path.as_ref(), json).context("Failed to write command file")
}

fn default_filename() -> String {
    DEFAULT_FILENAME.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_take_defaults() -> Result<()> {
        let command = Command::from_json(r#"{"filters": {"age": {"op": ">", "value": 30}}}"#)?;
        assert_eq!(command.filename, DEFAULT_FILENAME);
        assert!(command.description.is_empty());
        assert!(command.has_filters());
        assert!(!command.has_scruff());
        Ok(())
    }

    #[test]
    fn test_single_object_is_batch_of_one() -> Result<()> {
        let one = batch_from_json(r#"{"filename": "a.csv", "description": "x"}"#)?;
        assert_eq!(one.len(), 1);

        let many = batch_from_json(
            r#"[{"filename": "a.csv", "description": "x"},
                {"filename": "b.csv", "description": "y", "scruff": {"drop_duplicate_rows": true}}]"#,
        )?;
        assert_eq!(many.len(), 2);
        assert!(many[1].has_scruff());
        Ok(())
    }

    #[test]
    fn test_default_template_is_noop() -> Result<()> {
        let template = Command::default_template();
        assert!(!template.has_filters());
        assert!(!template.has_scruff());
        assert!(template.filter_node()?.is_none());

        let json = template.to_json()?;
        assert!(json.contains("\"filename\": \"filter_data.csv\""));
        Ok(())
    }

    #[test]
    fn test_batch_file_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("commands.json");
        let commands = vec![
            Command::new("big.csv", "large orders")
                .with_filters(json!({"amount": {"op": ">", "value": 100}})),
            Command::new("clean.csv", "dedupe").with_scruff(CleaningOptions {
                drop_duplicate_rows: true,
                ..Default::default()
            }),
        ];
        batch_to_file(&commands, &path)?;
        assert_eq!(batch_from_file(&path)?, commands);
        Ok(())
    }

    #[test]
    fn test_invalid_batch_is_rejected() {
        assert!(batch_from_json("[1, 2]").is_err());
        assert!(batch_from_json("not json").is_err());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(batch_from_json(r#"{"error": "rate limited"}"#).is_err());
        assert!(batch_from_json(r#"{"commands": [{"filename": "a.csv"}]}"#).is_err());
        assert!(Command::from_json(r#"{"filename": "a.csv", "filter": {}}"#).is_err());
    }
}
