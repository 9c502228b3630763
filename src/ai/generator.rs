//! Free-text to command translation.
//!
//! The system prompt describes the command format and the current dataset
//! (shape, column types, a few example values per column). The model's
//! reply must be a JSON array of commands; if it wraps the array in prose,
//! the first bracketed span is extracted.

use super::client::CompletionBackend;
use crate::analyser::cells::column_cells;
use crate::analyser::filter::Operator;
use crate::error::GeneratorError;
use crate::pipeline::spec::{Command, DEFAULT_FILENAME, batch_from_value};
use polars::prelude::*;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::LazyLock;

/// Example values shown per column
pub const MAX_SAMPLES: usize = 5;

const BASE_PROMPT: &str = r#"You translate requests about a tabular dataset into JSON commands.

Reply with a JSON array only. Each element is a command:
{"filename": "<output>.csv", "description": "<what it does>", "filters": {...}, "scruff": {...}}
"filters" and "scruff" are both optional.

Filters map a column name to {"op": <operator>, "value": <value>}. Conditions on different
columns in one object are combined with AND. Use "AND", "OR" or "XOR" keys holding an array of
filter objects for explicit logic; they nest. "isna" and "notna" take no value, "between" takes
[low, high], "in" and "not in" take a list.

Scruff options (all optional): standardize_columns, drop_empty_columns, drop_duplicate_columns,
drop_na_rows, drop_na_threshold (percent), drop_duplicate_rows, handle_outliers,
z_score_threshold, fill_numeric_na, fill_method (mean, median, zero, forward, backward),
normalize_numeric, numeric_conversion ("None", "Int to Float", "Float to Int",
"Numeric to String"), clean_text, remove_accents, to_lowercase, remove_special_chars,
remove_stopwords, lemmatize, replace_values ({column: {old: new}}), replace_all_values
({old: new}), excluded_columns ([names]).

Use one command per requested output file."#;

/// Up to `max_samples` distinct non-null values per column, in first-seen order.
pub fn column_context(df: &DataFrame, max_samples: usize) -> Vec<(String, Vec<String>)> {
    df.get_columns()
        .iter()
        .map(|column| {
            let mut seen = HashSet::new();
            let samples = column_cells(column)
                .unwrap_or_default()
                .into_iter()
                .filter(|cell| !cell.is_null())
                .map(|cell| cell.to_string())
                .filter(|value| seen.insert(value.clone()))
                .take(max_samples)
                .collect();
            (column.name().to_string(), samples)
        })
        .collect()
}

fn operator_line() -> String {
    Operator::ALL
        .iter()
        .map(|op| format!("\"{}\" ({})", op.as_str(), op.label()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The base instructions, extended with a description of `df` when one is loaded.
pub fn system_prompt(df: Option<&DataFrame>) -> String {
    let mut prompt = format!("{BASE_PROMPT}\n\nOperators: {}\n", operator_line());
    let Some(df) = df else {
        return prompt;
    };

    prompt.push_str("\nCurrent DataFrame Information:\n");
    for column in df.get_columns() {
        let _ = writeln!(
            prompt,
            "  {}: {} ({} non-null)",
            column.name(),
            column.dtype(),
            column.len() - column.null_count()
        );
    }
    let (rows, columns) = df.shape();
    let names: Vec<String> = df.get_column_names().iter().map(|n| format!("'{n}'")).collect();
    let _ = writeln!(prompt, "\nDataFrame Shape: ({rows}, {columns})");
    let _ = writeln!(prompt, "Column Names: [{}]", names.join(", "));

    prompt.push_str("\nColumn Value Examples:\n");
    for (column, samples) in column_context(df, MAX_SAMPLES) {
        let _ = writeln!(prompt, "{column}: [{}]", samples.join(", "));
    }
    prompt
}

static ARRAY_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]"));

/// Keys that mark a reply object as a command rather than an envelope or error.
const COMMAND_KEYS: [&str; 3] = ["filename", "filters", "scruff"];

/// Read the model's reply as a command batch.
///
/// An array is read directly. Any other reply, including a JSON object that
/// is not itself a command (`{"commands": [...]}`, `{"error": ...}`), falls
/// back to the first bracketed array in the text.
pub fn parse_commands(content: &str) -> Result<Vec<Command>, GeneratorError> {
    match serde_json::from_str::<Value>(content) {
        Ok(value @ Value::Array(_)) => to_batch(value),
        Ok(Value::Object(map)) if COMMAND_KEYS.iter().any(|key| map.contains_key(*key)) => {
            to_batch(Value::Object(map))
        }
        _ => to_batch(extract_array(content)?),
    }
}

fn to_batch(value: Value) -> Result<Vec<Command>, GeneratorError> {
    batch_from_value(value).map_err(|e| GeneratorError::MalformedResponse(format!("{e:#}")))
}

fn extract_array(content: &str) -> Result<Value, GeneratorError> {
    let pattern = ARRAY_PATTERN
        .as_ref()
        .map_err(|e| GeneratorError::MalformedResponse(e.to_string()))?;
    let found = pattern.find(content).ok_or_else(|| {
        GeneratorError::MalformedResponse("No valid JSON array found in response".to_owned())
    })?;
    serde_json::from_str(found.as_str())
        .map_err(|e| GeneratorError::MalformedResponse(format!("Invalid JSON array: {e}")))
}

/// Turns free-text requests into commands using a completion backend.
pub struct CommandGenerator<B> {
    backend: B,
    default_filename: String,
}

impl<B: CompletionBackend> CommandGenerator<B> {
    pub fn new(backend: B, default_filename: impl Into<String>) -> Self {
        Self {
            backend,
            default_filename: default_filename.into(),
        }
    }

    /// Generate commands for `request`, describing `frame` to the model when given.
    pub async fn generate(
        &self,
        request: &str,
        frame: Option<&DataFrame>,
    ) -> Result<Vec<Command>, GeneratorError> {
        let prompt = system_prompt(frame);
        let content = self.backend.complete(&prompt, request).await?;
        tracing::debug!("Model reply: {content}");

        let mut commands = parse_commands(&content)?;
        for command in &mut commands {
            if command.filename == DEFAULT_FILENAME {
                command.filename.clone_from(&self.default_filename);
            }
        }
        tracing::info!("Generated {} command(s)", commands.len());
        Ok(commands)
    }
}
