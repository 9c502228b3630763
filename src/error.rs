//! Centralized error handling for datajanitor.
//!
//! Each component owns a small error enum describing its failure modes:
//!
//! - [`FilterError`]: predicate compilation and evaluation
//! - [`CleanError`]: non-fatal per-column cleaning failures (reported as warnings)
//! - [`StoreError`]: version store invariants
//! - [`GeneratorError`]: the language-model command generator
//!
//! All of them convert into [`JanitorError`] so the `?` operator works across
//! component boundaries:
//!
//! ```no_run
//! use datajanitor::error::{JanitorError, Result};
//! use std::fs;
//!
//! fn read_commands(path: &str) -> Result<String> {
//!     // std::io::Error converts to JanitorError via From
//!     let content = fs::read_to_string(path)?;
//!     Ok(content)
//! }
//! ```
//!
//! The [`ResultExt`] trait adds `.context()` to any result whose error
//! converts into [`JanitorError`].

use std::fmt;

/// Failures while parsing or evaluating a filter specification.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
    /// A leaf references a column the dataset does not have.
    UnknownColumn { column: String },

    /// A leaf uses an operator outside the supported set.
    UnsupportedOperator { op: String },

    /// A value-taking operator was given no value.
    MissingValue { column: String, op: String },

    /// The specification is not reducible to a mapping of conditions.
    InvalidFilterFormat(String),

    /// Strict date coercion failed for a date-named column.
    DateCoercion { column: String },

    /// The underlying frame could not be read or masked.
    Data(String),
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownColumn { column } => {
                write!(f, "Column '{column}' not found in dataset")
            }
            Self::UnsupportedOperator { op } => write!(f, "Unsupported operator: {op}"),
            Self::MissingValue { column, op } => {
                write!(f, "Value is missing for operator '{op}' on column '{column}'")
            }
            Self::InvalidFilterFormat(msg) => write!(f, "Invalid filter format: {msg}"),
            Self::DateCoercion { column } => {
                write!(f, "Could not interpret column '{column}' or its value as dates")
            }
            Self::Data(msg) => write!(f, "Filter data error: {msg}"),
        }
    }
}

impl std::error::Error for FilterError {}

impl From<polars::error::PolarsError> for FilterError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::Data(err.to_string())
    }
}

/// A per-column cleaning failure. The column keeps its previous values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanError {
    ConversionFailure {
        column: String,
        stage: String,
        reason: String,
    },
}

impl CleanError {
    pub fn conversion(
        column: impl Into<String>,
        stage: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self::ConversionFailure {
            column: column.into(),
            stage: stage.into(),
            reason: reason.to_string(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Self::ConversionFailure { column, .. } => column,
        }
    }
}

impl fmt::Display for CleanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConversionFailure {
                column,
                stage,
                reason,
            } => write!(f, "Could not apply {stage} to column '{column}': {reason}"),
        }
    }
}

impl std::error::Error for CleanError {}

/// Version store invariant violations and lookup failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The first version of an upload can never be removed.
    CannotRemoveOriginal { version: String },

    /// Every upload keeps at least one version.
    CannotRemoveLastVersion { upload: String },

    UnknownUpload(String),

    UnknownVersion(String),

    /// A derived version may not take the original's name.
    ReservedName(String),

    /// No upload has been loaded or selected yet.
    NoActiveUpload,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CannotRemoveOriginal { version } => {
                write!(f, "Cannot remove the original version '{version}'")
            }
            Self::CannotRemoveLastVersion { upload } => {
                write!(f, "Cannot remove the last remaining version of '{upload}'")
            }
            Self::UnknownUpload(name) => write!(f, "Upload not found: {name}"),
            Self::UnknownVersion(name) => write!(f, "Version not found: {name}"),
            Self::ReservedName(name) => {
                write!(f, "'{name}' is the original upload and cannot be replaced")
            }
            Self::NoActiveUpload => write!(f, "No dataset loaded"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Failures of the language-model command generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    /// The request failed, timed out, or was rejected upstream.
    UpstreamRequestFailure(String),

    /// The reply held no parseable array of commands.
    MalformedResponse(String),
}

impl fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpstreamRequestFailure(msg) => write!(f, "Language model request failed: {msg}"),
            Self::MalformedResponse(msg) => {
                write!(f, "Language model returned an unusable response: {msg}")
            }
        }
    }
}

impl std::error::Error for GeneratorError {}

/// Main error type for datajanitor operations.
#[derive(Debug)]
pub enum JanitorError {
    /// I/O errors (file operations, network, etc.)
    Io(std::io::Error),

    /// Data processing errors (Polars, CSV parsing, etc.)
    DataProcessing(String),

    Filter(FilterError),

    Store(StoreError),

    Generator(GeneratorError),

    /// Configuration and JSON document errors
    Config(String),

    /// A command in a batch failed
    Command {
        index: usize,
        filename: String,
        source: Box<JanitorError>,
    },

    /// Generic error with context
    Other(String),
}

impl fmt::Display for JanitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Filter(e) => write!(f, "{e}"),
            Self::Store(e) => write!(f, "{e}"),
            Self::Generator(e) => write!(f, "{e}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Command {
                index,
                filename,
                source,
            } => write!(f, "Command {index} ({filename}) failed: {source}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for JanitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Filter(e) => Some(e),
            Self::Store(e) => Some(e),
            Self::Generator(e) => Some(e),
            Self::Command { source, .. } => Some(source.as_ref()),
            Self::DataProcessing(_) | Self::Config(_) | Self::Other(_) => None,
        }
    }
}

impl From<std::io::Error> for JanitorError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for JanitorError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for JanitorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<polars::error::PolarsError> for JanitorError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<zip::result::ZipError> for JanitorError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::DataProcessing(format!("Zip archive error: {err}"))
    }
}

impl From<FilterError> for JanitorError {
    fn from(err: FilterError) -> Self {
        Self::Filter(err)
    }
}

impl From<StoreError> for JanitorError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<GeneratorError> for JanitorError {
    fn from(err: GeneratorError) -> Self {
        Self::Generator(err)
    }
}

impl From<JanitorError> for String {
    fn from(err: JanitorError) -> Self {
        err.to_string()
    }
}

/// Result type alias for datajanitor operations.
pub type Result<T, E = JanitorError> = std::result::Result<T, E>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<JanitorError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: JanitorError = e.into();
            JanitorError::Other(format!("{}: {}", msg.into(), err))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: JanitorError = e.into();
            JanitorError::Other(format!("{}: {}", f(), err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_error_display() {
        let err = FilterError::MissingValue {
            column: "amount".to_owned(),
            op: ">".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "Value is missing for operator '>' on column 'amount'"
        );
    }

    #[test]
    fn test_store_error_converts() {
        let err: JanitorError = StoreError::CannotRemoveOriginal {
            version: "sales.csv".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            JanitorError::Store(StoreError::CannotRemoveOriginal { .. })
        ));
        let s: String = err.into();
        assert_eq!(s, "Cannot remove the original version 'sales.csv'");
    }

    #[test]
    fn test_command_error_keeps_source() {
        use std::error::Error as _;

        let err = JanitorError::Command {
            index: 2,
            filename: "big_orders.csv".to_owned(),
            source: Box::new(FilterError::UnknownColumn {
                column: "ammount".to_owned(),
            }
            .into()),
        };
        assert!(err.to_string().starts_with("Command 2 (big_orders.csv) failed"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_result_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "commands.json",
        ));

        let result: Result<()> = result.context("Failed to read command batch");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read command batch")
        );
    }
}
