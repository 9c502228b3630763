use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    #[default]
    Mean,
    Median,
    Zero,
    #[serde(
        alias = "ffill",
        alias = "forward_fill",
        alias = "forward-fill",
        alias = "forward fill"
    )]
    Forward,
    #[serde(
        alias = "bfill",
        alias = "backward_fill",
        alias = "backward-fill",
        alias = "backward fill"
    )]
    Backward,
}

impl FillMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Zero => "zero",
            Self::Forward => "forward",
            Self::Backward => "backward",
        }
    }
}

#[derive(Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum NumericConversion {
    #[default]
    #[serde(alias = "None")]
    None,
    #[serde(alias = "Int to Float", alias = "float")]
    IntToFloat,
    #[serde(alias = "Float to Int", alias = "int")]
    FloatToInt,
    #[serde(alias = "Numeric to String", alias = "string")]
    NumericToString,
}

impl NumericConversion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::IntToFloat => "int to float",
            Self::FloatToInt => "float to int",
            Self::NumericToString => "numeric to string",
        }
    }
}

/// Toggles for one run of the cleaning pipeline.
///
/// Every field has a default, so a command document only lists the options
/// it turns on. Column names in `replace_values` refer to names after
/// standardization.
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(default)]
pub struct CleaningOptions {
    // Column operations
    pub standardize_columns: bool,
    pub drop_empty_columns: bool,
    pub drop_duplicate_columns: bool,

    // Row operations
    pub drop_na_rows: bool,
    /// Percentage of missing cells above which a row is dropped.
    pub drop_na_threshold: Option<f64>,
    pub drop_duplicate_rows: bool,

    // Numeric operations
    pub handle_outliers: bool,
    pub z_score_threshold: f64,
    pub fill_numeric_na: bool,
    pub fill_method: FillMethod,
    pub normalize_numeric: bool,
    pub numeric_conversion: NumericConversion,

    // Text operations
    pub clean_text: bool,
    pub remove_accents: bool,
    pub to_lowercase: bool,
    pub remove_special_chars: bool,
    pub remove_stopwords: bool,
    pub lemmatize: bool,

    /// Per-column `old -> new` replacements.
    pub replace_values: BTreeMap<String, BTreeMap<String, Value>>,
    /// `old -> new` replacements applied to every processed column.
    pub replace_all_values: BTreeMap<String, Value>,

    /// Columns passed through untouched.
    pub excluded_columns: Vec<String>,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            standardize_columns: false,
            drop_empty_columns: false,
            drop_duplicate_columns: false,
            drop_na_rows: false,
            drop_na_threshold: None,
            drop_duplicate_rows: false,
            handle_outliers: false,
            z_score_threshold: 3.0,
            fill_numeric_na: false,
            fill_method: FillMethod::Mean,
            normalize_numeric: false,
            numeric_conversion: NumericConversion::None,
            clean_text: false,
            remove_accents: false,
            to_lowercase: false,
            remove_special_chars: false,
            remove_stopwords: false,
            lemmatize: false,
            replace_values: BTreeMap::new(),
            replace_all_values: BTreeMap::new(),
            excluded_columns: Vec::new(),
        }
    }
}

impl CleaningOptions {
    /// The preset offered as the one-click "scruff" defaults.
    pub fn recommended() -> Self {
        Self {
            standardize_columns: true,
            drop_duplicate_columns: true,
            drop_na_threshold: Some(50.0),
            drop_duplicate_rows: true,
            fill_numeric_na: true,
            fill_method: FillMethod::Median,
            to_lowercase: true,
            ..Self::default()
        }
    }

    pub fn text_enabled(&self) -> bool {
        self.clean_text
            || self.remove_accents
            || self.to_lowercase
            || self.remove_special_chars
            || self.remove_stopwords
            || self.lemmatize
    }

    /// True when running the pipeline would not change anything.
    pub fn is_noop(&self) -> bool {
        !(self.standardize_columns
            || self.drop_empty_columns
            || self.drop_duplicate_columns
            || self.drop_na_rows
            || self.drop_na_threshold.is_some()
            || self.drop_duplicate_rows
            || self.handle_outliers
            || self.fill_numeric_na
            || self.normalize_numeric
            || self.numeric_conversion != NumericConversion::None
            || self.text_enabled()
            || !self.replace_values.is_empty()
            || !self.replace_all_values.is_empty())
    }

    /// Short descriptions of every enabled option, in pipeline order.
    pub fn active_summary(&self) -> Vec<String> {
        let mut parts = Vec::new();
        let mut flag = |on: bool, label: &str| {
            if on {
                parts.push(label.to_owned());
            }
        };
        flag(self.standardize_columns, "standardize column names");
        flag(self.drop_empty_columns, "drop empty columns");
        flag(self.drop_duplicate_columns, "drop duplicate columns");
        flag(self.drop_na_rows, "drop rows with missing values");
        flag(self.drop_duplicate_rows, "drop duplicate rows");
        flag(self.normalize_numeric, "normalize numeric columns");
        flag(self.clean_text, "clean text");
        flag(self.remove_accents, "remove accents");
        flag(self.to_lowercase, "lowercase text");
        flag(self.remove_special_chars, "remove special characters");
        flag(self.remove_stopwords, "remove stopwords");
        flag(self.lemmatize, "lemmatize");

        if !self.drop_na_rows
            && let Some(threshold) = self.drop_na_threshold
        {
            parts.push(format!("drop rows over {threshold}% missing"));
        }
        if self.handle_outliers {
            parts.push(format!("remove outliers (z > {})", self.z_score_threshold));
        }
        if self.fill_numeric_na {
            parts.push(format!("fill numeric gaps ({})", self.fill_method.as_str()));
        }
        if self.numeric_conversion != NumericConversion::None {
            parts.push(format!("convert {}", self.numeric_conversion.as_str()));
        }
        if !self.replace_values.is_empty() || !self.replace_all_values.is_empty() {
            parts.push("replace values".to_owned());
        }
        if !self.excluded_columns.is_empty() {
            parts.push(format!("excluding {}", self.excluded_columns.join(", ")));
        }
        parts
    }
}
