//! The cleaning pipeline.
//!
//! Stages run in a fixed order: column operations, row operations, numeric
//! operations, text operations, value replacement. Each stage is toggled by
//! [`CleaningOptions`]. Columns listed in `excluded_columns` are set aside
//! first and re-attached unchanged at the end.
//!
//! A failure inside one column (for example converting a float column with
//! gaps to integers) never aborts the run: the column keeps its previous
//! values and a [`CleanError`] is reported in [`CleanOutcome::warnings`].

use super::text::{EnglishNormalizer, TextNormalizer, TextOptions, normalize_text};
use super::types::{CleaningOptions, FillMethod, NumericConversion};
use crate::analyser::cells::{Cell, cells_to_series, column_cells};
use crate::analyser::filter::dates::parse_datetime;
use crate::error::{CleanError, Result};
use polars::prelude::*;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

pub struct CleanOutcome {
    pub frame: DataFrame,
    pub warnings: Vec<CleanError>,
}

pub struct Cleaner {
    normalizer: Box<dyn TextNormalizer>,
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(EnglishNormalizer::default())
    }
}

impl Cleaner {
    pub fn new(normalizer: impl TextNormalizer + 'static) -> Self {
        Self {
            normalizer: Box::new(normalizer),
        }
    }

    /// Run every enabled stage over a copy of `df`.
    ///
    /// # Errors
    ///
    /// Only frame-level failures are returned; per-column problems become warnings.
    pub fn clean(&self, df: &DataFrame, options: &CleaningOptions) -> Result<CleanOutcome> {
        let height = df.height();
        let (mut work, excluded) = split_excluded(df, &options.excluded_columns)?;
        let mut rows: Vec<usize> = (0..height).collect();
        let mut warnings = Vec::new();

        if work.width() > 0 {
            work = column_ops(&work, options)?;
            (work, rows) = row_ops(work, rows, options)?;
            (work, rows) = numeric_ops(work, rows, options, &mut warnings)?;
            work = self.text_ops(work, options, &mut warnings);
            work = replace_values(work, options, &mut warnings);
        }

        let frame = reattach(work, &rows, excluded, height)?;
        tracing::debug!(
            rows_before = height,
            rows_after = frame.height(),
            columns = frame.width(),
            warnings = warnings.len(),
            "Cleaning finished"
        );
        Ok(CleanOutcome { frame, warnings })
    }

    fn text_ops(
        &self,
        df: DataFrame,
        options: &CleaningOptions,
        warnings: &mut Vec<CleanError>,
    ) -> DataFrame {
        if !options.text_enabled() {
            return df;
        }
        let text = TextOptions::from(options);
        let names: Vec<String> = df
            .get_columns()
            .iter()
            .filter(|c| c.dtype() == &DataType::String)
            .map(|c| c.name().to_string())
            .collect();

        let mut df = df;
        for name in &names {
            df = apply_column_step(df, name, "text normalization", warnings, |frame| {
                let values: Vec<Option<String>> = frame
                    .column(name)?
                    .as_materialized_series()
                    .str()?
                    .into_iter()
                    .map(|v| v.map(|s| normalize_text(s, &text, self.normalizer.as_ref())))
                    .collect();
                with_series(frame, Series::new(name.as_str().into(), values))
            });
        }
        df
    }
}

/// Clean with the built-in English text normalizer.
pub fn clean(df: &DataFrame, options: &CleaningOptions) -> Result<CleanOutcome> {
    Cleaner::default().clean(df, options)
}

/// Lower-case a column name and collapse every run of other characters into one underscore.
pub fn standardize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut gap = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if gap && !out.is_empty() {
                out.push('_');
            }
            gap = false;
            out.extend(ch.to_lowercase().filter(|c| c.is_alphanumeric()));
        } else {
            gap = true;
        }
    }
    if out.is_empty() {
        "unnamed".to_owned()
    } else {
        out
    }
}

fn with_series(df: &DataFrame, series: Series) -> PolarsResult<DataFrame> {
    let mut out = df.clone();
    out.with_column(series)?;
    Ok(out)
}

/// Run a single-column step, keeping the previous frame if it fails.
fn apply_column_step<F>(
    df: DataFrame,
    column: &str,
    stage: &str,
    warnings: &mut Vec<CleanError>,
    step: F,
) -> DataFrame
where
    F: FnOnce(&DataFrame) -> PolarsResult<DataFrame>,
{
    match step(&df) {
        Ok(next) => next,
        Err(e) => {
            tracing::warn!(column, stage, error = %e, "Column left unchanged");
            warnings.push(CleanError::conversion(column, stage, e));
            df
        }
    }
}

fn split_excluded(df: &DataFrame, excluded: &[String]) -> Result<(DataFrame, Vec<Column>)> {
    for name in excluded {
        if df.column(name).is_err() {
            tracing::debug!(column = %name, "Excluded column is not in the dataset");
        }
    }
    let (set_aside, kept): (Vec<Column>, Vec<Column>) = df
        .get_columns()
        .iter()
        .cloned()
        .partition(|c| excluded.iter().any(|name| name.as_str() == c.name().as_str()));
    Ok((DataFrame::new(kept)?, set_aside))
}

/// Rename columns so no name repeats, suffixing `_2`, `_3`, ...
fn make_unique(columns: &mut [Column], taken: &mut HashSet<String>) {
    for column in columns {
        let base = column.name().to_string();
        if taken.insert(base.clone()) {
            continue;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if taken.insert(candidate.clone()) {
                column.rename(candidate.into());
                break;
            }
            n += 1;
        }
    }
}

fn column_ops(df: &DataFrame, options: &CleaningOptions) -> Result<DataFrame> {
    let mut columns: Vec<Column> = df.get_columns().to_vec();

    if options.standardize_columns {
        for column in &mut columns {
            let name = standardize_name(column.name());
            column.rename(name.into());
        }
    }

    if options.drop_empty_columns {
        columns.retain(|c| c.len() == 0 || c.null_count() < c.len());
    }

    let mut taken = HashSet::new();
    if options.drop_duplicate_columns {
        columns.retain(|c| taken.insert(c.name().to_string()));
    } else {
        make_unique(&mut columns, &mut taken);
    }

    Ok(DataFrame::new(columns)?)
}

fn keep_rows(df: &DataFrame, rows: &[usize], keep: &[bool]) -> PolarsResult<(DataFrame, Vec<usize>)> {
    let mask = BooleanChunked::from_slice("keep".into(), keep);
    let filtered = df.filter(&mask)?;
    let rows = rows
        .iter()
        .zip(keep)
        .filter(|(_, k)| **k)
        .map(|(r, _)| *r)
        .collect();
    Ok((filtered, rows))
}

fn nulls_per_row(df: &DataFrame) -> Vec<usize> {
    let mut counts = vec![0usize; df.height()];
    for column in df.get_columns() {
        let nulls = column.as_materialized_series().is_null();
        for (count, is_null) in counts.iter_mut().zip(&nulls) {
            if is_null.unwrap_or(false) {
                *count += 1;
            }
        }
    }
    counts
}

fn row_ops(
    df: DataFrame,
    rows: Vec<usize>,
    options: &CleaningOptions,
) -> Result<(DataFrame, Vec<usize>)> {
    let (mut df, mut rows) = (df, rows);

    if options.drop_na_rows || options.drop_na_threshold.is_some() {
        let width = df.width() as f64;
        let keep: Vec<bool> = match options.drop_na_threshold {
            Some(threshold) if !options.drop_na_rows => nulls_per_row(&df)
                .into_iter()
                .map(|n| n as f64 / width * 100.0 <= threshold)
                .collect(),
            _ => nulls_per_row(&df).into_iter().map(|n| n == 0).collect(),
        };
        (df, rows) = keep_rows(&df, &rows, &keep)?;
    }

    if options.drop_duplicate_rows {
        let cells = df
            .get_columns()
            .iter()
            .map(column_cells)
            .collect::<PolarsResult<Vec<_>>>()?;
        let mut seen = HashSet::new();
        let keep: Vec<bool> = (0..df.height())
            .map(|row| {
                let key = cells
                    .iter()
                    .map(|column| column.get(row).map(Cell::key).unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join("\u{1f}");
                seen.insert(key)
            })
            .collect();
        (df, rows) = keep_rows(&df, &rows, &keep)?;
    }

    Ok((df, rows))
}

fn numeric_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| c.dtype().is_primitive_numeric())
        .map(|c| c.name().to_string())
        .collect()
}

/// Outlier removal, null filling and normalization run column by column, so
/// each column's statistics see the rows earlier columns already dropped.
/// Conversion then applies to every numeric column.
fn numeric_ops(
    df: DataFrame,
    rows: Vec<usize>,
    options: &CleaningOptions,
    warnings: &mut Vec<CleanError>,
) -> Result<(DataFrame, Vec<usize>)> {
    let (mut df, mut rows) = (df, rows);
    let names = numeric_names(&df);

    for name in &names {
        if options.handle_outliers {
            match outlier_mask(&df, name, options.z_score_threshold) {
                Ok(Some(keep)) => {
                    (df, rows) = keep_rows(&df, &rows, &keep)?;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(column = %name, error = %e, "Outlier check skipped");
                    warnings.push(CleanError::conversion(name, "outlier removal", e));
                }
            }
        }

        if options.fill_numeric_na {
            df = apply_column_step(df, name, "null filling", warnings, |frame| {
                fill_nulls(frame, name, options.fill_method)
            });
        }

        if options.normalize_numeric {
            df = apply_column_step(df, name, "normalization", warnings, |frame| {
                min_max(frame, name)
            });
        }
    }

    if options.numeric_conversion != NumericConversion::None {
        let stage = format!("conversion to {}", options.numeric_conversion.as_str());
        for name in &names {
            df = apply_column_step(df, name, &stage, warnings, |frame| {
                convert(frame, name, options.numeric_conversion)
            });
        }
    }

    Ok((df, rows))
}

/// Rows to keep after z-score outlier removal, `None` for a zero-variance column.
fn outlier_mask(df: &DataFrame, name: &str, threshold: f64) -> PolarsResult<Option<Vec<bool>>> {
    let values = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let ca = values.f64()?;
    let (Some(mean), Some(std)) = (ca.mean(), ca.std(1)) else {
        return Ok(None);
    };
    if !std.is_finite() || std <= 0.0 {
        return Ok(None);
    }
    Ok(Some(
        ca.into_iter()
            .map(|v| v.is_none_or(|x| ((x - mean) / std).abs() <= threshold))
            .collect(),
    ))
}

fn fill_nulls(df: &DataFrame, name: &str, method: FillMethod) -> PolarsResult<DataFrame> {
    let column = df.column(name)?;
    if column.null_count() == 0 {
        return Ok(df.clone());
    }

    let expr = match method {
        FillMethod::Mean => col(name).fill_null(col(name).mean()),
        FillMethod::Median => col(name).fill_null(col(name).median()),
        FillMethod::Zero => col(name).fill_null(lit(0)),
        FillMethod::Forward | FillMethod::Backward => {
            let strategy = if method == FillMethod::Forward {
                FillNullStrategy::Forward(None)
            } else {
                FillNullStrategy::Backward(None)
            };
            let filled = column.as_materialized_series().fill_null(strategy)?;
            return with_series(df, filled);
        }
    };
    df.clone().lazy().with_column(expr.alias(name)).collect()
}

/// Scale to [0, 1]. Columns without variance are returned unchanged.
fn min_max(df: &DataFrame, name: &str) -> PolarsResult<DataFrame> {
    let values = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    match values.f64()?.std(1) {
        Some(std) if std.is_finite() && std > 0.0 => {}
        _ => return Ok(df.clone()),
    }

    let x = col(name).cast(DataType::Float64);
    let scaled = (x.clone() - x.clone().min()) / (x.clone().max() - x.min());
    df.clone().lazy().with_column(scaled.alias(name)).collect()
}

fn convert(df: &DataFrame, name: &str, conversion: NumericConversion) -> PolarsResult<DataFrame> {
    let series = df.column(name)?.as_materialized_series();
    let converted = match conversion {
        NumericConversion::None => return Ok(df.clone()),
        NumericConversion::IntToFloat => series.cast(&DataType::Float64)?,
        NumericConversion::FloatToInt => {
            if !series.dtype().is_float() {
                return Ok(df.clone());
            }
            if series.null_count() > 0 {
                return Err(PolarsError::ComputeError(
                    "missing values cannot be converted to integers".into(),
                ));
            }
            series.strict_cast(&DataType::Int64)?
        }
        NumericConversion::NumericToString => series.cast(&DataType::String)?,
    };
    with_series(df, converted)
}

fn replace_values(
    df: DataFrame,
    options: &CleaningOptions,
    warnings: &mut Vec<CleanError>,
) -> DataFrame {
    let mut df = df;

    for (name, map) in &options.replace_values {
        if df.column(name).is_err() {
            warnings.push(CleanError::conversion(
                name,
                "value replacement",
                "column not found",
            ));
            continue;
        }
        df = apply_column_step(df, name, "value replacement", warnings, |frame| {
            replace_in_column(frame, name, map)
        });
    }

    if !options.replace_all_values.is_empty() {
        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        for name in &names {
            df = apply_column_step(df, name, "value replacement", warnings, |frame| {
                replace_in_column(frame, name, &options.replace_all_values)
            });
        }
    }

    df
}

/// Whether a cell equals a replacement key. Keys are strings; numeric and date
/// cells compare against the parsed key.
fn matches_key(cell: &Cell, key: &str) -> bool {
    match cell {
        Cell::Null => false,
        Cell::Text(s) => s == key,
        Cell::Bool(b) => key.eq_ignore_ascii_case(if *b { "true" } else { "false" }),
        Cell::Int(_) | Cell::Float(_) => key.trim().parse::<f64>().ok() == cell.as_f64(),
        Cell::Date(d) => parse_datetime(key) == Some(*d),
    }
}

fn replace_in_column(
    df: &DataFrame,
    name: &str,
    map: &BTreeMap<String, Value>,
) -> PolarsResult<DataFrame> {
    let cells = column_cells(df.column(name)?)?;
    let mut changed = false;
    let replaced: Vec<Cell> = cells
        .into_iter()
        .map(|cell| match map.iter().find(|(key, _)| matches_key(&cell, key)) {
            Some((_, new)) => {
                changed = true;
                Cell::from_json(new)
            }
            None => cell,
        })
        .collect();

    if !changed {
        return Ok(df.clone());
    }
    with_series(df, cells_to_series(name.into(), &replaced)?)
}

/// Put the excluded columns back. Processed columns are re-aligned to the
/// original rows, with nulls where rows were dropped.
fn reattach(
    work: DataFrame,
    rows: &[usize],
    excluded: Vec<Column>,
    height: usize,
) -> Result<DataFrame> {
    if excluded.is_empty() {
        return Ok(work);
    }
    if work.width() == 0 {
        return Ok(DataFrame::new(excluded)?);
    }

    let work = if rows.len() == height {
        work
    } else {
        expand_rows(&work, rows, height)?
    };

    let mut taken: HashSet<String> = excluded.iter().map(|c| c.name().to_string()).collect();
    let mut columns = work.take_columns();
    make_unique(&mut columns, &mut taken);
    columns.extend(excluded);
    Ok(DataFrame::new(columns)?)
}

fn expand_rows(df: &DataFrame, rows: &[usize], height: usize) -> PolarsResult<DataFrame> {
    let columns = df
        .get_columns()
        .iter()
        .map(|column| {
            let mut full = vec![Cell::Null; height];
            for (cell, row) in column_cells(column)?.into_iter().zip(rows) {
                if let Some(slot) = full.get_mut(*row) {
                    *slot = cell;
                }
            }
            cells_to_series(column.name().clone(), &full).map(Column::from)
        })
        .collect::<PolarsResult<Vec<_>>>()?;
    DataFrame::new(columns)
}
