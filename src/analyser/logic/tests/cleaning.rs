use crate::analyser::logic::*;
use crate::error::CleanError;
use anyhow::Result;
use polars::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;

fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .collect())
}

fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    Ok(df
        .column(name)?
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_owned))
        .collect())
}

fn names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().into_iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_standardize_name_is_idempotent() {
    for raw in ["Order ID", "  total--Amount ($) ", "already_clean", "%%%", "Ünïcode Näme"] {
        let once = standardize_name(raw);
        assert_eq!(standardize_name(&once), once, "not idempotent for {raw:?}");
    }
    assert_eq!(standardize_name("Order ID"), "order_id");
    assert_eq!(standardize_name("  total--Amount ($) "), "total_amount");
    assert_eq!(standardize_name("%%%"), "unnamed");
}

#[test]
fn test_standardized_collisions_are_dropped_or_suffixed() -> Result<()> {
    let df = df!(
        "Order ID" => [1i64, 2],
        "order_id" => [3i64, 4]
    )?;

    let keep_first = CleaningOptions {
        standardize_columns: true,
        drop_duplicate_columns: true,
        ..Default::default()
    };
    let out = clean(&df, &keep_first)?.frame;
    assert_eq!(names(&out), vec!["order_id"]);
    assert_eq!(f64_values(&out, "order_id")?, vec![Some(1.0), Some(2.0)]);

    let suffix = CleaningOptions {
        standardize_columns: true,
        ..Default::default()
    };
    let out = clean(&df, &suffix)?.frame;
    assert_eq!(names(&out), vec!["order_id", "order_id_2"]);
    Ok(())
}

#[test]
fn test_drop_empty_columns() -> Result<()> {
    let df = df!(
        "a" => [Some(1i64), None],
        "blank" => [None::<i64>, None]
    )?;
    let options = CleaningOptions {
        drop_empty_columns: true,
        ..Default::default()
    };
    assert_eq!(names(&clean(&df, &options)?.frame), vec!["a"]);
    Ok(())
}

#[test]
fn test_drop_duplicate_rows_removes_exactly_one() -> Result<()> {
    let df = df!(
        "id" => [1i64, 2, 2, 3],
        "name" => ["a", "b", "b", "c"]
    )?;
    let options = CleaningOptions {
        drop_duplicate_rows: true,
        ..Default::default()
    };
    let out = clean(&df, &options)?.frame;
    assert_eq!(out.height(), df.height() - 1);
    Ok(())
}

#[test]
fn test_na_threshold_and_any_na() -> Result<()> {
    let df = df!(
        "a" => [Some(1i64), None, None],
        "b" => [Some(1i64), Some(2), None],
        "c" => [Some(1i64), Some(2), None],
        "d" => [Some(1i64), Some(2), Some(3)]
    )?;

    let threshold = CleaningOptions {
        drop_na_threshold: Some(50.0),
        ..Default::default()
    };
    // Row 2 is 75% missing, row 1 is 25% missing.
    assert_eq!(clean(&df, &threshold)?.frame.height(), 2);

    let any = CleaningOptions {
        drop_na_rows: true,
        drop_na_threshold: Some(50.0),
        ..Default::default()
    };
    assert_eq!(clean(&df, &any)?.frame.height(), 1);
    Ok(())
}

#[test]
fn test_fill_zero_touches_only_nulls() -> Result<()> {
    let df = df!(
        "amount" => [Some(1.5), None, Some(-2.0), None],
        "label" => [Some("x"), None, Some("y"), Some("z")]
    )?;
    let options = CleaningOptions {
        fill_numeric_na: true,
        fill_method: FillMethod::Zero,
        ..Default::default()
    };
    let out = clean(&df, &options)?.frame;
    assert_eq!(
        f64_values(&out, "amount")?,
        vec![Some(1.5), Some(0.0), Some(-2.0), Some(0.0)]
    );
    assert_eq!(out.column("label")?.null_count(), 1);
    Ok(())
}

#[test]
fn test_fill_mean_median_and_forward() -> Result<()> {
    let df = df!("v" => [Some(1.0), None, Some(3.0), Some(8.0)])?;

    let mean = CleaningOptions {
        fill_numeric_na: true,
        fill_method: FillMethod::Mean,
        ..Default::default()
    };
    assert_eq!(f64_values(&clean(&df, &mean)?.frame, "v")?[1], Some(4.0));

    let median = CleaningOptions {
        fill_method: FillMethod::Median,
        ..mean.clone()
    };
    assert_eq!(f64_values(&clean(&df, &median)?.frame, "v")?[1], Some(3.0));

    let forward = CleaningOptions {
        fill_method: FillMethod::Forward,
        ..mean
    };
    assert_eq!(f64_values(&clean(&df, &forward)?.frame, "v")?[1], Some(1.0));
    Ok(())
}

#[test]
fn test_outliers_removed_and_constant_columns_exempt() -> Result<()> {
    let mut values = vec![10.0; 10];
    values.push(1000.0);
    let df = df!(
        "v" => values,
        "flat" => vec![7i64; 11]
    )?;
    let options = CleaningOptions {
        handle_outliers: true,
        z_score_threshold: 2.0,
        ..Default::default()
    };
    let out = clean(&df, &options)?.frame;
    assert_eq!(out.height(), 10);
    assert!(f64_values(&out, "v")?.iter().all(|v| *v == Some(10.0)));
    Ok(())
}

#[test]
fn test_min_max_normalization() -> Result<()> {
    let df = df!(
        "v" => [1i64, 2, 3],
        "flat" => [5.0, 5.0, 5.0]
    )?;
    let options = CleaningOptions {
        normalize_numeric: true,
        ..Default::default()
    };
    let out = clean(&df, &options)?.frame;
    assert_eq!(f64_values(&out, "v")?, vec![Some(0.0), Some(0.5), Some(1.0)]);
    assert_eq!(f64_values(&out, "flat")?, vec![Some(5.0); 3]);
    Ok(())
}

#[test]
fn test_float_to_int_failure_keeps_column() -> Result<()> {
    let df = df!(
        "gappy" => [Some(1.7), None],
        "whole" => [Some(2.2), Some(3.9)]
    )?;
    let options = CleaningOptions {
        numeric_conversion: NumericConversion::FloatToInt,
        ..Default::default()
    };
    let outcome = clean(&df, &options)?;

    assert_eq!(outcome.frame.column("gappy")?.dtype(), &DataType::Float64);
    assert_eq!(outcome.frame.column("whole")?.dtype(), &DataType::Int64);
    assert_eq!(outcome.warnings.len(), 1);
    let CleanError::ConversionFailure { column, .. } = &outcome.warnings[0];
    assert_eq!(column, "gappy");
    Ok(())
}

#[test]
fn test_text_normalization_keeps_nulls() -> Result<()> {
    let df = df!("comment" => [Some("The  Crème BRÛLÉE!"), None])?;
    let options = CleaningOptions {
        remove_accents: true,
        to_lowercase: true,
        remove_special_chars: true,
        remove_stopwords: true,
        ..Default::default()
    };
    let out = clean(&df, &options)?.frame;
    assert_eq!(
        str_values(&out, "comment")?,
        vec![Some("creme brulee".to_owned()), None]
    );
    Ok(())
}

#[test]
fn test_value_replacement_column_then_global() -> Result<()> {
    let df = df!(
        "status" => ["N/A", "open", "closed"],
        "code" => [1i64, 2, 1]
    )?;
    let mut per_column = BTreeMap::new();
    per_column.insert(
        "status".to_owned(),
        BTreeMap::from([("open".to_owned(), json!("active"))]),
    );
    let options = CleaningOptions {
        replace_values: per_column,
        replace_all_values: BTreeMap::from([
            ("N/A".to_owned(), json!(null)),
            ("1".to_owned(), json!(100)),
        ]),
        ..Default::default()
    };
    let out = clean(&df, &options)?.frame;
    assert_eq!(
        str_values(&out, "status")?,
        vec![None, Some("active".to_owned()), Some("closed".to_owned())]
    );
    assert_eq!(
        f64_values(&out, "code")?,
        vec![Some(100.0), Some(2.0), Some(100.0)]
    );
    Ok(())
}

#[test]
fn test_excluded_columns_are_bit_identical() -> Result<()> {
    let df = df!(
        "Raw Notes" => [Some("Keep ME!"), None, Some("Keep ME!"), Some("x")],
        "amount" => [Some(1.0), None, Some(1.0), Some(500.0)],
        "Label" => [Some("A"), Some("B"), Some("A"), None]
    )?;
    let options = CleaningOptions {
        standardize_columns: true,
        drop_duplicate_columns: true,
        drop_na_rows: true,
        drop_duplicate_rows: true,
        fill_numeric_na: true,
        normalize_numeric: true,
        numeric_conversion: NumericConversion::NumericToString,
        clean_text: true,
        to_lowercase: true,
        remove_special_chars: true,
        replace_all_values: BTreeMap::from([("Keep ME!".to_owned(), json!("changed"))]),
        excluded_columns: vec!["Raw Notes".to_owned()],
        ..CleaningOptions::recommended()
    };
    let out = clean(&df, &options)?.frame;

    let before = df.column("Raw Notes")?.as_materialized_series();
    let after = out.column("Raw Notes")?.as_materialized_series();
    assert!(before.equals_missing(after));
    assert_eq!(out.height(), df.height());
    Ok(())
}

#[test]
fn test_noop_options_leave_frame_unchanged() -> Result<()> {
    let df = df!(
        "a" => [Some(1i64), None],
        "b" => ["x", "y"]
    )?;
    let options = CleaningOptions::default();
    assert!(options.is_noop());
    assert!(clean(&df, &options)?.frame.equals_missing(&df));
    Ok(())
}

#[test]
fn test_original_option_names_deserialize() -> Result<()> {
    let options: CleaningOptions = serde_json::from_value(json!({
        "numeric_conversion": "Float to Int",
        "fill_method": "ffill",
        "drop_na_threshold": 30
    }))?;
    assert_eq!(options.numeric_conversion, NumericConversion::FloatToInt);
    assert_eq!(options.fill_method, FillMethod::Forward);
    assert_eq!(options.drop_na_threshold, Some(30.0));
    assert!((options.z_score_threshold - 3.0).abs() < f64::EPSILON);
    Ok(())
}

#[test]
fn test_hyphenated_fill_methods_deserialize() -> Result<()> {
    let forward: CleaningOptions = serde_json::from_value(json!({"fill_method": "forward-fill"}))?;
    assert_eq!(forward.fill_method, FillMethod::Forward);
    let backward: CleaningOptions = serde_json::from_value(json!({"fill_method": "backward-fill"}))?;
    assert_eq!(backward.fill_method, FillMethod::Backward);
    Ok(())
}

#[test]
fn test_numeric_steps_run_column_by_column() -> Result<()> {
    // `a` is filled before `b` drops its outlier row, so the mean still sees a[5]
    let a: Vec<Option<f64>> = (0..20)
        .map(|i| match i {
            1 => None,
            5 => Some(2.0),
            i if i % 2 == 0 => Some(0.0),
            _ => Some(1.0),
        })
        .collect();
    let b: Vec<f64> = (0..20).map(|i| if i == 5 { 1000.0 } else { 10.0 }).collect();
    let df = df!("a" => a, "b" => b)?;

    let options = CleaningOptions {
        handle_outliers: true,
        fill_numeric_na: true,
        fill_method: FillMethod::Mean,
        ..Default::default()
    };
    let out = clean(&df, &options)?.frame;

    assert_eq!(out.height(), 19);
    let filled = f64_values(&out, "a")?[1].unwrap_or(f64::NAN);
    assert!((filled - 10.0 / 19.0).abs() < 1e-9, "filled with {filled}");
    assert!(f64_values(&out, "b")?.iter().all(|v| *v == Some(10.0)));
    Ok(())
}

#[test]
fn test_excluded_columns_survive_every_reshaping_option() -> Result<()> {
    let keep: Vec<Option<&str>> = vec![
        Some("x"), None, Some("Y!"), Some("z z"), Some("Ünï"), Some("x"),
        Some("7"), Some("eight"), None, Some("NINE"), Some("ten"),
    ];
    let mut amount = vec![Some(10.0); 11];
    amount[9] = Some(1000.0);
    amount[10] = None;
    let tags = ["a", "a", "c", "d", "e", "f", "g", "h", "i", "j", "k"];
    let df = df!(
        "Amount" => amount,
        "Tag Name" => tags,
        "Keep Me" => keep
    )?;

    // (options, processed tag column name after cleaning, row the options drop)
    let cases = vec![
        (
            CleaningOptions {
                drop_duplicate_rows: true,
                ..Default::default()
            },
            "Tag Name",
            Some(1),
        ),
        (
            CleaningOptions {
                drop_na_rows: true,
                ..Default::default()
            },
            "Tag Name",
            Some(10),
        ),
        (
            CleaningOptions {
                handle_outliers: true,
                z_score_threshold: 2.0,
                ..Default::default()
            },
            "Tag Name",
            Some(9),
        ),
        (
            CleaningOptions {
                standardize_columns: true,
                drop_duplicate_columns: true,
                ..Default::default()
            },
            "tag_name",
            None,
        ),
        (
            CleaningOptions {
                standardize_columns: true,
                drop_duplicate_rows: true,
                drop_na_rows: true,
                to_lowercase: true,
                remove_special_chars: true,
                replace_all_values: BTreeMap::from([("x".to_owned(), json!("changed"))]),
                ..Default::default()
            },
            "tag_name",
            Some(1),
        ),
    ];

    let before = df.column("Keep Me")?.as_materialized_series().clone();
    for (mut options, tag_column, dropped) in cases {
        options.excluded_columns = vec!["Keep Me".to_owned()];
        let out = clean(&df, &options)?.frame;

        assert_eq!(out.height(), df.height(), "{options:?}");
        assert_eq!(names(&out).last().map(String::as_str), Some("Keep Me"));
        let after = out.column("Keep Me")?.as_materialized_series();
        assert!(before.equals_missing(after), "{options:?}");

        let tags_after = str_values(&out, tag_column)?;
        for (row, tag) in tags_after.iter().enumerate() {
            if Some(row) == dropped || (dropped == Some(1) && row == 10 && options.drop_na_rows) {
                assert_eq!(tag, &None, "row {row} should be dropped for {options:?}");
            } else {
                assert!(tag.is_some(), "row {row} should be kept for {options:?}");
            }
        }
    }
    Ok(())
}
