use polars::prelude::*;
use std::fmt::Write as _;

/// Plain-text report of a command's result: a preview, summary statistics,
/// types, gaps and cardinality.
pub fn report_command(frame: &DataFrame, row_count: usize) -> String {
    let mut report = String::from("\nCommand results:\n");

    if frame.height() == 0 {
        report.push_str("No rows match the given criteria.\n");
        return report;
    }

    let _ = writeln!(report, "First five rows:\n{}", frame.head(Some(5)));
    let _ = writeln!(report, "Total number of rows: {row_count}\n");
    report.push_str(&summary_statistics(frame));

    report.push_str("Data types:\n");
    for column in frame.get_columns() {
        let _ = writeln!(report, "{}: {}", column.name(), column.dtype());
    }

    report.push_str("\nMissing values per column:\n");
    for column in frame.get_columns() {
        let _ = writeln!(report, "{}: {}", column.name(), column.null_count());
    }

    report.push_str("\nUnique values per column:\n");
    for column in frame.get_columns() {
        match column.as_materialized_series().n_unique() {
            Ok(unique) => {
                let _ = writeln!(report, "{}: {unique} unique values", column.name());
            }
            Err(e) => {
                let _ = writeln!(report, "{}: unavailable ({e})", column.name());
            }
        }
    }

    report
}

fn fmt_stat(value: Option<f64>) -> String {
    value.map_or_else(|| "NaN".to_owned(), |v| format!("{v:.4}"))
}

/// Count, mean, sample std, min and max of every numeric column.
fn summary_statistics(frame: &DataFrame) -> String {
    let mut section = String::from("Summary statistics:\n");
    let _ = writeln!(
        section,
        "{:<20} {:>8} {:>14} {:>14} {:>14} {:>14}",
        "column", "count", "mean", "std", "min", "max"
    );

    let numeric = frame
        .get_columns()
        .iter()
        .filter(|c| c.dtype().is_primitive_numeric());
    for column in numeric {
        let stats = column
            .as_materialized_series()
            .cast(&DataType::Float64)
            .and_then(|s| {
                let ca = s.f64()?;
                Ok((
                    ca.len() - ca.null_count(),
                    ca.mean(),
                    ca.std(1),
                    ca.min(),
                    ca.max(),
                ))
            });
        match stats {
            Ok((count, mean, std, min, max)) => {
                let _ = writeln!(
                    section,
                    "{:<20} {:>8} {:>14} {:>14} {:>14} {:>14}",
                    column.name().as_str(),
                    count,
                    fmt_stat(mean),
                    fmt_stat(std),
                    fmt_stat(min),
                    fmt_stat(max)
                );
            }
            Err(e) => {
                let _ = writeln!(section, "{}: unavailable ({e})", column.name());
            }
        }
    }
    section.push('\n');
    section
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_sections() -> PolarsResult<()> {
        let df = df!(
            "id" => [1i64, 2, 3, 3],
            "name" => [Some("a"), None, Some("c"), Some("c")]
        )?;
        let report = report_command(&df, 4);
        assert!(report.contains("Total number of rows: 4"));
        assert!(report.contains("name: 1\n"));
        assert!(report.contains("id: 3 unique values"));
        assert!(report.contains("Data types:\nid: i64"));
        Ok(())
    }

    #[test]
    fn test_summary_statistics_cover_numeric_columns() -> PolarsResult<()> {
        let df = df!(
            "amount" => [Some(2.0), Some(4.0), None, Some(6.0)],
            "label" => ["a", "b", "c", "d"]
        )?;
        let report = report_command(&df, 4);
        assert!(report.contains("Summary statistics:"));

        let line = report
            .lines()
            .find(|l| l.starts_with("amount "))
            .unwrap_or_default();
        let fields: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(
            fields,
            vec!["amount", "3", "4.0000", "2.0000", "2.0000", "6.0000"]
        );
        assert!(!report.lines().any(|l| l.starts_with("label ")));
        Ok(())
    }

    #[test]
    fn test_empty_result() {
        let report = report_command(&DataFrame::empty(), 0);
        assert!(report.contains("No rows match"));
    }
}
