use std::path::Path;

use polars::prelude::*;
use tracing::{error, info, warn};

use crate::error::{PipelineError, Result};
use crate::frame;
use crate::manifest::{Manifest, MetricEntry};
use crate::store;

const NA: &str = "NA";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricStatus {
    Ok,
    Skipped,
    Failed,
}

impl MetricStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricStatus::Ok => "ok",
            MetricStatus::Skipped => "skipped",
            MetricStatus::Failed => "failed",
        }
    }
}

#[derive(Debug)]
pub struct MetricOutcome {
    pub title: String,
    pub status: MetricStatus,
    pub detail: String,
}

#[derive(Debug, Default)]
pub struct MetricsReport {
    pub outcomes: Vec<MetricOutcome>,
}

impl MetricsReport {
    pub fn count(&self, status: MetricStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == status)
            .count()
    }

    fn push(&mut self, title: &str, status: MetricStatus, detail: impl Into<String>) {
        self.outcomes.push(MetricOutcome {
            title: title.to_string(),
            status,
            detail: detail.into(),
        });
    }
}

struct MetricValues {
    last: String,
    previous: String,
    change: String,
}

/// Evaluates every `[[metric]]` against its artifact and writes the tile
/// table to `metrics.csv`. Metrics whose artifact or column is absent are
/// skipped with a warning; the batch always writes what it has.
pub fn update_metrics(manifest: &Manifest, assets_dir: &Path) -> Result<MetricsReport> {
    store::ensure_assets_dir(assets_dir)?;
    let stamp = store::retrieval_stamp();
    let mut report = MetricsReport::default();

    let mut titles = Vec::new();
    let mut subtitles = Vec::new();
    let mut last_values = Vec::new();
    let mut previous_values = Vec::new();
    let mut changes = Vec::new();
    let mut units = Vec::new();
    let mut sources = Vec::new();
    let mut source_links = Vec::new();
    for metric in &manifest.metrics {
        match evaluate_metric(metric, assets_dir) {
            Ok(values) => {
                info!(metric = %metric.title, last = %values.last, "metric evaluated");
                report.push(
                    &metric.title,
                    MetricStatus::Ok,
                    format!("last {}", values.last),
                );
                titles.push(metric.title.clone());
                subtitles.push(metric.subtitle.clone());
                last_values.push(values.last);
                previous_values.push(values.previous);
                changes.push(values.change);
                units.push(metric.unit.clone());
                sources.push(metric.source.clone());
                source_links.push(metric.source_link.clone());
            }
            Err(PipelineError::MissingArtifact(path)) => {
                warn!(metric = %metric.title, artifact = %path, "artifact missing, skipping metric");
                report.push(
                    &metric.title,
                    MetricStatus::Skipped,
                    format!("missing {path}"),
                );
            }
            Err(PipelineError::Validation(message)) => {
                warn!(metric = %metric.title, reason = %message, "skipping metric");
                report.push(&metric.title, MetricStatus::Skipped, message);
            }
            Err(err) => {
                error!(metric = %metric.title, error = %err, "metric evaluation failed");
                report.push(&metric.title, MetricStatus::Failed, err.to_string());
            }
        }
    }

    let height = titles.len();
    let columns: Vec<Column> = vec![
        Series::new("Title".into(), titles).into(),
        Series::new("Subtitle".into(), subtitles).into(),
        Series::new("Last value".into(), last_values).into(),
        Series::new("Previous value".into(), previous_values).into(),
        Series::new("Change".into(), changes).into(),
        Series::new("Unit".into(), units).into(),
        Series::new("Source".into(), sources).into(),
        Series::new("Source link".into(), source_links).into(),
        Series::new("Last updated".into(), vec![stamp; height]).into(),
    ];
    let mut df = DataFrame::new(columns)?;
    store::write_csv(&assets_dir.join(store::METRICS_FILE), &mut df)?;

    Ok(report)
}

fn evaluate_metric(metric: &MetricEntry, assets_dir: &Path) -> Result<MetricValues> {
    let df = store::read_artifact(assets_dir, &metric.file)?;
    let has_column = df
        .get_column_names()
        .iter()
        .any(|name| name.as_str() == metric.value_column);
    if !has_column {
        return Err(PipelineError::Validation(format!(
            "column '{}' not found in tf_{}.csv",
            metric.value_column, metric.file
        )));
    }

    if metric.aggregate {
        aggregate_value(metric, &df)
    } else {
        series_values(metric, &df)
    }
}

/// Sum of the value column, optionally restricted to rows matching the
/// configured condition. Aggregates have no meaningful previous value.
fn aggregate_value(metric: &MetricEntry, df: &DataFrame) -> Result<MetricValues> {
    let values = frame::numeric_values(df, &metric.value_column)?;
    let total: f64 = match (&metric.condition_column, &metric.condition) {
        (Some(column), Some(condition)) => {
            let has_column = df
                .get_column_names()
                .iter()
                .any(|name| name.as_str() == *column);
            if !has_column {
                return Err(PipelineError::Validation(format!(
                    "condition column '{column}' not found in tf_{}.csv",
                    metric.file
                )));
            }
            let keys = frame::text_values(df, column)?;
            values
                .iter()
                .zip(&keys)
                .filter(|(_, key)| {
                    key.as_deref().map(str::trim) == Some(condition.trim())
                })
                .filter_map(|(value, _)| *value)
                .sum()
        }
        _ => values.into_iter().flatten().sum(),
    };

    Ok(MetricValues {
        last: format_metric_number(total),
        previous: NA.to_string(),
        change: NA.to_string(),
    })
}

/// Latest and second-latest readings of a time series column. A series with
/// a single reading reports no previous value or change.
fn series_values(metric: &MetricEntry, df: &DataFrame) -> Result<MetricValues> {
    let values = frame::numeric_values(df, &metric.value_column)?;
    let present: Vec<f64> = values.into_iter().flatten().collect();
    let Some(last) = present.last().copied() else {
        return Err(PipelineError::Validation(format!(
            "column '{}' in tf_{}.csv holds no values",
            metric.value_column, metric.file
        )));
    };

    if present.len() < 2 {
        return Ok(MetricValues {
            last: format_metric_number(last),
            previous: NA.to_string(),
            change: NA.to_string(),
        });
    }
    let previous = present[present.len() - 2];
    Ok(MetricValues {
        last: format_metric_number(last),
        previous: format_metric_number(previous),
        change: format_metric_number(last - previous),
    })
}

fn format_metric_number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    rounded.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse_manifest;

    fn write_humanitarian(assets_dir: &Path) {
        let columns: Vec<Column> = vec![
            Series::new(
                "Refugees".into(),
                vec![Some("6200000".to_string()), Some("6250000".to_string()), None],
            )
            .into(),
            Series::new(
                "Date".into(),
                vec![Some("2025-06-01"), Some("2025-07-01"), Some("2025-08-01")],
            )
            .into(),
        ];
        let mut df = DataFrame::new(columns).expect("frame");
        store::write_artifact(assets_dir, "humanitarian", &mut df).expect("write failed");
    }

    fn write_reserves(assets_dir: &Path) {
        let columns: Vec<Column> = vec![
            Series::new("Item".into(), vec!["Total", "FX", "Gold"]).into(),
            Series::new("Value".into(), vec![44.0f64, 37.0, 5.0]).into(),
            Series::new("Total".into(), vec![true, false, false]).into(),
        ];
        let mut df = DataFrame::new(columns).expect("frame");
        store::write_artifact(assets_dir, "international_reserves", &mut df)
            .expect("write failed");
    }

    #[test]
    fn series_metric_reports_last_previous_and_change() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_humanitarian(dir.path());

        let manifest = parse_manifest(
            r#"
            [[metric]]
            title = "Refugees"
            file = "humanitarian"
            value_column = "Refugees"
            unit = "mn"
        "#,
        )
        .expect("manifest");

        let report = update_metrics(&manifest, dir.path()).expect("metrics failed");
        assert_eq!(report.count(MetricStatus::Ok), 1);

        let written = store::read_csv_untyped(&dir.path().join(store::METRICS_FILE))
            .expect("metrics.csv unreadable");
        assert_eq!(
            written.get_column_names(),
            [
                "Title",
                "Subtitle",
                "Last value",
                "Previous value",
                "Change",
                "Unit",
                "Source",
                "Source link",
                "Last updated",
            ]
        );
        let last = written.column("Last value").unwrap().str().unwrap();
        assert_eq!(last.get(0), Some("6250000"));
        let change = written.column("Change").unwrap().str().unwrap();
        assert_eq!(change.get(0), Some("50000"));
    }

    #[test]
    fn aggregate_metric_sums_matching_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_reserves(dir.path());

        let manifest = parse_manifest(
            r#"
            [[metric]]
            title = "Official reserves"
            file = "international_reserves"
            value_column = "Value"
            aggregate = true
            condition_column = "Total"
            condition = "true"
        "#,
        )
        .expect("manifest");

        let report = update_metrics(&manifest, dir.path()).expect("metrics failed");
        assert_eq!(report.count(MetricStatus::Ok), 1);

        let written = store::read_csv_untyped(&dir.path().join(store::METRICS_FILE))
            .expect("metrics.csv unreadable");
        let last = written.column("Last value").unwrap().str().unwrap();
        assert_eq!(last.get(0), Some("44"));
        let previous = written.column("Previous value").unwrap().str().unwrap();
        assert_eq!(previous.get(0), Some("NA"));
    }

    #[test]
    fn missing_artifact_skips_the_metric() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_humanitarian(dir.path());

        let manifest = parse_manifest(
            r#"
            [[metric]]
            title = "Refugees"
            file = "humanitarian"
            value_column = "Refugees"

            [[metric]]
            title = "Grain"
            file = "grain_destinations"
            value_column = "Tons received"
            aggregate = true
        "#,
        )
        .expect("manifest");

        let report = update_metrics(&manifest, dir.path()).expect("metrics failed");
        assert_eq!(report.count(MetricStatus::Ok), 1);
        assert_eq!(report.count(MetricStatus::Skipped), 1);

        let written = store::read_csv_untyped(&dir.path().join(store::METRICS_FILE))
            .expect("metrics.csv unreadable");
        assert_eq!(written.height(), 1);
    }

    #[test]
    fn missing_value_column_skips_the_metric() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_humanitarian(dir.path());

        let manifest = parse_manifest(
            r#"
            [[metric]]
            title = "Refugees"
            file = "humanitarian"
            value_column = "Nonexistent"
        "#,
        )
        .expect("manifest");

        let report = update_metrics(&manifest, dir.path()).expect("metrics failed");
        assert_eq!(report.count(MetricStatus::Skipped), 1);
        assert!(report.outcomes[0].detail.contains("Nonexistent"));
    }

    #[test]
    fn rounding_keeps_two_decimals() {
        assert_eq!(format_metric_number(199.76693), "199.77");
        assert_eq!(format_metric_number(44.0), "44");
        assert_eq!(format_metric_number(-0.125), "-0.13");
    }
}
