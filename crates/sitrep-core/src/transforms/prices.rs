use polars::prelude::*;

use crate::error::{PipelineError, Result};
use crate::frame;
use crate::manifest::RowLabel;

use super::{Transform, TransformContext};

/// Builds both inflation artifacts from the headline CPI sheet: the latest
/// month by component and the year-over-year series for the last twelve
/// reported months.
pub struct ConsumerPrices;

impl Transform for ConsumerPrices {
    fn name(&self) -> &'static str {
        "cpi"
    }

    fn source(&self) -> &'static str {
        "cpi"
    }

    fn artifacts(&self) -> &'static [&'static str] {
        &["cpi_last", "cpi_12m"]
    }

    fn run(&self, ctx: &TransformContext<'_>) -> Result<()> {
        let df = ctx.read_source(self.source())?;
        let labels = ctx.row_labels(self.source());
        if labels.is_empty() {
            return Err(PipelineError::Validation(
                "source 'cpi' has no row labels configured".to_string(),
            ));
        }

        let mut last = cpi_last_frame(&df, labels)?;
        ctx.write_artifact("cpi_last", &mut last)?;

        let mut yoy = cpi_12m_frame(&df, labels)?;
        ctx.write_artifact("cpi_12m", &mut yoy)
    }
}

fn period_columns(df: &DataFrame) -> Result<Vec<String>> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    if names.len() < 3 {
        return Err(PipelineError::Validation(
            "CPI snapshot is too narrow to hold period columns".to_string(),
        ));
    }
    Ok(names[1..]
        .iter()
        .filter(|name| *name != "retrieved")
        .cloned()
        .collect())
}

/// Latest month of inflation by component: `[Item, Value, Total, Retrieve
/// date, Date]`. The `Total` flag carries through so the chart can single
/// out the headline row.
pub fn cpi_last_frame(df: &DataFrame, labels: &[RowLabel]) -> Result<DataFrame> {
    let periods = period_columns(df)?;
    let active_rows: Vec<usize> = (0..df.height())
        .filter(|&row| labels.get(row).is_some_and(|label| label.active))
        .collect();
    if active_rows.is_empty() {
        return Err(PipelineError::Validation(
            "no active CPI rows matched the snapshot".to_string(),
        ));
    }

    let mut latest: Option<(String, Vec<Option<f64>>)> = None;
    for name in periods.iter().rev() {
        let values = frame::numeric_values(df, name)?;
        if active_rows.iter().any(|&row| values[row].is_some()) {
            latest = Some((name.clone(), values));
            break;
        }
    }
    let (period, values) = latest.ok_or_else(|| {
        PipelineError::Validation("CPI snapshot has no populated period column".to_string())
    })?;
    let date = frame::truncate_chars(&period, 11);
    let retrieved = frame::text_values(df, "retrieved")?;

    let mut items = Vec::new();
    let mut out_values = Vec::new();
    let mut totals = Vec::new();
    let mut stamps: Vec<Option<String>> = Vec::new();
    let mut dates = Vec::new();
    for &row in &active_rows {
        let Some(value) = values[row] else { continue };
        let label = &labels[row];
        items.push(label.item.clone());
        out_values.push(value);
        totals.push(label.total);
        stamps.push(retrieved[row].clone());
        dates.push(date.clone());
    }
    if items.is_empty() {
        return Err(PipelineError::Validation(
            "no CPI component holds a value in the latest period".to_string(),
        ));
    }

    let columns: Vec<Column> = vec![
        Series::new("Item".into(), items).into(),
        Series::new("Value".into(), out_values).into(),
        Series::new("Total".into(), totals).into(),
        Series::new("Retrieve date".into(), stamps).into(),
        Series::new("Date".into(), dates).into(),
    ];
    Ok(DataFrame::new(columns)?)
}

/// Year-over-year inflation pivoted to one row per month, at most the last
/// twelve reported months. The series is the row flagged `total` and keeps
/// that label's name as its column.
pub fn cpi_12m_frame(df: &DataFrame, labels: &[RowLabel]) -> Result<DataFrame> {
    let periods = period_columns(df)?;
    let target = labels
        .iter()
        .position(|label| label.total)
        .ok_or_else(|| {
            PipelineError::Validation("CPI labels declare no headline row".to_string())
        })?;
    if target >= df.height() {
        return Err(PipelineError::Validation(
            "CPI headline label points past the end of the snapshot".to_string(),
        ));
    }

    let mut observed: Vec<(String, f64)> = Vec::new();
    for name in &periods {
        let values = frame::numeric_values(df, name)?;
        if let Some(value) = values[target] {
            observed.push((name.clone(), value));
        }
    }
    if observed.is_empty() {
        return Err(PipelineError::Validation(
            "CPI headline row holds no values".to_string(),
        ));
    }
    let start = observed.len().saturating_sub(12);
    let window = &observed[start..];

    let retrieved = frame::text_values(df, "retrieved")?;
    let stamp = retrieved[target].clone().unwrap_or_default();

    let mut dates = Vec::with_capacity(window.len());
    let mut values = Vec::with_capacity(window.len());
    for (period, value) in window {
        dates.push(period.clone());
        values.push(*value);
    }

    let series_name = labels[target].item.as_str();
    let columns: Vec<Column> = vec![
        Series::new("Date".into(), dates).into(),
        Series::new(series_name.into(), values).into(),
        Series::new("Retrieved".into(), vec![stamp; window.len()]).into(),
    ];
    Ok(DataFrame::new(columns)?)
}
