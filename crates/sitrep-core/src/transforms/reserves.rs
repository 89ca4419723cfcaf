use polars::prelude::*;

use crate::error::{PipelineError, Result};
use crate::frame;
use crate::manifest::RowLabel;

use super::{Transform, TransformContext};

pub struct InternationalReserves;

impl Transform for InternationalReserves {
    fn name(&self) -> &'static str {
        "international_reserves"
    }

    fn source(&self) -> &'static str {
        "international_reserves"
    }

    fn artifacts(&self) -> &'static [&'static str] {
        &["international_reserves"]
    }

    fn run(&self, ctx: &TransformContext<'_>) -> Result<()> {
        let df = ctx.read_source(self.source())?;
        let labels = ctx.row_labels(self.source());
        if labels.is_empty() {
            return Err(PipelineError::Validation(
                "source 'international_reserves' has no row labels configured".to_string(),
            ));
        }
        let mut out = reserves_frame(&df, labels)?;
        ctx.write_artifact("international_reserves", &mut out)
    }
}

/// Latest month of reserve assets in USD bn with each component's share of
/// the total. The total row stays in the output, flagged in `Total`, so the
/// chart can leave it out while the headline metric picks it up.
pub fn reserves_frame(df: &DataFrame, labels: &[RowLabel]) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    if names.len() < 3 {
        return Err(PipelineError::Validation(
            "reserves snapshot is too narrow to hold period columns".to_string(),
        ));
    }
    let first_column = names[0].clone();

    let active_rows: Vec<usize> = (0..df.height())
        .filter(|&row| labels.get(row).is_some_and(|label| label.active))
        .collect();
    if active_rows.is_empty() {
        return Err(PipelineError::Validation(
            "no active reserve rows matched the snapshot".to_string(),
        ));
    }

    let mut latest: Option<(String, Vec<Option<f64>>)> = None;
    for name in names.iter().rev() {
        if *name == first_column || name == "retrieved" {
            continue;
        }
        let values = frame::numeric_values(df, name)?;
        if active_rows.iter().any(|&row| values[row].is_some()) {
            latest = Some((name.clone(), values));
            break;
        }
    }
    let (period, values) = latest.ok_or_else(|| {
        PipelineError::Validation("reserves snapshot has no populated period column".to_string())
    })?;
    // Period headers carry the year as digits; strip them before shortening
    // so the label reads as a month name.
    let date = frame::truncate_chars(&strip_digits(&period), 11);
    let retrieved = frame::text_values(df, "retrieved")?;

    let total_row = active_rows
        .iter()
        .copied()
        .find(|&row| labels[row].total)
        .ok_or_else(|| {
            PipelineError::Validation("reserve labels declare no total row".to_string())
        })?;
    let total_value = values[total_row]
        .map(|value| value / 1000.0)
        .filter(|value| *value != 0.0)
        .ok_or_else(|| {
            PipelineError::Validation(
                "reserves total row holds no value in the latest period".to_string(),
            )
        })?;

    let mut items = Vec::new();
    let mut out_values = Vec::new();
    let mut shares = Vec::new();
    let mut totals = Vec::new();
    let mut stamps: Vec<Option<String>> = Vec::new();
    let mut dates = Vec::new();
    for &row in &active_rows {
        let Some(raw) = values[row] else { continue };
        let label = &labels[row];
        let value = raw / 1000.0;
        items.push(label.item.clone());
        out_values.push(value);
        shares.push((value / total_value * 100.0).round());
        totals.push(label.total);
        stamps.push(retrieved[row].clone());
        dates.push(date.clone());
    }

    let columns: Vec<Column> = vec![
        Series::new("Item".into(), items).into(),
        Series::new("Value".into(), out_values).into(),
        Series::new("Share".into(), shares).into(),
        Series::new("Total".into(), totals).into(),
        Series::new("Retrieve date".into(), stamps).into(),
        Series::new("Date".into(), dates).into(),
    ];
    Ok(DataFrame::new(columns)?)
}

fn strip_digits(raw: &str) -> String {
    raw.chars().filter(|ch| !ch.is_ascii_digit()).collect()
}
