use std::collections::HashMap;

use chrono::Local;
use polars::prelude::*;

use crate::error::{PipelineError, Result};
use crate::frame;

use super::{Transform, TransformContext};

pub struct FinancialSoundness;

impl Transform for FinancialSoundness {
    fn name(&self) -> &'static str {
        "financial_soundness"
    }

    fn source(&self) -> &'static str {
        "financial_soundness"
    }

    fn artifacts(&self) -> &'static [&'static str] {
        &["financial_soundness"]
    }

    fn run(&self, ctx: &TransformContext<'_>) -> Result<()> {
        let df = ctx.read_source(self.source())?;
        let stamp = Local::now().date_naive().to_string();
        let mut out = soundness_frame(&df, &stamp)?;
        ctx.write_artifact("financial_soundness", &mut out)
    }
}

/// Pivots the soundness indicator sheet so each indicator is a column and
/// each quarter a row. Indicator names lose their footnote digits and
/// punctuation on the way.
pub fn soundness_frame(df: &DataFrame, stamp: &str) -> Result<DataFrame> {
    let indicators = frame::text_values(df, "Indicator")?;
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let quarters: Vec<String> = names
        .into_iter()
        .filter(|name| name != "Indicator" && name != "retrieved")
        .collect();
    if quarters.is_empty() {
        return Err(PipelineError::Validation(
            "soundness snapshot has no quarter columns".to_string(),
        ));
    }

    let mut rows: Vec<(usize, String)> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (row, raw) in indicators.iter().enumerate() {
        let Some(raw) = raw else { continue };
        let item = clean_indicator(raw);
        if item.is_empty() {
            continue;
        }
        let count = {
            let entry = seen.entry(item.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        let item = if count == 1 {
            item
        } else {
            format!("{item}_{count}")
        };
        rows.push((row, item));
    }
    if rows.is_empty() {
        return Err(PipelineError::Validation(
            "soundness snapshot held no usable indicator rows".to_string(),
        ));
    }

    let mut quarter_values: Vec<Vec<Option<f64>>> = Vec::with_capacity(quarters.len());
    for quarter in &quarters {
        quarter_values.push(frame::numeric_values(df, quarter)?);
    }

    let mut columns: Vec<Column> = Vec::with_capacity(rows.len() + 2);
    columns.push(Series::new("Quarter".into(), quarters.clone()).into());
    for (row, item) in &rows {
        let values: Vec<Option<f64>> = quarter_values.iter().map(|values| values[*row]).collect();
        columns.push(Series::new(item.as_str().into(), values).into());
    }
    columns.push(Series::new("Retrieved".into(), vec![stamp.to_string(); quarters.len()]).into());
    Ok(DataFrame::new(columns)?)
}

/// Letters and single spaces only, so `Tier 1 capital to risk-weighted
/// assets ²` and its footnote marks collapse to a stable column name.
fn clean_indicator(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|ch| ch.is_ascii_alphabetic() || ch.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
