use polars::prelude::*;

use crate::error::{PipelineError, Result};
use crate::frame;
use crate::manifest::RowLabel;

use super::{Transform, TransformContext};

pub struct FiscalIncome;

impl Transform for FiscalIncome {
    fn name(&self) -> &'static str {
        "fiscal_income"
    }

    fn source(&self) -> &'static str {
        "fiscal_income"
    }

    fn artifacts(&self) -> &'static [&'static str] {
        &["fiscal_income"]
    }

    fn run(&self, ctx: &TransformContext<'_>) -> Result<()> {
        run_fiscal(ctx, self.source(), "fiscal_income")
    }
}

pub struct FiscalExpenses;

impl Transform for FiscalExpenses {
    fn name(&self) -> &'static str {
        "fiscal_expenses"
    }

    fn source(&self) -> &'static str {
        "fiscal_expenses"
    }

    fn artifacts(&self) -> &'static [&'static str] {
        &["fiscal_expenses"]
    }

    fn run(&self, ctx: &TransformContext<'_>) -> Result<()> {
        run_fiscal(ctx, self.source(), "fiscal_expenses")
    }
}

pub struct FiscalFinance;

impl Transform for FiscalFinance {
    fn name(&self) -> &'static str {
        "fiscal_finance"
    }

    fn source(&self) -> &'static str {
        "fiscal_finance"
    }

    fn artifacts(&self) -> &'static [&'static str] {
        &["fiscal_finance"]
    }

    fn run(&self, ctx: &TransformContext<'_>) -> Result<()> {
        run_fiscal(ctx, self.source(), "fiscal_finance")
    }
}

fn run_fiscal(ctx: &TransformContext<'_>, source: &str, artifact: &str) -> Result<()> {
    let df = ctx.read_source(source)?;
    let labels = ctx.row_labels(source);
    if labels.is_empty() {
        return Err(PipelineError::Validation(format!(
            "source '{source}' has no row labels configured"
        )));
    }
    let mut cleaned = clean_fiscal(&df, labels)?;
    ctx.write_artifact(artifact, &mut cleaned)
}

/// Reduces a ministry-of-finance style sheet to the latest reporting month.
///
/// Row labels are matched to the sheet by position. Inactive rows drop out,
/// the rightmost period column holding any value for an active row becomes
/// `Value`, and each value is expressed as a share of the row flagged
/// `total`. The total row itself is not part of the output.
pub fn clean_fiscal(df: &DataFrame, labels: &[RowLabel]) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    if names.len() < 3 {
        return Err(PipelineError::Validation(
            "fiscal snapshot is too narrow to hold period columns".to_string(),
        ));
    }
    let first_column = names[0].clone();

    let active_rows: Vec<usize> = (0..df.height())
        .filter(|&row| labels.get(row).is_some_and(|label| label.active))
        .collect();
    if active_rows.is_empty() {
        return Err(PipelineError::Validation(
            "no active fiscal rows matched the snapshot".to_string(),
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
        PipelineError::Validation("fiscal snapshot has no populated period column".to_string())
    })?;
    let date = frame::truncate_chars(&period, 11);
    let retrieved = frame::text_values(df, "retrieved")?;

    let total_row = active_rows
        .iter()
        .copied()
        .find(|&row| labels[row].total)
        .ok_or_else(|| {
            PipelineError::Validation("fiscal labels declare no total row".to_string())
        })?;
    let total_value = values[total_row]
        .filter(|value| *value != 0.0)
        .ok_or_else(|| {
            PipelineError::Validation(
                "fiscal total row holds no value in the latest period".to_string(),
            )
        })?;

    let mut items = Vec::new();
    let mut codes: Vec<Option<String>> = Vec::new();
    let mut out_values: Vec<Option<f64>> = Vec::new();
    let mut shares: Vec<Option<f64>> = Vec::new();
    let mut stamps: Vec<Option<String>> = Vec::new();
    let mut dates = Vec::new();
    for &row in &active_rows {
        let label = &labels[row];
        if label.total {
            continue;
        }
        items.push(label.item.clone());
        codes.push(label.code.clone());
        out_values.push(values[row]);
        shares.push(values[row].map(|value| value / total_value));
        stamps.push(retrieved[row].clone());
        dates.push(date.clone());
    }

    let columns: Vec<Column> = vec![
        Series::new("Item".into(), items).into(),
        Series::new("Code".into(), codes).into(),
        Series::new("Value".into(), out_values).into(),
        Series::new("Share".into(), shares).into(),
        Series::new("Retrieve date".into(), stamps).into(),
        Series::new("Date".into(), dates).into(),
    ];
    Ok(DataFrame::new(columns)?)
}
