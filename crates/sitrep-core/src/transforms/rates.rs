use polars::prelude::*;

use crate::error::{PipelineError, Result};
use crate::frame;
use crate::manifest::ColumnLabel;

use super::{Transform, TransformContext};

const HOUSEHOLDS: &str = "Nationals: households";
const CORPORATIONS: &str = "Nationals: non-financial corporations";
const SPREAD: &str = "Spread: households to non-financial corporations";

/// Maturity and currency breakdown rows nested under each region row.
const BREAKDOWN_ROWS: [&str; 2] = ["including", "including by currencies"];

pub struct BondYields;

impl Transform for BondYields {
    fn name(&self) -> &'static str {
        "bond_yields"
    }

    fn source(&self) -> &'static str {
        "bond_yields"
    }

    fn artifacts(&self) -> &'static [&'static str] {
        &["bond_yields"]
    }

    fn run(&self, ctx: &TransformContext<'_>) -> Result<()> {
        let df = ctx.read_source(self.source())?;
        let labels = ctx.column_labels(self.source());
        if labels.is_empty() {
            return Err(PipelineError::Validation(
                "source 'bond_yields' has no column labels configured".to_string(),
            ));
        }
        let mut out = relabel_frame(&df, labels)?;
        ctx.write_artifact("bond_yields", &mut out)
    }
}

pub struct PolicyRate;

impl Transform for PolicyRate {
    fn name(&self) -> &'static str {
        "policy_rate"
    }

    fn source(&self) -> &'static str {
        "policy_rate"
    }

    fn artifacts(&self) -> &'static [&'static str] {
        &["policy_rate"]
    }

    fn run(&self, ctx: &TransformContext<'_>) -> Result<()> {
        let df = ctx.read_source(self.source())?;
        let labels = ctx.column_labels(self.source());
        if labels.is_empty() {
            return Err(PipelineError::Validation(
                "source 'policy_rate' has no column labels configured".to_string(),
            ));
        }
        let mut out = relabel_frame(&df, labels)?;
        ctx.write_artifact("policy_rate", &mut out)
    }
}

pub struct InterestRates;

impl Transform for InterestRates {
    fn name(&self) -> &'static str {
        "interest_rates"
    }

    fn source(&self) -> &'static str {
        "interest_rates"
    }

    fn artifacts(&self) -> &'static [&'static str] {
        &["interest_rates"]
    }

    fn run(&self, ctx: &TransformContext<'_>) -> Result<()> {
        let df = ctx.read_source(self.source())?;
        let labels = ctx.column_labels(self.source());
        if labels.is_empty() {
            return Err(PipelineError::Validation(
                "source 'interest_rates' has no column labels configured".to_string(),
            ));
        }
        let mut out = interest_rates_frame(&df, labels)?;
        ctx.write_artifact("interest_rates", &mut out)
    }
}

/// Renames snapshot columns positionally from the manifest labels, keeps the
/// active ones plus the retrieval stamp, and drops rows with a gap anywhere.
pub fn relabel_frame(df: &DataFrame, labels: &[ColumnLabel]) -> Result<DataFrame> {
    let relabeled = relabel_columns(df, labels)?;
    frame_from_text(complete_rows(relabeled))
}

/// Regional lending rates with the maturity breakdown rows removed and the
/// household to corporate spread appended.
pub fn interest_rates_frame(df: &DataFrame, labels: &[ColumnLabel]) -> Result<DataFrame> {
    let relabeled = relabel_columns(df, labels)?;
    let region = relabeled
        .iter()
        .find(|(name, _)| name == "Region")
        .ok_or_else(|| {
            PipelineError::Validation(
                "interest rate labels must include a 'Region' column".to_string(),
            )
        })?;
    let keep: Vec<bool> = region
        .1
        .iter()
        .map(|cell| !matches!(cell.as_deref(), Some(region) if BREAKDOWN_ROWS.contains(&region)))
        .collect();
    let filtered: Vec<(String, Vec<Option<String>>)> = relabeled
        .iter()
        .map(|(name, values)| {
            let kept = values
                .iter()
                .zip(&keep)
                .filter_map(|(value, keep)| if *keep { Some(value.clone()) } else { None })
                .collect();
            (name.clone(), kept)
        })
        .collect();
    let complete = complete_rows(filtered);

    let mut households: Option<Vec<Option<f64>>> = None;
    let mut corporations: Option<Vec<Option<f64>>> = None;
    let mut columns: Vec<Column> = Vec::with_capacity(complete.len() + 1);
    for (name, values) in &complete {
        if name == "Region" || name == "Retrieved on" {
            columns.push(Series::new(name.as_str().into(), values.clone()).into());
            continue;
        }
        let parsed: Vec<Option<f64>> = values
            .iter()
            .map(|value| frame::parse_number(value))
            .collect();
        if name == HOUSEHOLDS {
            households = Some(parsed.clone());
        } else if name == CORPORATIONS {
            corporations = Some(parsed.clone());
        }
        columns.push(Series::new(name.as_str().into(), parsed).into());
    }

    let (Some(households), Some(corporations)) = (households, corporations) else {
        return Err(PipelineError::Validation(format!(
            "interest rate labels must include '{HOUSEHOLDS}' and '{CORPORATIONS}'"
        )));
    };
    let spread: Vec<Option<f64>> = households
        .iter()
        .zip(&corporations)
        .map(|(household, corporation)| match (household, corporation) {
            (Some(household), Some(corporation)) => Some(household - corporation),
            _ => None,
        })
        .collect();
    columns.push(Series::new(SPREAD.into(), spread).into());

    Ok(DataFrame::new(columns)?)
}

fn relabel_columns(
    df: &DataFrame,
    labels: &[ColumnLabel],
) -> Result<Vec<(String, Vec<Option<String>>)>> {
    let width = df.width();
    if labels.len() + 1 != width {
        return Err(PipelineError::Validation(format!(
            "{} column labels do not cover a table {width} columns wide \
             (one label per column, the retrieval stamp is unlabelled)",
            labels.len()
        )));
    }

    let names = df.get_column_names();
    let mut columns = Vec::new();
    for (index, label) in labels.iter().enumerate() {
        if !label.active {
            continue;
        }
        columns.push((
            label.name.clone(),
            frame::text_values(df, names[index].as_str())?,
        ));
    }
    columns.push((
        "Retrieved on".to_string(),
        frame::text_values(df, names[width - 1].as_str())?,
    ));
    Ok(columns)
}

fn complete_rows(columns: Vec<(String, Vec<Option<String>>)>) -> Vec<(String, Vec<String>)> {
    let height = columns.first().map(|(_, values)| values.len()).unwrap_or(0);
    let keep: Vec<usize> = (0..height)
        .filter(|&row| columns.iter().all(|(_, values)| values[row].is_some()))
        .collect();
    columns
        .into_iter()
        .map(|(name, values)| {
            let kept = keep
                .iter()
                .map(|&row| values[row].clone().unwrap_or_default())
                .collect();
            (name, kept)
        })
        .collect()
}

fn frame_from_text(columns: Vec<(String, Vec<String>)>) -> Result<DataFrame> {
    let columns: Vec<Column> = columns
        .into_iter()
        .map(|(name, values)| Series::new(name.as_str().into(), values).into())
        .collect();
    Ok(DataFrame::new(columns)?)
}
