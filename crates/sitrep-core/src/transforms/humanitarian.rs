use polars::prelude::*;

use crate::error::{PipelineError, Result};
use crate::frame;

use super::{Transform, TransformContext};

/// Tag value marking the machine-readable HXL row in the snapshot.
const HXL_MARKER: &str = "#population+total";

/// Snapshot column to report column.
const COLUMNS: [(&str, &str); 8] = [
    ("People Affected(Flash Appeal)", "People affected"),
    ("IDPs", "Internally Displaced"),
    ("Refugees(UNHCR)", "Refugees"),
    (
        "Civilian casualities(OHCHR) - Killed",
        "Civilian deaths, confirmed",
    ),
    (
        "Civilian casualities(OHCHR) - Injured",
        "Civilians injured, confirmed",
    ),
    (
        "Attacks on Education Facilities",
        "Attacks on Education Facilities",
    ),
    ("Attacks on Health Care", "Attacks on Health Care"),
    ("Date", "Date"),
];

pub struct Humanitarian;

impl Transform for Humanitarian {
    fn name(&self) -> &'static str {
        "humanitarian"
    }

    fn source(&self) -> &'static str {
        "humanitarian"
    }

    fn artifacts(&self) -> &'static [&'static str] {
        &["humanitarian"]
    }

    fn run(&self, ctx: &TransformContext<'_>) -> Result<()> {
        let source = ctx.read_source(self.source())?;
        let mut df = clean_humanitarian(&source)?;
        ctx.write_artifact("humanitarian", &mut df)
    }
}

/// Drops the HXL tag row, keeps the displacement and casualty series under
/// their report names, and forward-fills the gaps between reporting dates.
pub fn clean_humanitarian(df: &DataFrame) -> Result<DataFrame> {
    if df.width() == 0 {
        return Err(PipelineError::Validation(
            "humanitarian snapshot has no columns".to_string(),
        ));
    }
    let first_column = df.get_column_names()[0].to_string();
    let markers = frame::text_values(df, &first_column)?;
    let keep: Vec<bool> = markers
        .iter()
        .map(|cell| cell.as_deref() != Some(HXL_MARKER))
        .collect();

    let mut columns: Vec<Column> = Vec::with_capacity(COLUMNS.len());
    for (source_name, report_name) in COLUMNS {
        let values = frame::text_values(df, source_name)?;
        let kept: Vec<Option<String>> = values
            .into_iter()
            .zip(&keep)
            .filter_map(|(value, keep)| if *keep { Some(value) } else { None })
            .collect();
        columns.push(Series::new(report_name.into(), forward_fill(kept)).into());
    }
    Ok(DataFrame::new(columns)?)
}

fn forward_fill(values: Vec<Option<String>>) -> Vec<Option<String>> {
    let mut last: Option<String> = None;
    values
        .into_iter()
        .map(|value| match value {
            Some(cell) => {
                last = Some(cell.clone());
                Some(cell)
            }
            None => last.clone(),
        })
        .collect()
}
