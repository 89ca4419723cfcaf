use polars::prelude::*;

use crate::error::Result;
use crate::frame;

use super::{Transform, TransformContext};

/// Aggregate rows mixed into the per-region damage table.
const SUBTOTAL_ROWS: [&str; 3] = [
    "Support regions, subtotal",
    "Backline regions, subtotal",
    "Regions where government has regained control, subtotal",
];

pub struct ReconstructionSectors;

impl Transform for ReconstructionSectors {
    fn name(&self) -> &'static str {
        "reconstruction_sectors"
    }

    fn source(&self) -> &'static str {
        "reconstruction_sectors"
    }

    fn artifacts(&self) -> &'static [&'static str] {
        &["reconstruction_sectors"]
    }

    // The sector assessment is published ready to plot; the artifact is the
    // snapshot as-is.
    fn run(&self, ctx: &TransformContext<'_>) -> Result<()> {
        let mut df = ctx.read_source(self.source())?;
        ctx.write_artifact("reconstruction_sectors", &mut df)
    }
}

pub struct ReconstructionRegions;

impl Transform for ReconstructionRegions {
    fn name(&self) -> &'static str {
        "reconstruction_regions"
    }

    fn source(&self) -> &'static str {
        "reconstruction_regions"
    }

    fn artifacts(&self) -> &'static [&'static str] {
        &["reconstruction_regions"]
    }

    fn run(&self, ctx: &TransformContext<'_>) -> Result<()> {
        let source = ctx.read_source(self.source())?;
        let mut df = drop_subtotal_rows(&source)?;
        ctx.write_artifact("reconstruction_regions", &mut df)
    }
}

/// Removes the grouping subtotal rows so the per-oblast chart does not double
/// count damage.
pub fn drop_subtotal_rows(df: &DataFrame) -> Result<DataFrame> {
    let oblasts = frame::text_values(df, "Oblast")?;
    let keep: Vec<bool> = oblasts
        .iter()
        .map(|cell| !matches!(cell.as_deref(), Some(oblast) if SUBTOTAL_ROWS.contains(&oblast)))
        .collect();
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok(df.filter(&mask)?)
}
