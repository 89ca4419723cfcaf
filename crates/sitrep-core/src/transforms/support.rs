use std::collections::BTreeMap;

use polars::prelude::*;

use crate::error::{PipelineError, Result};
use crate::frame;

use super::{Transform, TransformContext};

const COMMITTED_COLUMN: &str = "Converted Value in EUR";
const DELIVERED_COLUMN: &str = "Total monetary value delivered in EUR";
const NO_PRICE: &str = "No price";

pub struct SupportCommitments;

impl Transform for SupportCommitments {
    fn name(&self) -> &'static str {
        "support"
    }

    fn source(&self) -> &'static str {
        "support"
    }

    fn artifacts(&self) -> &'static [&'static str] {
        &["support"]
    }

    fn run(&self, ctx: &TransformContext<'_>) -> Result<()> {
        let source = ctx.read_source(self.source())?;
        let mut df = aggregate_support(&source)?;
        ctx.write_artifact("support", &mut df)
    }
}

/// Sums committed and delivered aid per donor and aid type in USD bn, plus
/// the delivery ratio. In-kind rows priced as `No price` are left out.
pub fn aggregate_support(df: &DataFrame) -> Result<DataFrame> {
    let countries = frame::text_values(df, "Countries")?;
    let aid_types = frame::text_values(df, "Type of Aid General")?;
    let committed = frame::text_values(df, COMMITTED_COLUMN)?;
    let delivered = frame::text_values(df, DELIVERED_COLUMN)?;
    let retrieved = frame::text_values(df, "retrieved")?;

    let mut groups: BTreeMap<(String, String, String), (f64, f64)> = BTreeMap::new();
    for row in 0..df.height() {
        let committed_raw = committed[row].as_deref().unwrap_or("");
        let delivered_raw = delivered[row].as_deref().unwrap_or("");
        if committed_raw == NO_PRICE || delivered_raw == NO_PRICE {
            continue;
        }
        let (Some(country), Some(aid_type)) = (countries[row].clone(), aid_types[row].clone())
        else {
            continue;
        };
        let stamp = retrieved[row].clone().unwrap_or_default();

        let entry = groups.entry((country, aid_type, stamp)).or_insert((0.0, 0.0));
        entry.0 += frame::parse_number(committed_raw)
            .map(|value| value / 1e9)
            .unwrap_or(0.0);
        entry.1 += frame::parse_number(delivered_raw)
            .map(|value| value / 1e9)
            .unwrap_or(0.0);
    }
    if groups.is_empty() {
        return Err(PipelineError::Validation(
            "support snapshot held no usable commitment rows".to_string(),
        ));
    }

    let mut out_countries = Vec::with_capacity(groups.len());
    let mut out_types = Vec::with_capacity(groups.len());
    let mut out_retrieved = Vec::with_capacity(groups.len());
    let mut out_committed = Vec::with_capacity(groups.len());
    let mut out_delivered = Vec::with_capacity(groups.len());
    let mut out_ratio: Vec<Option<f64>> = Vec::with_capacity(groups.len());
    for ((country, aid_type, stamp), (committed, delivered)) in groups {
        out_countries.push(country);
        out_types.push(aid_type);
        out_retrieved.push(stamp);
        out_committed.push(committed);
        out_delivered.push(delivered);
        out_ratio.push((committed != 0.0).then(|| delivered / committed));
    }

    let columns: Vec<Column> = vec![
        Series::new("countries".into(), out_countries).into(),
        Series::new("Type of Aid General".into(), out_types).into(),
        Series::new("retrieved".into(), out_retrieved).into(),
        Series::new("Value committed".into(), out_committed).into(),
        Series::new("Value delivered".into(), out_delivered).into(),
        Series::new("Ratio: Delivered to committed".into(), out_ratio).into(),
    ];
    Ok(DataFrame::new(columns)?)
}
