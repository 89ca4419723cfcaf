use std::collections::BTreeMap;

use polars::prelude::*;

use crate::error::{PipelineError, Result};
use crate::frame;

use super::{Transform, TransformContext};

pub struct GrainDestinations;

impl Transform for GrainDestinations {
    fn name(&self) -> &'static str {
        "grain_destinations"
    }

    fn source(&self) -> &'static str {
        "grain_destinations"
    }

    fn artifacts(&self) -> &'static [&'static str] {
        &["grain_destinations"]
    }

    fn run(&self, ctx: &TransformContext<'_>) -> Result<()> {
        let source = ctx.read_source(self.source())?;
        let mut df = aggregate_grain(&source)?;
        ctx.write_artifact("grain_destinations", &mut df)
    }
}

/// Sums shipment tonnage per destination country and income group, largest
/// recipients first. Shipments without an income group count as `mixed`.
pub fn aggregate_grain(df: &DataFrame) -> Result<DataFrame> {
    let countries = frame::text_values(df, "Country")?;
    let income_groups = frame::text_values(df, "Income group")?;
    let tonnage = frame::numeric_values(df, "Tonnage")?;

    let mut totals: BTreeMap<(String, String), f64> = BTreeMap::new();
    for ((country, income), tons) in countries.into_iter().zip(income_groups).zip(tonnage) {
        let Some(country) = country else { continue };
        let income = income.unwrap_or_else(|| "mixed".to_string());
        *totals.entry((country, income)).or_insert(0.0) += tons.unwrap_or(0.0);
    }
    if totals.is_empty() {
        return Err(PipelineError::Validation(
            "grain snapshot held no usable shipment rows".to_string(),
        ));
    }

    let mut rows: Vec<((String, String), f64)> = totals.into_iter().collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut countries = Vec::with_capacity(rows.len());
    let mut incomes = Vec::with_capacity(rows.len());
    let mut received = Vec::with_capacity(rows.len());
    for ((country, income), tons) in rows {
        countries.push(country);
        incomes.push(income);
        received.push(tons);
    }

    let columns: Vec<Column> = vec![
        Series::new("Country".into(), countries).into(),
        Series::new("Income group".into(), incomes).into(),
        Series::new("Tons received".into(), received).into(),
    ];
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> DataFrame {
        let columns: Vec<Column> = vec![
            Series::new(
                "Country".into(),
                vec![Some("Spain"), Some("Kenya"), Some("Spain"), Some("Egypt"), None],
            )
            .into(),
            Series::new(
                "Income group".into(),
                vec![Some("High"), Some("Low"), Some("High"), None, Some("Low")],
            )
            .into(),
            Series::new(
                "Tonnage".into(),
                vec![
                    Some("30,000".to_string()),
                    Some("55000".to_string()),
                    Some("12,500".to_string()),
                    Some("60000".to_string()),
                    Some("9000".to_string()),
                ],
            )
            .into(),
            Series::new("retrieved".into(), vec![Some("08/24/2025, 09:00:00"); 5]).into(),
        ];
        DataFrame::new(columns).expect("failed to build snapshot")
    }

    #[test]
    fn tonnage_is_summed_per_country_and_sorted() {
        let df = aggregate_grain(&snapshot()).expect("aggregate failed");
        assert_eq!(
            df.get_column_names(),
            ["Country", "Income group", "Tons received"]
        );
        assert_eq!(df.height(), 3);

        let countries = df.column("Country").unwrap().str().unwrap();
        assert_eq!(countries.get(0), Some("Egypt"));
        assert_eq!(countries.get(1), Some("Kenya"));
        assert_eq!(countries.get(2), Some("Spain"));

        let tons = df.column("Tons received").unwrap().f64().unwrap();
        assert_eq!(tons.get(0), Some(60000.0));
        assert_eq!(tons.get(2), Some(42500.0));
    }

    #[test]
    fn missing_income_group_becomes_mixed() {
        let df = aggregate_grain(&snapshot()).expect("aggregate failed");
        let incomes = df.column("Income group").unwrap().str().unwrap();
        assert_eq!(incomes.get(0), Some("mixed"));
    }

    #[test]
    fn empty_snapshot_is_rejected() {
        let columns: Vec<Column> = vec![
            Series::new("Country".into(), Vec::<Option<String>>::new()).into(),
            Series::new("Income group".into(), Vec::<Option<String>>::new()).into(),
            Series::new("Tonnage".into(), Vec::<Option<String>>::new()).into(),
        ];
        let df = DataFrame::new(columns).expect("frame");
        match aggregate_grain(&df) {
            Err(PipelineError::Validation(message)) => {
                assert!(message.contains("no usable"), "{message}");
            }
            other => panic!("expected Validation error, got {other:?}"),
        }
    }
}
