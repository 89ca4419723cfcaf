use std::path::Path;

use polars::prelude::DataFrame;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::manifest::{ColumnLabel, Manifest, RowLabel};
use crate::store;

mod fiscal;
mod grain;
mod humanitarian;
mod prices;
mod rates;
mod reconstruction;
mod reserves;
mod soundness;
mod support;

pub use fiscal::{FiscalExpenses, FiscalFinance, FiscalIncome};
pub use grain::GrainDestinations;
pub use humanitarian::Humanitarian;
pub use prices::ConsumerPrices;
pub use rates::{BondYields, InterestRates, PolicyRate};
pub use reconstruction::{ReconstructionRegions, ReconstructionSectors};
pub use reserves::InternationalReserves;
pub use soundness::FinancialSoundness;
pub use support::SupportCommitments;

/// What a transform gets to work with: the manifest (for row and column
/// labels) and the assets directory holding source snapshots.
pub struct TransformContext<'a> {
    pub manifest: &'a Manifest,
    pub assets_dir: &'a Path,
}

impl<'a> TransformContext<'a> {
    pub fn new(manifest: &'a Manifest, assets_dir: &'a Path) -> Self {
        Self {
            manifest,
            assets_dir,
        }
    }

    pub fn read_source(&self, name: &str) -> Result<DataFrame> {
        store::read_source(self.assets_dir, name)
    }

    pub fn write_artifact(&self, name: &str, df: &mut DataFrame) -> Result<()> {
        store::write_artifact(self.assets_dir, name, df)
    }

    pub fn has_source_snapshot(&self, name: &str) -> bool {
        store::source_path(self.assets_dir, name).exists()
    }

    pub fn row_labels(&self, source: &str) -> &[RowLabel] {
        self.manifest
            .source(source)
            .map(|entry| entry.row_labels.as_slice())
            .unwrap_or(&[])
    }

    pub fn column_labels(&self, source: &str) -> &[ColumnLabel] {
        self.manifest
            .source(source)
            .map(|entry| entry.columns.as_slice())
            .unwrap_or(&[])
    }
}

/// A single snapshot-to-artifact step. Implementations read
/// `src_<source>.csv`, reshape it, and write every name in `artifacts()`
/// as `tf_<name>.csv`.
pub trait Transform {
    fn name(&self) -> &'static str;
    fn source(&self) -> &'static str;
    fn artifacts(&self) -> &'static [&'static str];
    fn run(&self, ctx: &TransformContext<'_>) -> Result<()>;
}

pub fn all_transforms() -> Vec<Box<dyn Transform>> {
    vec![
        Box::new(Humanitarian),
        Box::new(GrainDestinations),
        Box::new(ReconstructionSectors),
        Box::new(ReconstructionRegions),
        Box::new(SupportCommitments),
        Box::new(FiscalIncome),
        Box::new(FiscalExpenses),
        Box::new(FiscalFinance),
        Box::new(ConsumerPrices),
        Box::new(InternationalReserves),
        Box::new(BondYields),
        Box::new(PolicyRate),
        Box::new(InterestRates),
        Box::new(FinancialSoundness),
    ]
}

/// Artifact names this manifest can produce, transforms and feeds together.
/// Preflight checks metric references against this set and `gc` treats
/// anything outside it as stale.
pub fn expected_artifacts(manifest: &Manifest) -> Vec<String> {
    let mut names: Vec<String> = all_transforms()
        .iter()
        .flat_map(|transform| {
            transform
                .artifacts()
                .iter()
                .map(|artifact| artifact.to_string())
        })
        .collect();

    if manifest.news.active {
        names.push("news".to_string());
    }
    if !manifest.instruments.is_empty() {
        names.push("fx_rates".to_string());
    }
    if manifest.gdp.as_ref().is_some_and(|gdp| gdp.active) {
        names.push("gdp".to_string());
    }
    names
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformStatus {
    Ok,
    Skipped,
    Failed,
}

impl TransformStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformStatus::Ok => "ok",
            TransformStatus::Skipped => "skipped",
            TransformStatus::Failed => "failed",
        }
    }
}

#[derive(Debug)]
pub struct TransformOutcome {
    pub name: String,
    pub status: TransformStatus,
    pub detail: String,
}

#[derive(Debug, Default)]
pub struct TransformReport {
    pub outcomes: Vec<TransformOutcome>,
}

impl TransformReport {
    pub fn count(&self, status: TransformStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == status)
            .count()
    }

    pub fn push(
        &mut self,
        name: impl Into<String>,
        status: TransformStatus,
        detail: impl Into<String>,
    ) {
        self.outcomes.push(TransformOutcome {
            name: name.into(),
            status,
            detail: detail.into(),
        });
    }
}

/// Runs every registered transform against the current snapshots. A missing
/// snapshot skips that transform, a failing one is recorded and the rest
/// still run.
pub fn run_transforms(manifest: &Manifest, assets_dir: &Path) -> Result<TransformReport> {
    store::ensure_assets_dir(assets_dir)?;
    let ctx = TransformContext::new(manifest, assets_dir);
    let mut report = TransformReport::default();

    for transform in all_transforms() {
        let name = transform.name();
        if !ctx.has_source_snapshot(transform.source()) {
            warn!(
                transform = name,
                source = transform.source(),
                "source snapshot missing, skipping"
            );
            report.push(
                name,
                TransformStatus::Skipped,
                format!("missing src_{}.csv", transform.source()),
            );
            continue;
        }

        match transform.run(&ctx) {
            Ok(()) => {
                let written = transform
                    .artifacts()
                    .iter()
                    .map(|artifact| format!("tf_{artifact}.csv"))
                    .collect::<Vec<_>>()
                    .join(", ");
                info!(transform = name, artifacts = %written, "transform finished");
                report.push(name, TransformStatus::Ok, format!("wrote {written}"));
            }
            Err(err) => {
                error!(transform = name, error = %err, "transform failed");
                report.push(name, TransformStatus::Failed, err.to_string());
            }
        }
    }

    Ok(report)
}
