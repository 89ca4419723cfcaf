use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use sitrep_core::fetch::{self, FetchReport, FetchStatus};
use sitrep_core::feeds;
use sitrep_core::manifest::{self, Manifest};
use sitrep_core::metrics::{self, MetricStatus, MetricsReport};
use sitrep_core::ping;
use sitrep_core::report;
use sitrep_core::store;
use sitrep_core::transforms::{self, TransformReport, TransformStatus};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Situation report data pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download fresh source snapshots, news, market quotes, and GDP
    Fetch(PipelineArgs),
    /// Rebuild the transformed files from the snapshots on disk
    Transform(PipelineArgs),
    /// Recompute the metric tiles from the transformed files
    Metrics(PipelineArgs),
    /// Render the HTML report
    Render(PipelineArgs),
    /// The whole pipeline: fetch, transform, metrics, render
    Run(RunArgs),
    /// Check that the deployed report answers
    Ping(PingArgs),
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Path to the manifest
    #[arg(long, default_value = "sources.toml")]
    manifest: PathBuf,
    /// Directory holding snapshots and generated files
    #[arg(long, default_value = "assets")]
    assets: PathBuf,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,
    /// Reuse the snapshots on disk instead of downloading
    #[arg(long)]
    skip_fetch: bool,
}

#[derive(Args, Debug)]
struct PingArgs {
    /// Path to the manifest
    #[arg(long, default_value = "sources.toml")]
    manifest: PathBuf,
    /// Probe this URL instead of the manifest's deployed_url
    #[arg(long)]
    url: Option<String>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Fetch(args) => handle_fetch(&args),
        Command::Transform(args) => handle_transform(&args),
        Command::Metrics(args) => handle_metrics(&args),
        Command::Render(args) => handle_render(&args),
        Command::Run(args) => handle_run(&args),
        Command::Ping(args) => handle_ping(&args),
    }
}

fn load(path: &Path) -> Result<Manifest> {
    manifest::load_manifest(path)
        .with_context(|| format!("failed to load manifest {}", path.display()))
}

/// Manifest problems are warnings here, not errors. A blank URL only sinks
/// its own source; the run carries on with the rest.
fn preflight(manifest: &Manifest) {
    let report = manifest::preflight_manifest(manifest);
    for problem in &report.problems {
        warn!(problem = %problem, "manifest preflight");
    }
}

fn run_fetch(manifest: &Manifest, assets: &Path) -> Result<FetchReport> {
    let mut report = fetch::fetch_sources(manifest, assets)?;
    report.merge(feeds::run_feeds(manifest, assets)?);
    Ok(report)
}

fn handle_fetch(args: &PipelineArgs) -> Result<()> {
    let manifest = load(&args.manifest)?;
    preflight(&manifest);
    let report = run_fetch(&manifest, &args.assets)?;
    print_fetch(&report);
    Ok(())
}

fn handle_transform(args: &PipelineArgs) -> Result<()> {
    let manifest = load(&args.manifest)?;
    let report = transforms::run_transforms(&manifest, &args.assets)?;
    print_transforms(&report);
    Ok(())
}

fn handle_metrics(args: &PipelineArgs) -> Result<()> {
    let manifest = load(&args.manifest)?;
    let report = metrics::update_metrics(&manifest, &args.assets)?;
    print_metrics(&report);
    Ok(())
}

fn handle_render(args: &PipelineArgs) -> Result<()> {
    let manifest = load(&args.manifest)?;
    report::render_report(&manifest, &args.assets)?;
    println!(
        "Report written to {}",
        args.assets.join(store::REPORT_FILE).display()
    );
    Ok(())
}

fn handle_run(args: &RunArgs) -> Result<()> {
    let manifest = load(&args.pipeline.manifest)?;
    preflight(&manifest);

    if args.skip_fetch {
        println!("Skipping fetch, using the snapshots on disk.");
    } else {
        let report = run_fetch(&manifest, &args.pipeline.assets)?;
        print_fetch(&report);
    }

    let transformed = transforms::run_transforms(&manifest, &args.pipeline.assets)?;
    print_transforms(&transformed);

    let metrics = metrics::update_metrics(&manifest, &args.pipeline.assets)?;
    print_metrics(&metrics);

    report::render_report(&manifest, &args.pipeline.assets)?;
    println!(
        "Report written to {}",
        args.pipeline.assets.join(store::REPORT_FILE).display()
    );
    Ok(())
}

fn handle_ping(args: &PingArgs) -> Result<()> {
    let manifest = load(&args.manifest)?;
    let url = match args
        .url
        .clone()
        .or_else(|| manifest.report.deployed_url.clone())
    {
        Some(url) => url,
        None => {
            println!("No url given and the manifest has no deployed_url; nothing to ping.");
            return Ok(());
        }
    };

    let outcome = ping::ping(&manifest.fetch, &url);
    let verdict = if outcome.is_ok() { "UP" } else { "DOWN" };
    let detail = match (outcome.status, &outcome.error) {
        (Some(status), _) => format!("status {status}"),
        (None, Some(error)) => error.clone(),
        (None, None) => "no response".to_string(),
    };
    println!(
        "{verdict} {} ({detail}, {}ms)",
        outcome.url, outcome.elapsed_ms
    );
    Ok(())
}

fn print_fetch(report: &FetchReport) {
    let mut table = Table::new();
    table.set_header(vec!["Source", "Status", "Detail"]);
    for outcome in &report.outcomes {
        table.add_row(vec![
            outcome.name.as_str(),
            outcome.status.as_str(),
            outcome.detail.as_str(),
        ]);
    }
    println!("{table}");
    println!(
        "Fetched {}, unchanged {}, failed {}.",
        report.count(FetchStatus::Fetched),
        report.count(FetchStatus::Unchanged),
        report.count(FetchStatus::Failed)
    );
}

fn print_transforms(report: &TransformReport) {
    let mut table = Table::new();
    table.set_header(vec!["Transform", "Status", "Detail"]);
    for outcome in &report.outcomes {
        table.add_row(vec![
            outcome.name.as_str(),
            outcome.status.as_str(),
            outcome.detail.as_str(),
        ]);
    }
    println!("{table}");
    println!(
        "Transformed {}, skipped {}, failed {}.",
        report.count(TransformStatus::Ok),
        report.count(TransformStatus::Skipped),
        report.count(TransformStatus::Failed)
    );
}

fn print_metrics(report: &MetricsReport) {
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Status", "Detail"]);
    for outcome in &report.outcomes {
        table.add_row(vec![
            outcome.title.as_str(),
            outcome.status.as_str(),
            outcome.detail.as_str(),
        ]);
    }
    println!("{table}");
    println!(
        "Updated {}, skipped {}, failed {}.",
        report.count(MetricStatus::Ok),
        report.count(MetricStatus::Skipped),
        report.count(MetricStatus::Failed)
    );
}
