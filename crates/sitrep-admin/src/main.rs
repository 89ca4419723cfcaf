use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use sitrep_core::manifest::{self, Manifest};
use sitrep_core::store;
use sitrep_core::transforms;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Situation report maintenance tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the manifest for misconfigured sources and metrics
    Validate(ValidateArgs),
    /// Plan (and optionally apply) removal of assets the manifest no longer produces
    Gc(GcArgs),
    /// Print the head of an asset CSV
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Path to the manifest
    #[arg(long, default_value = "sources.toml")]
    manifest: PathBuf,
}

#[derive(Args, Debug)]
struct GcArgs {
    /// Path to the manifest
    #[arg(long, default_value = "sources.toml")]
    manifest: PathBuf,
    /// Directory holding snapshots and generated files
    #[arg(long, default_value = "assets")]
    assets: PathBuf,
    /// Apply deletions instead of running in dry-run mode
    #[arg(long)]
    apply: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Asset CSV to read
    file: PathBuf,
    /// How many rows to print
    #[arg(long, default_value_t = 10)]
    rows: usize,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Validate(args) => handle_validate(&args),
        Command::Gc(args) => handle_gc(&args),
        Command::Inspect(args) => handle_inspect(&args),
    }
}

fn load(path: &Path) -> Result<Manifest> {
    manifest::load_manifest(path)
        .with_context(|| format!("failed to load manifest {}", path.display()))
}

fn handle_validate(args: &ValidateArgs) -> Result<()> {
    let manifest = load(&args.manifest)?;
    let report = manifest::preflight_manifest(&manifest);

    println!(
        "{} sources ({} active), {} metrics, {} instruments.",
        report.total_sources, report.active_sources, report.metrics, report.instruments
    );
    if report.is_ok() {
        println!("Manifest is valid.");
        return Ok(());
    }

    println!("Found {} problems:", report.problems.len());
    for problem in &report.problems {
        println!("  {problem}");
    }
    bail!("manifest failed validation");
}

fn handle_gc(args: &GcArgs) -> Result<()> {
    let manifest = load(&args.manifest)?;
    let stale = stale_assets(&manifest, &args.assets)?;

    if stale.is_empty() {
        println!("No stale assets found. The assets directory matches the manifest.");
        return Ok(());
    }

    println!("Found {} stale assets:", stale.len());
    for path in &stale {
        println!("  {}", path.display());
    }

    if args.apply {
        for path in &stale {
            std::fs::remove_file(path)
                .with_context(|| format!("failed to delete {}", path.display()))?;
            info!(path = %path.display(), "stale asset deleted");
        }
        println!("Deleted {} stale assets.", stale.len());
    } else {
        println!("Run again with --apply to delete the stale files.");
    }
    Ok(())
}

/// Snapshots and transformed files on disk that no manifest entry or
/// registered transform would produce today. Renamed sources leave these
/// behind; `metrics.csv` and `report.html` are never candidates.
fn stale_assets(manifest: &Manifest, assets: &Path) -> Result<Vec<PathBuf>> {
    let expected_sources: HashSet<String> = manifest
        .sources
        .iter()
        .map(|source| format!("src_{}.csv", source.name))
        .collect();
    let expected_artifacts: HashSet<String> = transforms::expected_artifacts(manifest)
        .into_iter()
        .map(|name| format!("tf_{name}.csv"))
        .collect();

    let mut stale = Vec::new();
    for pattern in ["src_*.csv", "tf_*.csv"] {
        let full = assets.join(pattern).to_string_lossy().into_owned();
        for entry in glob::glob(&full)? {
            let path = entry?;
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let known = if name.starts_with("src_") {
                expected_sources.contains(name)
            } else {
                expected_artifacts.contains(name)
            };
            if !known {
                stale.push(path);
            }
        }
    }
    stale.sort();
    Ok(stale)
}

fn handle_inspect(args: &InspectArgs) -> Result<()> {
    let df = store::read_csv_untyped(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    println!("{}", df.head(Some(args.rows)));
    println!(
        "{} rows, {} columns in {}",
        df.height(),
        df.width(),
        args.file.display()
    );
    Ok(())
}
