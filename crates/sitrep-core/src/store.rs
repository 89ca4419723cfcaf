use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub const METRICS_FILE: &str = "metrics.csv";
pub const REPORT_FILE: &str = "report.html";
pub const FETCH_STATE_FILE: &str = "fetch_state.json";

pub fn ensure_assets_dir(assets_dir: &Path) -> Result<()> {
    fs::create_dir_all(assets_dir)?;
    Ok(())
}

pub fn source_path(assets_dir: &Path, name: &str) -> PathBuf {
    assets_dir.join(format!("src_{name}.csv"))
}

pub fn artifact_path(assets_dir: &Path, name: &str) -> PathBuf {
    assets_dir.join(format!("tf_{name}.csv"))
}

/// Timestamp recorded next to every retrieved snapshot and metric batch.
pub fn retrieval_stamp() -> String {
    Local::now().format("%m/%d/%Y, %H:%M:%S").to_string()
}

pub fn write_source(assets_dir: &Path, name: &str, df: &mut DataFrame) -> Result<()> {
    write_csv(&source_path(assets_dir, name), df)
}

pub fn read_source(assets_dir: &Path, name: &str) -> Result<DataFrame> {
    read_csv(&source_path(assets_dir, name))
}

pub fn write_artifact(assets_dir: &Path, name: &str, df: &mut DataFrame) -> Result<()> {
    write_csv(&artifact_path(assets_dir, name), df)
}

pub fn read_artifact(assets_dir: &Path, name: &str) -> Result<DataFrame> {
    read_csv(&artifact_path(assets_dir, name))
}

pub fn write_csv(path: &Path, df: &mut DataFrame) -> Result<()> {
    let mut file = fs::File::create(path)?;
    CsvWriter::new(&mut file).finish(df)?;
    Ok(())
}

pub fn read_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(PipelineError::MissingArtifact(path.display().to_string()));
    }
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Like [`read_csv`] but leaves every column as a string, for artifacts that
/// mix numbers with `NA` markers.
pub fn read_csv_untyped(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(PipelineError::MissingArtifact(path.display().to_string()));
    }
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchStateEntry {
    pub hash: String,
    pub retrieved: String,
}

/// Payload hashes from earlier fetches, keyed by source name. Lets a fetch
/// mark an identical download as unchanged instead of rewriting it.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FetchState {
    #[serde(default)]
    pub entries: BTreeMap<String, FetchStateEntry>,
}

pub fn load_fetch_state(assets_dir: &Path) -> Result<FetchState> {
    let path = assets_dir.join(FETCH_STATE_FILE);
    if !path.exists() {
        return Ok(FetchState::default());
    }
    let contents = fs::read_to_string(&path)?;
    let state = serde_json::from_str(&contents)?;
    Ok(state)
}

pub fn save_fetch_state(assets_dir: &Path, state: &FetchState) -> Result<()> {
    let path = assets_dir.join(FETCH_STATE_FILE);
    let contents = serde_json::to_string_pretty(state)?;
    fs::write(path, contents)?;
    Ok(())
}
