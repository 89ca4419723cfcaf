use std::path::Path;
use std::time::Duration;

use blake3::Hasher;
use polars::prelude::*;
use tracing::{error, info};

use crate::error::{PipelineError, Result};
use crate::manifest::{FetchSettings, Manifest, SourceEntry};
use crate::store::{self, FetchState, FetchStateEntry};

use sitrep_reader::read_table;

/// Blocking HTTP client shared by source fetches, feeds, and the ping probe.
pub struct Fetcher {
    client: reqwest::blocking::Client,
}

impl Fetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()?;
        Ok(Self { client })
    }

    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Processing(format!(
                "GET {url} returned {status}"
            )));
        }
        Ok(response.bytes()?.to_vec())
    }

    pub fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Processing(format!(
                "GET {url} returned {status}"
            )));
        }
        Ok(response.json::<T>()?)
    }

    pub fn get_json_query<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self.client.get(url).query(query).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Processing(format!(
                "GET {url} returned {status}"
            )));
        }
        Ok(response.json::<T>()?)
    }

    /// Issues a GET and reports only the status code. Non-2xx responses are
    /// returned, not treated as errors; the keep-alive probe grades them.
    pub fn probe(&self, url: &str) -> Result<u16> {
        let response = self.client.get(url).send()?;
        Ok(response.status().as_u16())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Fetched,
    Unchanged,
    Failed,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStatus::Fetched => "fetched",
            FetchStatus::Unchanged => "unchanged",
            FetchStatus::Failed => "failed",
        }
    }
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub name: String,
    pub status: FetchStatus,
    pub detail: String,
}

#[derive(Debug, Default)]
pub struct FetchReport {
    pub outcomes: Vec<FetchOutcome>,
}

impl FetchReport {
    pub fn count(&self, status: FetchStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == status)
            .count()
    }

    pub fn push(&mut self, name: impl Into<String>, status: FetchStatus, detail: impl Into<String>) {
        self.outcomes.push(FetchOutcome {
            name: name.into(),
            status,
            detail: detail.into(),
        });
    }

    pub fn merge(&mut self, other: FetchReport) {
        self.outcomes.extend(other.outcomes);
    }
}

/// Downloads every active source snapshot into `src_<name>.csv`.
///
/// One source failing never stops the rest; failures land in the report with
/// the error text. Unchanged payloads (same blake3 hash as last time) leave
/// the snapshot on disk untouched.
pub fn fetch_sources(manifest: &Manifest, assets_dir: &Path) -> Result<FetchReport> {
    store::ensure_assets_dir(assets_dir)?;
    let fetcher = Fetcher::new(&manifest.fetch)?;
    let mut state = store::load_fetch_state(assets_dir)?;
    let mut report = FetchReport::default();

    for source in manifest.active_sources() {
        match fetch_one(&fetcher, source, assets_dir, &mut state) {
            Ok(outcome) => {
                info!(
                    source = %outcome.name,
                    status = outcome.status.as_str(),
                    detail = %outcome.detail,
                    "source fetch finished"
                );
                report.outcomes.push(outcome);
            }
            Err(err) => {
                error!(source = %source.name, error = %err, "source fetch failed");
                report.push(&source.name, FetchStatus::Failed, err.to_string());
            }
        }
    }

    store::save_fetch_state(assets_dir, &state)?;
    Ok(report)
}

fn fetch_one(
    fetcher: &Fetcher,
    source: &SourceEntry,
    assets_dir: &Path,
    state: &mut FetchState,
) -> Result<FetchOutcome> {
    let payload = fetcher.get_bytes(&source.url)?;
    let hash = compute_hash(&payload);

    let unchanged = state
        .entries
        .get(&source.name)
        .is_some_and(|entry| entry.hash == hash);
    if unchanged && store::source_path(assets_dir, &source.name).exists() {
        return Ok(FetchOutcome {
            name: source.name.clone(),
            status: FetchStatus::Unchanged,
            detail: format!("payload hash {} unchanged", &hash[..12]),
        });
    }

    let format = source.table_format()?;
    let mut df = read_table(&payload, format, &source.read_options())?;
    let stamp = store::retrieval_stamp();
    append_retrieved(&mut df, &stamp)?;
    store::write_source(assets_dir, &source.name, &mut df)?;

    state.entries.insert(
        source.name.clone(),
        FetchStateEntry {
            hash,
            retrieved: stamp,
        },
    );

    Ok(FetchOutcome {
        name: source.name.clone(),
        status: FetchStatus::Fetched,
        detail: format!("{} rows, {} columns", df.height(), df.width()),
    })
}

pub fn compute_hash(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    let hash = hasher.finalize();
    hash.to_hex().to_string()
}

fn append_retrieved(df: &mut DataFrame, stamp: &str) -> Result<()> {
    let values = vec![stamp.to_string(); df.height()];
    df.with_column(Series::new("retrieved".into(), values))?;
    Ok(())
}
