use std::time::Instant;

use tracing::{info, warn};

use crate::fetch::Fetcher;
use crate::manifest::FetchSettings;

/// Result of one keep-alive probe. Probes never fail the process; connection
/// errors are carried in the outcome instead.
#[derive(Debug)]
pub struct PingOutcome {
    pub url: String,
    pub status: Option<u16>,
    pub elapsed_ms: u64,
    pub error: Option<String>,
}

impl PingOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.status.is_some_and(|status| (200..300).contains(&status))
    }
}

/// Issues one GET against the deployed report and logs the round trip.
pub fn ping(settings: &FetchSettings, url: &str) -> PingOutcome {
    let started = Instant::now();
    let outcome = match Fetcher::new(settings).and_then(|fetcher| fetcher.probe(url)) {
        Ok(status) => PingOutcome {
            url: url.to_string(),
            status: Some(status),
            elapsed_ms: started.elapsed().as_millis() as u64,
            error: None,
        },
        Err(err) => PingOutcome {
            url: url.to_string(),
            status: None,
            elapsed_ms: started.elapsed().as_millis() as u64,
            error: Some(err.to_string()),
        },
    };
    if outcome.is_ok() {
        info!(
            url = %outcome.url,
            status = ?outcome.status,
            elapsed_ms = outcome.elapsed_ms,
            "ping ok"
        );
    } else {
        warn!(
            url = %outcome.url,
            status = ?outcome.status,
            error = ?outcome.error,
            elapsed_ms = outcome.elapsed_ms,
            "ping failed"
        );
    }
    outcome
}
