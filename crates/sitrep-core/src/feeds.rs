use std::path::Path;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use serde::Deserialize;
use tracing::{error, info};

use crate::error::{PipelineError, Result};
use crate::fetch::{FetchReport, FetchStatus, Fetcher};
use crate::frame;
use crate::manifest::{GdpSettings, InstrumentEntry, Manifest, NewsSettings};
use crate::store;

use sitrep_reader::{CsvTableReader, ReadOptions, TableReader};

const GDELT_DOC_URL: &str = "https://api.gdeltproject.org/api/v2/doc/doc";
const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Runs the acquisitions that skip the `src_` stage and write their
/// transformed file directly: news, FX quotes, GDP. Each feed fails on its
/// own without stopping the others.
pub fn run_feeds(manifest: &Manifest, assets_dir: &Path) -> Result<FetchReport> {
    store::ensure_assets_dir(assets_dir)?;
    let fetcher = Fetcher::new(&manifest.fetch)?;
    let mut report = FetchReport::default();

    if manifest.news.active {
        record_feed(&mut report, "news", news_feed(&fetcher, &manifest.news, assets_dir));
    }

    if !manifest.instruments.is_empty() {
        record_feed(
            &mut report,
            "fx_rates",
            fx_feed(&fetcher, &manifest.instruments, assets_dir),
        );
    }

    if let Some(gdp) = manifest.gdp.as_ref().filter(|settings| settings.active) {
        record_feed(&mut report, "gdp", gdp_feed(&fetcher, gdp, assets_dir));
    }

    Ok(report)
}

fn record_feed(report: &mut FetchReport, name: &str, result: Result<String>) {
    match result {
        Ok(detail) => {
            info!(feed = name, detail = %detail, "feed finished");
            report.push(name, FetchStatus::Fetched, detail);
        }
        Err(err) => {
            error!(feed = name, error = %err, "feed failed");
            report.push(name, FetchStatus::Failed, err.to_string());
        }
    }
}

// --- news -------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ArticleList {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Clone, Deserialize)]
struct Article {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    seendate: String,
}

fn news_feed(fetcher: &Fetcher, settings: &NewsSettings, assets_dir: &Path) -> Result<String> {
    let list: ArticleList = fetcher.get_json_query(
        GDELT_DOC_URL,
        &[
            ("query", settings.query.clone()),
            ("mode", "artlist".to_string()),
            ("format", "json".to_string()),
            ("maxrecords", settings.max_items.to_string()),
            ("sort", "datedesc".to_string()),
        ],
    )?;

    let mut df = news_frame(list.articles, settings.max_items)?;
    store::write_artifact(assets_dir, "news", &mut df)?;
    Ok(format!("{} articles", df.height()))
}

fn news_frame(mut articles: Vec<Article>, max_items: usize) -> Result<DataFrame> {
    // seendate is %Y%m%dT%H%M%SZ, so lexicographic order is time order.
    articles.sort_by(|a, b| b.seendate.cmp(&a.seendate));
    articles.truncate(max_items);
    if articles.is_empty() {
        return Err(PipelineError::Processing(
            "news feed returned no articles".to_string(),
        ));
    }

    let mut titles = Vec::with_capacity(articles.len());
    let mut media = Vec::with_capacity(articles.len());
    let mut dates = Vec::with_capacity(articles.len());
    let mut links = Vec::with_capacity(articles.len());
    for article in &articles {
        titles.push(collapse_whitespace(&article.title));
        media.push(article.domain.clone());
        dates.push(format_seen_date(&article.seendate));
        links.push(format!("[Link]({})", article.url));
    }

    let columns: Vec<Column> = vec![
        Series::new("Title".into(), titles).into(),
        Series::new("Media".into(), media).into(),
        Series::new("Date".into(), dates).into(),
        Series::new("Link".into(), links).into(),
    ];
    Ok(DataFrame::new(columns)?)
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn format_seen_date(raw: &str) -> String {
    match NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%SZ") {
        Ok(parsed) => parsed.format("%m/%d/%Y, %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}

// --- FX quotes --------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartPayload,
}

#[derive(Debug, Deserialize)]
struct ChartPayload {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    adjclose: Vec<AdjCloseBlock>,
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseBlock {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn fx_feed(fetcher: &Fetcher, instruments: &[InstrumentEntry], assets_dir: &Path) -> Result<String> {
    let (start, end) = quote_window(Local::now().date_naive());

    let mut dates = Vec::new();
    let mut kinds = Vec::new();
    let mut labels = Vec::new();
    let mut values = Vec::new();
    for instrument in instruments {
        let url = format!("{YAHOO_CHART_URL}/{}", instrument.code);
        let response: ChartResponse = fetcher.get_json_query(
            &url,
            &[
                ("period1", start.to_string()),
                ("period2", end.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ],
        )?;

        for (date, value) in chart_rows(&response, &instrument.code)? {
            dates.push(date);
            kinds.push(instrument.kind.clone());
            labels.push(instrument.label.clone());
            values.push(value);
        }
    }

    if dates.is_empty() {
        return Err(PipelineError::Processing(
            "quote feed returned no usable closes".to_string(),
        ));
    }

    let columns: Vec<Column> = vec![
        Series::new("date".into(), dates).into(),
        Series::new("type".into(), kinds).into(),
        Series::new("instrument".into(), labels).into(),
        Series::new("value".into(), values).into(),
    ];
    let mut df = DataFrame::new(columns)?;
    store::write_artifact(assets_dir, "fx_rates", &mut df)?;
    Ok(format!("{} quotes", df.height()))
}

/// One year of daily quotes ending yesterday, as unix second bounds.
fn quote_window(today: NaiveDate) -> (i64, i64) {
    let end = today - Duration::days(1);
    let start = end - Duration::days(365);
    (
        start.and_time(NaiveTime::MIN).and_utc().timestamp(),
        end.and_time(NaiveTime::MIN).and_utc().timestamp(),
    )
}

fn chart_rows(response: &ChartResponse, code: &str) -> Result<Vec<(String, f64)>> {
    let result = response
        .chart
        .result
        .as_ref()
        .and_then(|results| results.first())
        .ok_or_else(|| {
            PipelineError::Processing(format!("no chart data returned for '{code}'"))
        })?;

    let closes = result
        .indicators
        .adjclose
        .first()
        .map(|block| &block.adjclose)
        .filter(|closes| !closes.is_empty())
        .or_else(|| result.indicators.quote.first().map(|block| &block.close))
        .ok_or_else(|| PipelineError::Processing(format!("no close series for '{code}'")))?;

    let mut rows = Vec::new();
    for (ts, close) in result.timestamp.iter().zip(closes.iter()) {
        let Some(value) = close else { continue };
        if let Some(moment) = DateTime::from_timestamp(*ts, 0) {
            rows.push((moment.format("%Y-%m-%d").to_string(), *value));
        }
    }
    Ok(rows)
}

// --- GDP --------------------------------------------------------------

fn gdp_feed(fetcher: &Fetcher, settings: &GdpSettings, assets_dir: &Path) -> Result<String> {
    let payload = fetcher.get_bytes(&settings.url)?;
    let mut df = gdp_frame(&payload, &settings.series)?;
    store::write_artifact(assets_dir, "gdp", &mut df)?;
    Ok(format!("{} years", df.height()))
}

fn gdp_frame(payload: &[u8], series: &str) -> Result<DataFrame> {
    let raw = CsvTableReader.read(payload, &ReadOptions::default())?;
    if raw.width() < 2 {
        return Err(PipelineError::Processing(
            "GDP download must have a period and a value column".to_string(),
        ));
    }

    let names = raw.get_column_names();
    let years = frame::text_values(&raw, names[0].as_str())?;
    let values = frame::numeric_values(&raw, names[1].as_str())?;

    let mut out_years = Vec::new();
    let mut out_values = Vec::new();
    for (year, value) in years.into_iter().zip(values) {
        if let (Some(year), Some(value)) = (year, value) {
            out_years.push(year);
            out_values.push(value / 1e9);
        }
    }
    if out_years.is_empty() {
        return Err(PipelineError::Processing(
            "GDP download held no usable rows".to_string(),
        ));
    }

    let stamp = store::retrieval_stamp();
    let height = out_years.len();
    let columns: Vec<Column> = vec![
        Series::new("Year".into(), out_years).into(),
        Series::new("Value".into(), out_values).into(),
        Series::new("Series".into(), vec![series.to_string(); height]).into(),
        Series::new("Retrieved on".into(), vec![stamp; height]).into(),
    ];
    Ok(DataFrame::new(columns)?)
}
