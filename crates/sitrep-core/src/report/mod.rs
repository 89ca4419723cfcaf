use std::fs;
use std::path::Path;

use polars::prelude::DataFrame;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::frame;
use crate::manifest::Manifest;
use crate::store;

mod charts;
mod format;
mod html;

pub use charts::COLOR_SEQUENCE;
pub use format::{DeltaColor, ValueFormat};

use format::{delta_arrow, delta_class, format_value};
use html::Page;

const NBU: &str = "National Bank of Ukraine";
const NEWS_ITEMS_SHOWN: usize = 5;
const SOUNDNESS_QUARTERS: usize = 12;
const POLICY_BAR_THRESHOLD: usize = 3;

const CRIMEA_FULL: &str = "Autonomous Republic of Crimea and the city of Sevastopol";
const CRIMEA_SHORT: &str = "Crimea and Sevastopol";

const SCALE_K: ValueFormat = ValueFormat::Scaled {
    power: 3,
    suffix: None,
};
const SCALE_MN: ValueFormat = ValueFormat::Scaled {
    power: 6,
    suffix: None,
};
const SCALE_TN: ValueFormat = ValueFormat::Scaled {
    power: 6,
    suffix: Some("tn"),
};

/// A metric tile: the label shown on the page, the `metrics.csv` row it
/// reads, and how the value and its change are displayed.
struct Tile {
    label: &'static str,
    metric: &'static str,
    format: ValueFormat,
    delta: DeltaColor,
}

/// Renders `report.html` from `metrics.csv` and the transformed files.
/// Missing inputs degrade to placeholders so a partially run pipeline
/// still produces a viewable page.
pub fn render_report(manifest: &Manifest, assets_dir: &Path) -> Result<()> {
    store::ensure_assets_dir(assets_dir)?;
    let metrics = MetricsTable::load(assets_dir);
    let mut page = Page::new(&manifest.report.title);

    page.chapters(&[
        "Key indicators",
        "War and Economics",
        "War and reconstruction",
        "References",
    ]);

    key_indicators_section(&mut page, &metrics);
    news_section(&mut page, manifest, assets_dir);
    casualties_section(&mut page, manifest, &metrics, assets_dir);
    displacement_section(&mut page, manifest, &metrics, assets_dir);

    page.heading("War and Economics");
    monetary_section(&mut page, manifest, &metrics, assets_dir);
    national_bank_section(&mut page, manifest, &metrics, assets_dir);
    financial_system_section(&mut page, manifest, &metrics, assets_dir);
    government_finance_section(&mut page, manifest, &metrics, assets_dir);

    reconstruction_section(&mut page, manifest, &metrics, assets_dir);
    references_section(&mut page, manifest);

    let path = assets_dir.join(store::REPORT_FILE);
    fs::write(&path, page.finish())?;
    info!(path = %path.display(), "report rendered");
    Ok(())
}

/// `metrics.csv` loaded once per render. Lookups are by metric title; a
/// missing table, row, or `NA` cell all surface as `None`.
struct MetricsTable {
    table: Option<DataFrame>,
}

impl MetricsTable {
    fn load(assets_dir: &Path) -> Self {
        let path = assets_dir.join(store::METRICS_FILE);
        match store::read_csv_untyped(&path) {
            Ok(table) => MetricsTable { table: Some(table) },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "metrics table unavailable, tiles render NA");
                MetricsTable { table: None }
            }
        }
    }

    fn cell(&self, title: &str, column: &str) -> Option<f64> {
        let table = self.table.as_ref()?;
        let titles = frame::text_values(table, "Title").ok()?;
        let row = titles
            .iter()
            .position(|cell| cell.as_deref() == Some(title))?;
        let values = frame::text_values(table, column).ok()?;
        values.get(row)?.as_deref().and_then(frame::parse_number)
    }

    fn last(&self, title: &str) -> Option<f64> {
        self.cell(title, "Last value")
    }

    fn change(&self, title: &str) -> Option<f64> {
        self.cell(title, "Change")
    }
}

fn render_tile(metrics: &MetricsTable, tile: &Tile) -> String {
    let value = match metrics.last(tile.metric) {
        Some(value) => format_value(value, tile.format),
        None => {
            warn!(metric = tile.metric, "metric unavailable, tile renders NA");
            "NA".to_string()
        }
    };
    let delta = match tile.delta {
        DeltaColor::Off => None,
        direction => metrics.change(tile.metric).map(|change| {
            let text = format!(
                "{} {}",
                delta_arrow(change),
                format_value(change, tile.format)
            );
            (delta_class(change, direction), text.trim().to_string())
        }),
    };
    html::tile(tile.label, &value, delta)
}

fn push_tiles(page: &mut Page, metrics: &MetricsTable, tiles: &[Tile]) {
    let rendered: Vec<String> = tiles.iter().map(|tile| render_tile(metrics, tile)).collect();
    page.tiles(&rendered);
}

fn push_note(page: &mut Page, manifest: &Manifest, section: &str) {
    if let Some(note) = manifest
        .report
        .notes
        .iter()
        .find(|note| note.section == section)
    {
        page.note(&note.title, &note.body);
    }
}

fn push_chart(page: &mut Page, label: &str, chart: Result<Value>) {
    match chart {
        Ok(spec) => page.chart(&spec),
        Err(err) => {
            warn!(chart = label, error = %err, "chart unavailable, rendering placeholder");
            page.placeholder(label);
        }
    }
}

// --- sections

fn key_indicators_section(page: &mut Page, metrics: &MetricsTable) {
    page.heading("Key indicators");
    push_tiles(
        page,
        metrics,
        &[
            Tile {
                label: "Refugees",
                metric: "Refugees",
                format: SCALE_MN,
                delta: DeltaColor::Inverse,
            },
            Tile {
                label: "Internally displaced",
                metric: "Internally displaced",
                format: SCALE_MN,
                delta: DeltaColor::Inverse,
            },
            Tile {
                label: "Reconstruction needs estimated, USD",
                metric: "Reconstruction needs",
                format: ValueFormat::Billions,
                delta: DeltaColor::Off,
            },
            Tile {
                label: "UA International Reserves, USD bn",
                metric: "International Reserves",
                format: ValueFormat::Billions,
                delta: DeltaColor::Off,
            },
        ],
    );
    page.divider();
}

fn news_section(page: &mut Page, manifest: &Manifest, assets_dir: &Path) {
    page.subheading("Latest news");
    page.italic("GDELT news feed");
    push_note(page, manifest, "news");
    match store::read_artifact(assets_dir, "news").and_then(|df| news_items(&df)) {
        Ok(items) => {
            for item in &items {
                page.blockquote(item);
            }
        }
        Err(err) => {
            warn!(error = %err, "news feed unavailable, rendering placeholder");
            page.placeholder("Latest news");
        }
    }
    page.divider();
}

fn casualties_section(page: &mut Page, manifest: &Manifest, metrics: &MetricsTable, assets_dir: &Path) {
    page.subheading("Civilian casualties");
    push_tiles(
        page,
        metrics,
        &[
            Tile {
                label: "Civilians killed, confirmed",
                metric: "Civilians killed, confirmed",
                format: SCALE_K,
                delta: DeltaColor::Inverse,
            },
            Tile {
                label: "Civilians injured, confirmed",
                metric: "Civilians injured, confirmed",
                format: SCALE_K,
                delta: DeltaColor::Inverse,
            },
        ],
    );
    push_note(page, manifest, "casualties");
    page.begin_row();
    push_chart(
        page,
        "Civilian deaths, confirmed",
        humanitarian_chart(assets_dir, "Civilian deaths, confirmed"),
    );
    push_chart(
        page,
        "Civilians injured, confirmed",
        humanitarian_chart(assets_dir, "Civilians injured, confirmed"),
    );
    page.end_row();
    page.divider();
}

fn displacement_section(page: &mut Page, manifest: &Manifest, metrics: &MetricsTable, assets_dir: &Path) {
    page.subheading("Displacement");
    push_tiles(
        page,
        metrics,
        &[
            Tile {
                label: "Refugees",
                metric: "Refugees",
                format: SCALE_MN,
                delta: DeltaColor::Inverse,
            },
            Tile {
                label: "Internally displaced",
                metric: "Internally displaced",
                format: SCALE_MN,
                delta: DeltaColor::Inverse,
            },
        ],
    );
    push_note(page, manifest, "displacement");
    page.begin_row();
    push_chart(
        page,
        "Internally Displaced",
        humanitarian_chart(assets_dir, "Internally Displaced"),
    );
    push_chart(page, "Refugees", humanitarian_chart(assets_dir, "Refugees"));
    page.end_row();
    for embed in manifest
        .report
        .embeds
        .iter()
        .filter(|embed| embed.section == "displacement")
    {
        page.iframe(&embed.title, &embed.url, embed.height);
    }
    page.divider();
}

fn monetary_section(page: &mut Page, manifest: &Manifest, metrics: &MetricsTable, assets_dir: &Path) {
    page.subheading("Monetary sector");
    push_tiles(
        page,
        metrics,
        &[
            Tile {
                label: "Inflation, yoy",
                metric: "Inflation rate",
                format: ValueFormat::Percent,
                delta: DeltaColor::Inverse,
            },
            Tile {
                label: "Lending rate, households",
                metric: "Lending rate, households",
                format: ValueFormat::Percent,
                delta: DeltaColor::Off,
            },
            Tile {
                label: "Lending rate, corporates",
                metric: "Lending rate, corporates",
                format: ValueFormat::Percent,
                delta: DeltaColor::Off,
            },
            Tile {
                label: "FX rate: UAH/USD",
                metric: "FX rate: UAH/USD",
                format: ValueFormat::Plain,
                delta: DeltaColor::Inverse,
            },
        ],
    );
    push_note(page, manifest, "monetary");
    page.begin_row();
    push_chart(page, "Inflation, yoy", cpi_12m_chart(assets_dir));
    match manifest.instruments.first() {
        Some(instrument) => push_chart(page, "FX rate", fx_chart(assets_dir, &instrument.label)),
        None => page.placeholder("FX rate"),
    }
    page.end_row();
    page.begin_row();
    push_chart(page, "Inflation by components", cpi_last_chart(assets_dir));
    push_chart(
        page,
        "Lending rates by region",
        interest_rates_chart(assets_dir),
    );
    page.end_row();
    page.divider();
}

fn national_bank_section(page: &mut Page, manifest: &Manifest, metrics: &MetricsTable, assets_dir: &Path) {
    page.subheading("National bank tools");
    push_note(page, manifest, "national_bank");
    push_tiles(
        page,
        metrics,
        &[
            Tile {
                label: "Key rate",
                metric: "Key rate",
                format: ValueFormat::Percent,
                delta: DeltaColor::Off,
            },
            Tile {
                label: "International reserves, USD",
                metric: "International Reserves",
                format: ValueFormat::Billions,
                delta: DeltaColor::Off,
            },
        ],
    );
    page.begin_row();
    push_chart(page, "Policy rate dynamics", policy_rate_chart(assets_dir));
    push_chart(page, "International reserves", reserves_chart(assets_dir));
    page.end_row();
    push_chart(
        page,
        "Bond placements and yields",
        bond_yields_chart(assets_dir),
    );
    page.divider();
}

fn financial_system_section(page: &mut Page, manifest: &Manifest, metrics: &MetricsTable, assets_dir: &Path) {
    page.subheading("Financial system");
    push_note(page, manifest, "financial_system");
    push_tiles(
        page,
        metrics,
        &[
            Tile {
                label: "NPL ratio",
                metric: "NPL ratio",
                format: ValueFormat::Percent,
                delta: DeltaColor::Inverse,
            },
            Tile {
                label: "FX position to capital",
                metric: "FX position to capital",
                format: ValueFormat::Percent,
                delta: DeltaColor::Normal,
            },
        ],
    );
    page.begin_row();
    push_chart(
        page,
        "Nonperforming loans",
        soundness_chart(
            assets_dir,
            "Nonperforming loans net of provisions to capital",
            false,
        ),
    );
    push_chart(
        page,
        "Net open FX position",
        soundness_chart(
            assets_dir,
            "Net open position in foreign exchange to capital",
            true,
        ),
    );
    page.end_row();
    page.divider();
}

fn government_finance_section(page: &mut Page, manifest: &Manifest, metrics: &MetricsTable, assets_dir: &Path) {
    page.subheading("Government finance");
    push_tiles(
        page,
        metrics,
        &[
            Tile {
                label: "Yield, UAH govt bonds",
                metric: "Yield, UAH govt bonds",
                format: ValueFormat::Percent,
                delta: DeltaColor::Inverse,
            },
            Tile {
                label: "Fiscal income, UAH",
                metric: "Fiscal income, total",
                format: SCALE_TN,
                delta: DeltaColor::Off,
            },
            Tile {
                label: "Fiscal expenses, UAH",
                metric: "Fiscal expenses, total",
                format: SCALE_TN,
                delta: DeltaColor::Off,
            },
        ],
    );
    push_note(page, manifest, "government_finance");
    page.begin_row();
    push_chart(
        page,
        "Government income",
        fiscal_chart(assets_dir, "fiscal_income", "General Government Income"),
    );
    push_chart(
        page,
        "Government expenses",
        fiscal_chart(assets_dir, "fiscal_expenses", "General Government Expenses"),
    );
    page.end_row();
    push_chart(
        page,
        "Deficit financing",
        fiscal_chart(
            assets_dir,
            "fiscal_finance",
            "General Government Deficit Finance Source",
        ),
    );
    page.divider();
}

fn reconstruction_section(page: &mut Page, manifest: &Manifest, metrics: &MetricsTable, assets_dir: &Path) {
    page.heading("War and reconstruction");
    push_tiles(
        page,
        metrics,
        &[
            Tile {
                label: "Damage estimated, USD",
                metric: "Damage caused",
                format: ValueFormat::Billions,
                delta: DeltaColor::Off,
            },
            Tile {
                label: "Reconstruction needs estimated, USD",
                metric: "Reconstruction needs",
                format: ValueFormat::Billions,
                delta: DeltaColor::Off,
            },
            Tile {
                label: "Ukraine GDP, current USD",
                metric: "GDP Ukraine, current USD",
                format: ValueFormat::Billions,
                delta: DeltaColor::Off,
            },
        ],
    );
    push_note(page, manifest, "reconstruction");
    push_chart(
        page,
        "Damage assessment",
        sectors_treemap(
            assets_dir,
            "Damage",
            "Damage assessment as of February 2024, USD bn",
        ),
    );
    push_chart(page, "Damage by regions", regions_chart(assets_dir));
    push_chart(
        page,
        "Reconstruction needs assessment",
        sectors_treemap(
            assets_dir,
            "Needs",
            "Reconstruction needs assessment as of February 2024, USD bn",
        ),
    );
    page.divider();
}

fn references_section(page: &mut Page, manifest: &Manifest) {
    page.heading("References");
    let items: Vec<(&str, &str)> = manifest
        .report
        .references
        .iter()
        .map(|reference| (reference.label.as_str(), reference.url.as_str()))
        .collect();
    page.link_list(&items);
}

// --- chart builders, one per figure

fn news_items(df: &DataFrame) -> Result<Vec<String>> {
    let titles = frame::text_values(df, "Title")?;
    let media = frame::text_values(df, "Media")?;
    let dates = frame::text_values(df, "Date")?;
    let links = frame::text_values(df, "Link")?;
    let mut items = Vec::new();
    for row in 0..df.height().min(NEWS_ITEMS_SHOWN) {
        items.push(format!(
            "<strong>{}</strong> | <em>{}</em> | {} | Published: {}",
            html::escape(titles[row].as_deref().unwrap_or("")),
            html::escape(media[row].as_deref().unwrap_or("")),
            html::markdown_link(links[row].as_deref().unwrap_or("")),
            html::escape(dates[row].as_deref().unwrap_or(""))
        ));
    }
    if items.is_empty() {
        return Err(PipelineError::Validation(
            "news feed holds no rows".to_string(),
        ));
    }
    Ok(items)
}

fn first_text(df: &DataFrame, name: &str) -> Result<String> {
    Ok(frame::text_values(df, name)?
        .into_iter()
        .flatten()
        .next()
        .unwrap_or_default())
}

fn humanitarian_chart(assets_dir: &Path, series: &str) -> Result<Value> {
    let df = store::read_artifact(assets_dir, "humanitarian")?;
    let x = frame::text_values(&df, "Date")?;
    let y = frame::numeric_values(&df, series)?;
    Ok(charts::area(
        &charts::chart_title(series, "UNHCR | HDX"),
        "Date",
        series,
        &x,
        &y,
    ))
}

fn fx_chart(assets_dir: &Path, instrument: &str) -> Result<Value> {
    let df = store::read_artifact(assets_dir, "fx_rates")?;
    let labels = frame::text_values(&df, "instrument")?;
    let dates = frame::text_values(&df, "date")?;
    let values = frame::numeric_values(&df, "value")?;
    let mut x = Vec::new();
    let mut y = Vec::new();
    for row in 0..df.height() {
        if labels[row].as_deref() == Some(instrument) {
            x.push(dates[row].clone());
            y.push(values[row]);
        }
    }
    if x.is_empty() {
        return Err(PipelineError::Validation(format!(
            "no quotes for instrument '{instrument}'"
        )));
    }
    Ok(charts::area(
        &charts::chart_title("FX rate", "Yahoo Finance"),
        "Date",
        instrument,
        &x,
        &y,
    ))
}

fn cpi_12m_chart(assets_dir: &Path) -> Result<Value> {
    let df = store::read_artifact(assets_dir, "cpi_12m")?;
    let series = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .find(|name| name != "Date" && name != "Retrieved")
        .ok_or_else(|| {
            PipelineError::Validation("tf_cpi_12m.csv has no data column".to_string())
        })?;
    let x = frame::text_values(&df, "Date")?;
    let y = frame::numeric_values(&df, &series)?;
    Ok(charts::area(
        &charts::chart_title(&series, NBU),
        "Date",
        "%",
        &x,
        &y,
    ))
}

fn cpi_last_chart(assets_dir: &Path) -> Result<Value> {
    let df = store::read_artifact(assets_dir, "cpi_last")?;
    let as_of = first_text(&df, "Date")?;
    let x = frame::numeric_values(&df, "Value")?;
    let y = frame::text_values(&df, "Item")?;
    Ok(charts::hbar(
        &charts::chart_title(&format!("Inflation by components as of {as_of}"), NBU),
        "%",
        &x,
        &y,
    ))
}

fn interest_rates_chart(assets_dir: &Path) -> Result<Value> {
    let df = store::read_artifact(assets_dir, "interest_rates")?;
    let as_of = first_text(&df, "Retrieved on")?;
    let x = frame::numeric_values(&df, "Nationals: average")?;
    let y: Vec<Option<String>> = frame::text_values(&df, "Region")?
        .into_iter()
        .map(|region| {
            region.map(|name| {
                if name == CRIMEA_FULL {
                    CRIMEA_SHORT.to_string()
                } else {
                    name
                }
            })
        })
        .collect();
    Ok(charts::hbar(
        &charts::chart_title(
            &format!("Lending rates by region (only nationals), in % as of {as_of}"),
            NBU,
        ),
        "%",
        &x,
        &y,
    ))
}

fn policy_rate_chart(assets_dir: &Path) -> Result<Value> {
    let df = store::read_artifact(assets_dir, "policy_rate")?;
    let x = frame::text_values(&df, "Date")?;
    let y = frame::numeric_values(&df, "Reference rate")?;
    let title = charts::chart_title("Policy rate dynamics, %", NBU);
    if df.height() < POLICY_BAR_THRESHOLD {
        Ok(charts::vbar(&title, "Date", "Reference rate", &x, &y, None))
    } else {
        Ok(charts::area(&title, "Date", "Reference rate", &x, &y))
    }
}

fn reserves_chart(assets_dir: &Path) -> Result<Value> {
    let df = store::read_artifact(assets_dir, "international_reserves")?;
    let as_of = first_text(&df, "Date")?;
    let totals = frame::text_values(&df, "Total")?;
    let values = frame::numeric_values(&df, "Value")?;
    let items = frame::text_values(&df, "Item")?;
    let mut x = Vec::new();
    let mut y = Vec::new();
    for row in 0..df.height() {
        if totals[row].as_deref() != Some("true") {
            x.push(values[row]);
            y.push(items[row].clone());
        }
    }
    Ok(charts::hbar(
        &charts::chart_title(&format!("International reserves, bn USD as of {as_of}"), NBU),
        "USD bn",
        &x,
        &y,
    ))
}

fn bond_yields_chart(assets_dir: &Path) -> Result<Value> {
    let df = store::read_artifact(assets_dir, "bond_yields")?;
    let months = frame::text_values(&df, "month")?;
    let amounts = frame::numeric_values(&df, "UAH: amount")?;
    let yields = frame::numeric_values(&df, "UAH: weighted yield")?;
    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut colors = Vec::new();
    for row in 0..df.height() {
        if months[row]
            .as_deref()
            .is_some_and(|month| month.starts_with("Total"))
        {
            continue;
        }
        x.push(months[row].clone());
        y.push(amounts[row]);
        colors.push(yields[row]);
    }
    Ok(charts::vbar(
        &charts::chart_title("Bond Placements and Their Yields, UAH mn", NBU),
        "",
        "UAH: amount",
        &x,
        &y,
        Some(("UAH: weighted yield", &colors)),
    ))
}

fn soundness_chart(assets_dir: &Path, series: &str, as_bars: bool) -> Result<Value> {
    let df = store::read_artifact(assets_dir, "financial_soundness")?;
    let quarters = frame::text_values(&df, "Quarter")?;
    let values = frame::numeric_values(&df, series)?;
    let start = quarters.len().saturating_sub(SOUNDNESS_QUARTERS);
    let title = charts::chart_title(&format!("{series}, in %"), NBU);
    if as_bars {
        Ok(charts::vbar(
            &title,
            "Date Quarter",
            series,
            &quarters[start..],
            &values[start..],
            None,
        ))
    } else {
        Ok(charts::area(
            &title,
            "Date Quarter",
            series,
            &quarters[start..],
            &values[start..],
        ))
    }
}

fn fiscal_chart(assets_dir: &Path, artifact: &str, heading: &str) -> Result<Value> {
    let df = store::read_artifact(assets_dir, artifact)?;
    let as_of = first_text(&df, "Date")?;
    let x = frame::numeric_values(&df, "Value")?;
    let y = frame::text_values(&df, "Item")?;
    Ok(charts::hbar(
        &charts::chart_title(&format!("{heading} as of {as_of}"), NBU),
        "UAH mn",
        &x,
        &y,
    ))
}

fn sectors_treemap(assets_dir: &Path, value_column: &str, title: &str) -> Result<Value> {
    let df = store::read_artifact(assets_dir, "reconstruction_sectors")?;
    let types = frame::text_values(&df, "Sector Type")?;
    let sectors = frame::text_values(&df, "Sector")?;
    let values = frame::numeric_values(&df, value_column)?;
    let mut rows = Vec::new();
    for row in 0..df.height() {
        if let (Some(kind), Some(sector), Some(value)) = (&types[row], &sectors[row], values[row]) {
            rows.push((kind.clone(), sector.clone(), value));
        }
    }
    if rows.is_empty() {
        return Err(PipelineError::Validation(format!(
            "tf_reconstruction_sectors.csv holds no {value_column} rows"
        )));
    }
    Ok(charts::treemap(
        &charts::chart_title(title, "World Bank (2024)"),
        &rows,
    ))
}

fn regions_chart(assets_dir: &Path) -> Result<Value> {
    let df = store::read_artifact(assets_dir, "reconstruction_regions")?;
    let groups = frame::text_values(&df, "Oblast type")?;
    let oblasts = frame::text_values(&df, "Oblast")?;
    let damage = frame::numeric_values(&df, "Damage")?;
    let mut rows = Vec::new();
    for row in 0..df.height() {
        if let (Some(group), Some(oblast), Some(value)) = (&groups[row], &oblasts[row], damage[row])
        {
            rows.push((group.clone(), oblast.clone(), value));
        }
    }
    if rows.is_empty() {
        return Err(PipelineError::Validation(
            "tf_reconstruction_regions.csv holds no damage rows".to_string(),
        ));
    }
    Ok(charts::grouped_hbar(
        &charts::chart_title("Damage by regions, USD bn", "World Bank (2024)"),
        "USD bn",
        &rows,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse_manifest;
    use polars::prelude::*;

    fn write_metrics(assets_dir: &Path) {
        let columns: Vec<Column> = vec![
            Series::new(
                "Title".into(),
                vec!["Refugees", "Internally displaced", "Key rate"],
            )
            .into(),
            Series::new("Subtitle".into(), vec![""; 3]).into(),
            Series::new(
                "Last value".into(),
                vec!["6340000", "3700000", "15.5"],
            )
            .into(),
            Series::new("Previous value".into(), vec!["6200000", "3650000", "NA"]).into(),
            Series::new("Change".into(), vec!["140000", "50000", "NA"]).into(),
            Series::new("Unit".into(), vec!["mn", "mn", "%"]).into(),
            Series::new("Source".into(), vec!["UNHCR"; 3]).into(),
            Series::new("Source link".into(), vec![""; 3]).into(),
            Series::new("Last updated".into(), vec!["08/25/2026, 10:00:00"; 3]).into(),
        ];
        let mut df = DataFrame::new(columns).expect("frame");
        store::write_csv(&assets_dir.join(store::METRICS_FILE), &mut df).expect("write failed");
    }

    fn write_humanitarian(assets_dir: &Path) {
        let columns: Vec<Column> = vec![
            Series::new("Refugees".into(), vec![6200000.0f64, 6250000.0]).into(),
            Series::new("Internally Displaced".into(), vec![3650000.0f64, 3700000.0]).into(),
            Series::new(
                "Civilian deaths, confirmed".into(),
                vec![10500.0f64, 10580.0],
            )
            .into(),
            Series::new(
                "Civilians injured, confirmed".into(),
                vec![19800.0f64, 19875.0],
            )
            .into(),
            Series::new("Date".into(), vec!["2026-07-01", "2026-08-01"]).into(),
        ];
        let mut df = DataFrame::new(columns).expect("frame");
        store::write_artifact(assets_dir, "humanitarian", &mut df).expect("write failed");
    }

    fn write_news(assets_dir: &Path) {
        let columns: Vec<Column> = vec![
            Series::new(
                "Title".into(),
                vec!["Reserves hit record", "Rates on hold"],
            )
            .into(),
            Series::new("Media".into(), vec!["example.com", "sample.org"]).into(),
            Series::new(
                "Date".into(),
                vec!["08/24/2026, 21:30", "08/24/2026, 18:00"],
            )
            .into(),
            Series::new(
                "Link".into(),
                vec![
                    "[Link](https://example.com/reserves)",
                    "[Link](https://sample.org/rates)",
                ],
            )
            .into(),
        ];
        let mut df = DataFrame::new(columns).expect("frame");
        store::write_artifact(assets_dir, "news", &mut df).expect("write failed");
    }

    fn report_manifest() -> crate::manifest::Manifest {
        parse_manifest(
            r#"
            [report]
            title = "Situation in Ukraine"

            [[report.note]]
            section = "displacement"
            title = "How to interpret displacement data"
            body = "Border crossings are not unique individuals."

            [[report.reference]]
            label = "UNHCR. Ukraine Refugee Situation"
            url = "https://data.unhcr.org/en/situations/ukraine"
        "#,
        )
        .expect("manifest")
    }

    #[test]
    fn renders_a_page_with_placeholders_when_assets_are_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = report_manifest();

        render_report(&manifest, dir.path()).expect("render failed");

        let html = std::fs::read_to_string(dir.path().join(store::REPORT_FILE)).expect("report");
        assert!(html.contains("Situation in Ukraine"));
        assert!(html.contains("unavailable"));
        assert!(html.contains(">NA<"));
        assert!(html.contains("War and reconstruction"));
    }

    #[test]
    fn renders_tiles_and_charts_from_available_assets() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_metrics(dir.path());
        write_humanitarian(dir.path());
        write_news(dir.path());
        let manifest = report_manifest();

        render_report(&manifest, dir.path()).expect("render failed");

        let html = std::fs::read_to_string(dir.path().join(store::REPORT_FILE)).expect("report");
        assert!(html.contains("6.3mn"));
        assert!(html.contains("Plotly.newPlot(\"chart-0\""));
        assert!(html.contains("Reserves hit record"));
        assert!(html.contains("https://example.com/reserves"));
        assert!(html.contains("How to interpret displacement data"));
        assert!(html.contains("https://data.unhcr.org/en/situations/ukraine"));
    }

    #[test]
    fn news_items_render_the_top_five_rows() {
        let columns: Vec<Column> = vec![
            Series::new(
                "Title".into(),
                (0..7).map(|i| format!("Story {i}")).collect::<Vec<_>>(),
            )
            .into(),
            Series::new("Media".into(), vec!["outlet"; 7]).into(),
            Series::new("Date".into(), vec!["08/24/2026, 21:30"; 7]).into(),
            Series::new("Link".into(), vec!["[Link](https://example.com)"; 7]).into(),
        ];
        let df = DataFrame::new(columns).expect("frame");

        let items = news_items(&df).expect("items");
        assert_eq!(items.len(), 5);
        assert!(items[0].contains("<strong>Story 0</strong>"));
        assert!(items[0].contains("<a href=\"https://example.com\">Link</a>"));
    }

    #[test]
    fn metric_lookup_treats_na_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_metrics(dir.path());

        let metrics = MetricsTable::load(dir.path());
        assert_eq!(metrics.last("Refugees"), Some(6340000.0));
        assert_eq!(metrics.change("Key rate"), None);
        assert_eq!(metrics.last("Unknown"), None);
    }

    #[test]
    fn policy_chart_switches_to_bars_for_short_series() {
        let dir = tempfile::tempdir().expect("tempdir");
        let columns: Vec<Column> = vec![
            Series::new("Date".into(), vec!["04.06.2026", "19.08.2026"]).into(),
            Series::new("Reference rate".into(), vec![15.5f64, 15.5]).into(),
            Series::new("Retrieved on".into(), vec!["08/25/2026, 10:00:00"; 2]).into(),
        ];
        let mut df = DataFrame::new(columns).expect("frame");
        store::write_artifact(dir.path(), "policy_rate", &mut df).expect("write failed");

        let spec = policy_rate_chart(dir.path()).expect("chart");
        assert_eq!(spec["data"][0]["type"], "bar");
    }

    #[test]
    fn bond_chart_drops_annual_total_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let columns: Vec<Column> = vec![
            Series::new(
                "month".into(),
                vec!["January", "Total for the year 2025", "February"],
            )
            .into(),
            Series::new("UAH: amount".into(), vec![100.0f64, 1200.0, 110.0]).into(),
            Series::new("UAH: weighted yield".into(), vec![18.2f64, 18.5, 19.0]).into(),
        ];
        let mut df = DataFrame::new(columns).expect("frame");
        store::write_artifact(dir.path(), "bond_yields", &mut df).expect("write failed");

        let spec = bond_yields_chart(dir.path()).expect("chart");
        let x = spec["data"][0]["x"].as_array().unwrap();
        assert_eq!(x.len(), 2);
        assert_eq!(x[0], "January");
        assert_eq!(x[1], "February");
    }

    #[test]
    fn reserves_chart_excludes_the_total_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let columns: Vec<Column> = vec![
            Series::new("Item".into(), vec!["Total reserves", "Convertible currency"]).into(),
            Series::new("Value".into(), vec![44.0f64, 37.0]).into(),
            Series::new("Total".into(), vec![true, false]).into(),
            Series::new("Date".into(), vec!["June "; 2]).into(),
        ];
        let mut df = DataFrame::new(columns).expect("frame");
        store::write_artifact(dir.path(), "international_reserves", &mut df)
            .expect("write failed");

        let spec = reserves_chart(dir.path()).expect("chart");
        let y = spec["data"][0]["y"].as_array().unwrap();
        assert_eq!(y.len(), 1);
        assert_eq!(y[0], "Convertible currency");
    }

    #[test]
    fn interest_chart_shortens_the_crimea_label() {
        let dir = tempfile::tempdir().expect("tempdir");
        let columns: Vec<Column> = vec![
            Series::new("Region".into(), vec!["Ukraine", CRIMEA_FULL]).into(),
            Series::new("Nationals: average".into(), vec![24.5f64, 0.0]).into(),
            Series::new("Retrieved on".into(), vec!["08/25/2026, 10:00:00"; 2]).into(),
        ];
        let mut df = DataFrame::new(columns).expect("frame");
        store::write_artifact(dir.path(), "interest_rates", &mut df).expect("write failed");

        let spec = interest_rates_chart(dir.path()).expect("chart");
        let y = spec["data"][0]["y"].as_array().unwrap();
        assert_eq!(y[1], CRIMEA_SHORT);
    }
}
