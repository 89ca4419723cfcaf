use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use sitrep_reader::{ReadOptions, TableFormat};

use crate::error::{PipelineError, Result};

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    // The statistical portals reject requests without a browser-looking UA.
    "Mozilla/9.0".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_news_query() -> String {
    "Ukraine".to_string()
}

fn default_max_items() -> usize {
    50
}

fn default_embed_height() -> u32 {
    540
}

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceEntry>,
    #[serde(default)]
    pub news: NewsSettings,
    #[serde(default, rename = "instrument")]
    pub instruments: Vec<InstrumentEntry>,
    #[serde(default)]
    pub gdp: Option<GdpSettings>,
    #[serde(default, rename = "metric")]
    pub metrics: Vec<MetricEntry>,
    #[serde(default)]
    pub report: ReportSettings,
}

impl Manifest {
    pub fn source(&self, name: &str) -> Option<&SourceEntry> {
        self.sources.iter().find(|source| source.name == name)
    }

    pub fn active_sources(&self) -> impl Iterator<Item = &SourceEntry> {
        self.sources.iter().filter(|source| source.active)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchSettings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    pub url: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub skip_rows: usize,
    #[serde(default)]
    pub sheet: Option<String>,
    #[serde(default)]
    pub sheet_index: Option<usize>,
    #[serde(default)]
    pub row_labels: Vec<RowLabel>,
    #[serde(default)]
    pub columns: Vec<ColumnLabel>,
}

impl SourceEntry {
    pub fn table_format(&self) -> Result<Option<TableFormat>> {
        match self.format.as_deref() {
            None => Ok(None),
            Some(raw) => TableFormat::try_from(raw)
                .map(Some)
                .map_err(PipelineError::Manifest),
        }
    }

    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            skip_rows: self.skip_rows,
            sheet: self.sheet.clone(),
            sheet_index: self.sheet_index,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RowLabel {
    pub item: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub total: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnLabel {
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsSettings {
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_news_query")]
    pub query: String,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            active: false,
            query: default_news_query(),
            max_items: default_max_items(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentEntry {
    pub code: String,
    pub label: String,
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GdpSettings {
    #[serde(default = "default_true")]
    pub active: bool,
    pub url: String,
    pub series: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricEntry {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    pub file: String,
    pub value_column: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub aggregate: bool,
    #[serde(default)]
    pub condition_column: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub source_link: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ReportSettings {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub deployed_url: Option<String>,
    #[serde(default, rename = "note")]
    pub notes: Vec<ReportNote>,
    #[serde(default, rename = "embed")]
    pub embeds: Vec<ReportEmbed>,
    #[serde(default, rename = "reference")]
    pub references: Vec<ReportReference>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportNote {
    pub section: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportEmbed {
    pub section: String,
    pub title: String,
    pub url: String,
    #[serde(default = "default_embed_height")]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportReference {
    pub label: String,
    pub url: String,
}

pub fn parse_manifest(toml_str: &str) -> Result<Manifest> {
    toml::from_str::<Manifest>(toml_str)
        .map_err(|err| PipelineError::Manifest(format!("failed to parse manifest TOML: {err}")))
}

pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let contents = std::fs::read_to_string(path).map_err(|err| {
        PipelineError::Manifest(format!("failed to read {}: {err}", path.display()))
    })?;
    parse_manifest(&contents)
}

#[derive(Debug, Default)]
pub struct PreflightReport {
    pub problems: Vec<String>,
    pub total_sources: usize,
    pub active_sources: usize,
    pub metrics: usize,
    pub instruments: usize,
}

impl PreflightReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Checks the manifest for the mistakes that otherwise surface halfway
/// through a pipeline run. All violations are collected, not just the first.
pub fn preflight_manifest(manifest: &Manifest) -> PreflightReport {
    let mut report = PreflightReport {
        total_sources: manifest.sources.len(),
        active_sources: manifest.active_sources().count(),
        metrics: manifest.metrics.len(),
        instruments: manifest.instruments.len(),
        ..PreflightReport::default()
    };

    let mut seen_names: HashSet<&str> = HashSet::new();
    for source in &manifest.sources {
        if source.name.trim().is_empty() {
            report
                .problems
                .push("source with an empty name".to_string());
            continue;
        }
        if !seen_names.insert(source.name.as_str()) {
            report
                .problems
                .push(format!("duplicate source name '{}'", source.name));
        }
        if source.url.trim().is_empty() {
            report
                .problems
                .push(format!("source '{}' has a blank url", source.name));
        } else if !source.url.starts_with("http://") && !source.url.starts_with("https://") {
            report.problems.push(format!(
                "source '{}' url is not http(s): {}",
                source.name, source.url
            ));
        }
        if let Err(err) = source.table_format() {
            report
                .problems
                .push(format!("source '{}': {err}", source.name));
        }
        if !source.columns.is_empty() && source.columns.iter().all(|column| !column.active) {
            report.problems.push(format!(
                "source '{}' declares column labels but none are active",
                source.name
            ));
        }
        if !source.row_labels.is_empty() && source.row_labels.iter().all(|label| !label.active) {
            report.problems.push(format!(
                "source '{}' declares row labels but none are active",
                source.name
            ));
        }
    }

    let known: HashSet<String> = crate::transforms::expected_artifacts(manifest)
        .into_iter()
        .collect();
    let mut seen_titles: HashSet<&str> = HashSet::new();
    for metric in &manifest.metrics {
        if metric.title.trim().is_empty() {
            report.problems.push("metric with an empty title".to_string());
            continue;
        }
        if !seen_titles.insert(metric.title.as_str()) {
            report
                .problems
                .push(format!("duplicate metric title '{}'", metric.title));
        }
        if !known.contains(&metric.file) {
            report.problems.push(format!(
                "metric '{}' references unknown artifact '{}'",
                metric.title, metric.file
            ));
        }
        match (&metric.condition_column, &metric.condition) {
            (Some(_), None) => report.problems.push(format!(
                "metric '{}' sets condition_column without condition",
                metric.title
            )),
            (None, Some(_)) => report.problems.push(format!(
                "metric '{}' sets condition without condition_column",
                metric.title
            )),
            _ => {}
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [[source]]
        name = "grain"
        url = "https://example.org/grain.zip"
        format = "zip"

        [[source.row_labels]]
        item = "Total"
        total = true

        [news]
        query = "Ukraine economy"

        [[metric]]
        title = "Refugees"
        file = "humanitarian"
        value_column = "Refugees"
        source = "UNHCR"
    "#;

    #[test]
    fn parses_minimal_manifest() {
        let manifest = parse_manifest(MINIMAL).expect("manifest should parse");
        assert_eq!(manifest.sources.len(), 1);
        assert!(manifest.sources[0].active);
        assert_eq!(manifest.sources[0].skip_rows, 0);
        assert!(manifest.sources[0].row_labels[0].total);
        assert!(manifest.news.active);
        assert_eq!(manifest.news.query, "Ukraine economy");
        assert_eq!(manifest.news.max_items, 50);
        assert_eq!(manifest.fetch.user_agent, "Mozilla/9.0");
        assert_eq!(manifest.fetch.timeout_secs, 30);
    }

    #[test]
    fn news_defaults_to_inactive_when_absent() {
        let manifest = parse_manifest("").expect("empty manifest should parse");
        assert!(!manifest.news.active);
        assert!(manifest.gdp.is_none());
        assert!(manifest.sources.is_empty());
    }

    #[test]
    fn preflight_accepts_well_formed_manifest() {
        let manifest = parse_manifest(MINIMAL).expect("manifest should parse");
        let report = preflight_manifest(&manifest);
        assert!(report.is_ok(), "unexpected problems: {:?}", report.problems);
        assert_eq!(report.total_sources, 1);
        assert_eq!(report.active_sources, 1);
    }

    #[test]
    fn preflight_collects_all_violations() {
        let raw = r#"
            [[source]]
            name = "grain"
            url = "ftp://example.org/grain.zip"
            format = "parquet"

            [[source]]
            name = "grain"
            url = ""

            [[metric]]
            title = "Refugees"
            file = "nonexistent"
            value_column = "Refugees"
            condition = "total"

            [[metric]]
            title = "Refugees"
            file = "humanitarian"
            value_column = "Refugees"
        "#;
        let manifest = parse_manifest(raw).expect("manifest should parse");
        let report = preflight_manifest(&manifest);
        assert!(!report.is_ok());

        let joined = report.problems.join("\n");
        assert!(joined.contains("not http(s)"), "{joined}");
        assert!(joined.contains("unknown table format"), "{joined}");
        assert!(joined.contains("duplicate source name"), "{joined}");
        assert!(joined.contains("blank url"), "{joined}");
        assert!(joined.contains("unknown artifact"), "{joined}");
        assert!(joined.contains("condition without condition_column"), "{joined}");
        assert!(joined.contains("duplicate metric title"), "{joined}");
    }

    #[test]
    fn inactive_column_labels_are_flagged() {
        let raw = r#"
            [[source]]
            name = "policy_rate"
            url = "https://example.org/rates.xlsx"

            [[source.columns]]
            name = "Date"
            active = false
        "#;
        let manifest = parse_manifest(raw).expect("manifest should parse");
        let report = preflight_manifest(&manifest);
        assert!(report
            .problems
            .iter()
            .any(|problem| problem.contains("none are active")));
    }
}
