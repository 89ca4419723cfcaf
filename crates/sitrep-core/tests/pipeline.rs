use std::path::Path;

use polars::prelude::*;

use sitrep_core::manifest::{parse_manifest, Manifest};
use sitrep_core::metrics::{update_metrics, MetricStatus};
use sitrep_core::report::render_report;
use sitrep_core::store;
use sitrep_core::transforms::{run_transforms, TransformStatus};

fn pipeline_manifest() -> Manifest {
    parse_manifest(
        r#"
        [[source]]
        name = "humanitarian"
        url = "https://example.com/humanitarian.csv"
        format = "csv"

        [[source]]
        name = "international_reserves"
        url = "https://example.com/reserves.xlsx"
        format = "xlsx"

        [[source.row_labels]]
        item = "Official reserve assets"
        total = true

        [[source.row_labels]]
        item = "Foreign currency reserves"

        [[source.row_labels]]
        item = "Monetary gold"

        [[metric]]
        title = "Refugees"
        subtitle = "UNHCR registered"
        file = "humanitarian"
        value_column = "Refugees"
        unit = "mn"
        source = "UNHCR"
        source_link = "https://data.unhcr.org/en/situations/ukraine"

        [[metric]]
        title = "International Reserves"
        file = "international_reserves"
        value_column = "Value"
        aggregate = true
        condition_column = "Total"
        condition = "true"
        unit = "bn"
        source = "National Bank of Ukraine"

        [report]
        title = "Humanitarian and Economic Situation in Ukraine"
        "#,
    )
    .expect("manifest")
}

fn write_humanitarian_snapshot(assets_dir: &Path) {
    let columns: Vec<Column> = vec![
        Series::new(
            "People Affected(Flash Appeal)".into(),
            vec![Some("#population+total"), Some("17600000"), None],
        )
        .into(),
        Series::new("IDPs".into(), vec!["#affected+idps", "3700000", "3800000"]).into(),
        Series::new(
            "Refugees(UNHCR)".into(),
            vec!["#affected+refugees", "6200000", "6300000"],
        )
        .into(),
        Series::new(
            "Civilian casualities(OHCHR) - Killed".into(),
            vec!["#affected+killed", "10500", "10580"],
        )
        .into(),
        Series::new(
            "Civilian casualities(OHCHR) - Injured".into(),
            vec!["#affected+injured", "19800", "19875"],
        )
        .into(),
        Series::new(
            "Attacks on Education Facilities".into(),
            vec!["#indicator+education", "3790", "3795"],
        )
        .into(),
        Series::new(
            "Attacks on Health Care".into(),
            vec!["#indicator+health", "1520", "1523"],
        )
        .into(),
        Series::new("Date".into(), vec!["#date", "2026-07-01", "2026-08-01"]).into(),
        Series::new("retrieved".into(), vec!["08/25/2026, 10:00:00"; 3]).into(),
    ];
    let mut df = DataFrame::new(columns).expect("frame");
    store::write_source(assets_dir, "humanitarian", &mut df).expect("write snapshot");
}

fn write_reserves_snapshot(assets_dir: &Path) {
    let columns: Vec<Column> = vec![
        Series::new(
            "Indicator".into(),
            vec![
                "Official reserve assets",
                "Foreign currency reserves",
                "Monetary gold",
            ],
        )
        .into(),
        Series::new("Червень 2025".into(), vec!["42000", "35000", "5000"]).into(),
        Series::new("Липень 2025".into(), vec!["44000", "37000", "5000"]).into(),
        Series::new("retrieved".into(), vec!["08/25/2026, 10:00:00"; 3]).into(),
    ];
    let mut df = DataFrame::new(columns).expect("frame");
    store::write_source(assets_dir, "international_reserves", &mut df).expect("write snapshot");
}

#[test]
fn snapshots_flow_through_transforms_metrics_and_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let manifest = pipeline_manifest();
    write_humanitarian_snapshot(dir.path());
    write_reserves_snapshot(dir.path());

    let transforms = run_transforms(&manifest, dir.path()).expect("transforms failed");
    assert_eq!(transforms.count(TransformStatus::Ok), 2);
    assert_eq!(transforms.count(TransformStatus::Failed), 0);

    let humanitarian =
        store::read_artifact(dir.path(), "humanitarian").expect("tf_humanitarian.csv");
    assert_eq!(humanitarian.height(), 2);

    let reserves = store::read_artifact(dir.path(), "international_reserves")
        .expect("tf_international_reserves.csv");
    let dates = reserves.column("Date").expect("Date").str().expect("str");
    assert_eq!(dates.get(0), Some("Липень"));

    let metrics = update_metrics(&manifest, dir.path()).expect("metrics failed");
    assert_eq!(metrics.count(MetricStatus::Ok), 2);

    let summary = store::read_csv_untyped(&dir.path().join(store::METRICS_FILE))
        .expect("metrics.csv unreadable");
    let last = summary.column("Last value").expect("column").str().expect("str");
    assert_eq!(last.get(0), Some("6300000"));
    assert_eq!(last.get(1), Some("44"));

    render_report(&manifest, dir.path()).expect("render failed");
    let html =
        std::fs::read_to_string(dir.path().join(store::REPORT_FILE)).expect("report.html");
    assert!(html.contains("Humanitarian and Economic Situation in Ukraine"));
    assert!(html.contains("6.3mn"));
    assert!(html.contains("44bn"));
    assert!(html.contains("Plotly.newPlot"));
    assert!(html.contains("Foreign currency reserves"));
}

#[test]
fn transforms_without_snapshots_are_skipped_not_failed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let manifest = pipeline_manifest();

    let report = run_transforms(&manifest, dir.path()).expect("transforms failed");
    assert_eq!(report.count(TransformStatus::Ok), 0);
    assert_eq!(report.count(TransformStatus::Failed), 0);
    assert!(report.count(TransformStatus::Skipped) > 0);
}
