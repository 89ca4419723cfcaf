use std::io::Cursor;
use std::io::Write;

use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::errors::ReaderError;
use crate::formats::{CsvTableReader, XlsxTableReader, ZipTableReader};
use crate::model::{ReadOptions, TableFormat};
use crate::read_table;
use crate::registry::TableReader;

fn zip_fixture(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let cursor = Cursor::new(Vec::new());
    let mut writer = ZipWriter::new(cursor);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, contents) in entries {
        writer.start_file(*name, options).expect("start zip entry");
        writer.write_all(contents).expect("write zip entry");
    }

    let cursor = writer.finish().expect("finish zip");
    cursor.into_inner()
}

/// Minimal two-sheet workbook with inline strings, enough for calamine to
/// open without shared strings or styles parts.
fn xlsx_fixture() -> Vec<u8> {
    let content_types = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

    let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

    let workbook = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>
<sheet name="Data" sheetId="1" r:id="rId1"/>
<sheet name="Labels" sheetId="2" r:id="rId2"/>
</sheets>
</workbook>"#;

    let workbook_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
</Relationships>"#;

    let sheet1 = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1">
<c r="A1" t="inlineStr"><is><t>Country</t></is></c>
<c r="B1" t="inlineStr"><is><t>Tonnage</t></is></c>
<c r="C1" t="inlineStr"><is><t>Active</t></is></c>
</row>
<row r="2">
<c r="A2" t="inlineStr"><is><t>Spain</t></is></c>
<c r="B2"><v>120.5</v></c>
<c r="C2" t="b"><v>1</v></c>
</row>
<row r="3">
<c r="A3" t="inlineStr"><is><t>Turkiye</t></is></c>
<c r="B3"><v>80</v></c>
<c r="C3" t="b"><v>0</v></c>
</row>
</sheetData>
</worksheet>"#;

    let sheet2 = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1">
<c r="A1" t="inlineStr"><is><t>item</t></is></c>
<c r="B1" t="inlineStr"><is><t>code</t></is></c>
</row>
<row r="2">
<c r="A2" t="inlineStr"><is><t>Refugees</t></is></c>
<c r="B2" t="inlineStr"><is><t>R1</t></is></c>
</row>
</sheetData>
</worksheet>"#;

    zip_fixture(&[
        ("[Content_Types].xml", content_types.as_bytes()),
        ("_rels/.rels", root_rels.as_bytes()),
        ("xl/workbook.xml", workbook.as_bytes()),
        ("xl/_rels/workbook.xml.rels", workbook_rels.as_bytes()),
        ("xl/worksheets/sheet1.xml", sheet1.as_bytes()),
        ("xl/worksheets/sheet2.xml", sheet2.as_bytes()),
    ])
}

fn text_column(df: &polars::prelude::DataFrame, name: &str, idx: usize) -> Option<String> {
    df.column(name)
        .expect("column missing")
        .str()
        .expect("column not utf8")
        .get(idx)
        .map(|value| value.to_string())
}

#[test]
fn csv_reader_builds_string_table() {
    let payload = b"Country,Tonnage\nSpain,120.5\nTurkiye,80\n";
    let df = CsvTableReader
        .read(payload, &ReadOptions::default())
        .expect("csv read failed");

    assert_eq!(df.get_column_names(), ["Country", "Tonnage"]);
    assert_eq!(df.height(), 2);
    assert_eq!(text_column(&df, "Country", 0).as_deref(), Some("Spain"));
    assert_eq!(text_column(&df, "Tonnage", 1).as_deref(), Some("80"));
}

#[test]
fn csv_reader_skips_leading_rows() {
    let payload = b"Grain exports\nupdated weekly\nCountry,Tonnage\nSpain,120.5\n";
    let df = CsvTableReader
        .read(payload, &ReadOptions::with_skip_rows(2))
        .expect("csv read failed");

    assert_eq!(df.get_column_names(), ["Country", "Tonnage"]);
    assert_eq!(df.height(), 1);
}

#[test]
fn csv_reader_pads_and_truncates_ragged_rows() {
    let payload = b"a,b,c\n1,2\n4,5,6,7\n";
    let df = CsvTableReader
        .read(payload, &ReadOptions::default())
        .expect("csv read failed");

    assert_eq!(df.get_column_names(), ["a", "b", "c"]);
    assert_eq!(text_column(&df, "c", 0), None);
    assert_eq!(text_column(&df, "c", 1).as_deref(), Some("6"));
}

#[test]
fn csv_reader_renames_blank_and_duplicate_headers() {
    let payload = b"Region,,Region,Value\nWest,x,y,1\n";
    let df = CsvTableReader
        .read(payload, &ReadOptions::default())
        .expect("csv read failed");

    assert_eq!(
        df.get_column_names(),
        ["Region", "column_2", "Region_2", "Value"]
    );
}

#[test]
fn csv_reader_turns_empty_cells_into_nulls() {
    let payload = b"a,b\n1,\n,2\n";
    let df = CsvTableReader
        .read(payload, &ReadOptions::default())
        .expect("csv read failed");

    assert_eq!(text_column(&df, "b", 0), None);
    assert_eq!(text_column(&df, "a", 1), None);
    assert_eq!(df.column("a").unwrap().null_count(), 1);
}

#[test]
fn csv_reader_rejects_header_only_payload() {
    let payload = b"a,b,c\n";
    match CsvTableReader.read(payload, &ReadOptions::default()) {
        Err(ReaderError::EmptyData { .. }) => {}
        other => panic!("expected EmptyData error, got {other:?}"),
    }
}

#[test]
fn csv_reader_rejects_zip_payload() {
    let payload = zip_fixture(&[("data.csv", b"a,b\n1,2\n".as_slice())]);
    match CsvTableReader.read(&payload, &ReadOptions::default()) {
        Err(ReaderError::FormatMismatch { reason, .. }) => {
            assert!(reason.contains("ZIP"), "unexpected reason: {reason}");
        }
        other => panic!("expected FormatMismatch error, got {other:?}"),
    }
}

#[test]
fn zip_reader_extracts_first_csv_entry() {
    let payload = zip_fixture(&[
        ("readme.txt", b"not data".as_slice()),
        ("export.csv", b"Country,Tonnage\nSpain,120.5\n".as_slice()),
    ]);
    let df = ZipTableReader
        .read(&payload, &ReadOptions::default())
        .expect("zip read failed");

    assert_eq!(df.get_column_names(), ["Country", "Tonnage"]);
    assert_eq!(df.height(), 1);
}

#[test]
fn zip_reader_rejects_archive_without_csv() {
    let payload = zip_fixture(&[("readme.txt", b"not data".as_slice())]);
    match ZipTableReader.read(&payload, &ReadOptions::default()) {
        Err(ReaderError::FormatMismatch { reason, .. }) => {
            assert!(reason.contains("no .csv"), "unexpected reason: {reason}");
        }
        other => panic!("expected FormatMismatch error, got {other:?}"),
    }
}

#[test]
fn xlsx_reader_defaults_to_first_sheet() {
    let payload = xlsx_fixture();
    let df = XlsxTableReader
        .read(&payload, &ReadOptions::default())
        .expect("xlsx read failed");

    assert_eq!(df.get_column_names(), ["Country", "Tonnage", "Active"]);
    assert_eq!(df.height(), 2);
    assert_eq!(text_column(&df, "Country", 0).as_deref(), Some("Spain"));
    assert_eq!(text_column(&df, "Tonnage", 0).as_deref(), Some("120.5"));
    assert_eq!(text_column(&df, "Tonnage", 1).as_deref(), Some("80"));
    assert_eq!(text_column(&df, "Active", 0).as_deref(), Some("true"));
    assert_eq!(text_column(&df, "Active", 1).as_deref(), Some("false"));
}

#[test]
fn xlsx_reader_selects_sheet_by_name() {
    let payload = xlsx_fixture();
    let options = ReadOptions {
        sheet: Some("Labels".to_string()),
        ..ReadOptions::default()
    };
    let df = XlsxTableReader
        .read(&payload, &options)
        .expect("xlsx read failed");

    assert_eq!(df.get_column_names(), ["item", "code"]);
    assert_eq!(text_column(&df, "item", 0).as_deref(), Some("Refugees"));
}

#[test]
fn xlsx_reader_falls_back_to_sheet_index() {
    let payload = xlsx_fixture();
    let options = ReadOptions {
        sheet: Some("Missing".to_string()),
        sheet_index: Some(1),
        ..ReadOptions::default()
    };
    let df = XlsxTableReader
        .read(&payload, &options)
        .expect("xlsx read failed");

    assert_eq!(df.get_column_names(), ["item", "code"]);
}

#[test]
fn xlsx_reader_reports_missing_sheet() {
    let payload = xlsx_fixture();
    let options = ReadOptions {
        sheet: Some("Missing".to_string()),
        ..ReadOptions::default()
    };
    match XlsxTableReader.read(&payload, &options) {
        Err(ReaderError::Sheet { requested, .. }) => {
            assert!(requested.contains("Missing"), "unexpected: {requested}");
        }
        other => panic!("expected Sheet error, got {other:?}"),
    }
}

#[test]
fn xlsx_reader_rejects_plain_text() {
    let payload = b"Country,Tonnage\nSpain,120.5\n";
    match XlsxTableReader.read(payload, &ReadOptions::default()) {
        Err(ReaderError::FormatMismatch { .. }) => {}
        other => panic!("expected FormatMismatch error, got {other:?}"),
    }
}

#[test]
fn read_table_sniffs_each_format() {
    let csv_payload = b"a,b\n1,2\n".to_vec();
    let zip_payload = zip_fixture(&[("data.csv", b"a,b\n1,2\n".as_slice())]);
    let xlsx_payload = xlsx_fixture();
    let options = ReadOptions::default();

    for payload in [&csv_payload, &zip_payload, &xlsx_payload] {
        let df = read_table(payload, None, &options).expect("sniffing read failed");
        assert!(df.height() >= 1);
    }
}

#[test]
fn read_table_honors_pinned_format() {
    let payload = zip_fixture(&[("data.csv", b"a,b\n1,2\n".as_slice())]);
    let df = read_table(&payload, Some(TableFormat::Zip), &ReadOptions::default())
        .expect("pinned zip read failed");
    assert_eq!(df.height(), 1);

    match read_table(&payload, Some(TableFormat::Csv), &ReadOptions::default()) {
        Err(ReaderError::FormatMismatch { .. }) => {}
        other => panic!("expected FormatMismatch error, got {other:?}"),
    }
}

#[test]
fn read_table_collects_attempts_when_nothing_matches() {
    let payload = [0u8, 159, 146, 150];
    match read_table(&payload, None, &ReadOptions::default()) {
        Err(ReaderError::NoMatchingReader { attempts }) => {
            assert_eq!(attempts.len(), 3);
        }
        other => panic!("expected NoMatchingReader error, got {other:?}"),
    }
}

#[test]
fn table_format_parses_known_names() {
    assert_eq!(TableFormat::try_from("XLSX"), Ok(TableFormat::Xlsx));
    assert_eq!(TableFormat::try_from(" csv "), Ok(TableFormat::Csv));
    assert!(TableFormat::try_from("parquet").is_err());
}
