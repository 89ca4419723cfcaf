use polars::prelude::DataFrame;

use crate::errors::ReaderError;
use crate::model::ReadOptions;
use crate::registry::TableReader;

use super::table_from_rows;

pub struct CsvTableReader;

impl Default for CsvTableReader {
    fn default() -> Self {
        Self
    }
}

impl CsvTableReader {
    const NAME: &'static str = "CSV_TABLE";

    // ZIP local file header magic. XLSX payloads carry it too, so a plain
    // CSV reader must never accept them.
    const ZIP_MAGIC: &'static [u8] = b"PK\x03\x04";
}

impl TableReader for CsvTableReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read(&self, payload: &[u8], options: &ReadOptions) -> Result<DataFrame, ReaderError> {
        if payload.is_empty() {
            return Err(ReaderError::FormatMismatch {
                reader: Self::NAME,
                reason: "payload is empty".to_string(),
            });
        }
        if payload.starts_with(Self::ZIP_MAGIC) {
            return Err(ReaderError::FormatMismatch {
                reader: Self::NAME,
                reason: "payload is a ZIP archive, not plain CSV".to_string(),
            });
        }
        if payload.contains(&0) {
            return Err(ReaderError::FormatMismatch {
                reader: Self::NAME,
                reason: "payload contains binary data".to_string(),
            });
        }

        let text = String::from_utf8_lossy(payload);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| ReaderError::Csv {
                reader: Self::NAME,
                source: err,
            })?;
            rows.push(
                record
                    .iter()
                    .map(|cell| {
                        let cell = cell.trim();
                        if cell.is_empty() {
                            None
                        } else {
                            Some(cell.to_string())
                        }
                    })
                    .collect(),
            );
        }

        table_from_rows(Self::NAME, rows, options.skip_rows)
    }
}
