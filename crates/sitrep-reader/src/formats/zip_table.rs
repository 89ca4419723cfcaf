use std::io::{Cursor, Read};

use polars::prelude::DataFrame;
use zip::ZipArchive;

use crate::errors::ReaderError;
use crate::model::ReadOptions;
use crate::registry::TableReader;

use super::CsvTableReader;

/// Reads the first `.csv` entry out of a ZIP archive and hands it to the
/// CSV reader. Archives without a CSV entry (XLSX workbooks included) are a
/// format mismatch.
pub struct ZipTableReader;

impl Default for ZipTableReader {
    fn default() -> Self {
        Self
    }
}

impl ZipTableReader {
    const NAME: &'static str = "ZIP_CSV";
}

impl TableReader for ZipTableReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read(&self, payload: &[u8], options: &ReadOptions) -> Result<DataFrame, ReaderError> {
        let mut archive =
            ZipArchive::new(Cursor::new(payload)).map_err(|err| ReaderError::FormatMismatch {
                reader: Self::NAME,
                reason: format!("not a ZIP archive: {err}"),
            })?;

        let mut csv_entry: Option<(usize, String)> = None;
        for idx in 0..archive.len() {
            let entry = archive.by_index(idx).map_err(|err| ReaderError::Archive {
                reader: Self::NAME,
                source: err,
            })?;
            if entry.is_file() && entry.name().to_ascii_lowercase().ends_with(".csv") {
                csv_entry = Some((idx, entry.name().to_string()));
                break;
            }
        }

        let (idx, name) = match csv_entry {
            Some(found) => found,
            None => {
                return Err(ReaderError::FormatMismatch {
                    reader: Self::NAME,
                    reason: "archive contains no .csv entry".to_string(),
                });
            }
        };

        let mut entry = archive.by_index(idx).map_err(|err| ReaderError::Archive {
            reader: Self::NAME,
            source: err,
        })?;
        let mut contents = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut contents)
            .map_err(|err| ReaderError::Io {
                reader: Self::NAME,
                source: err,
            })?;

        match CsvTableReader.read(&contents, options) {
            Ok(df) => Ok(df),
            Err(ReaderError::FormatMismatch { reason, .. }) => Err(ReaderError::FormatMismatch {
                reader: Self::NAME,
                reason: format!("entry '{name}': {reason}"),
            }),
            Err(err) => Err(err),
        }
    }
}
