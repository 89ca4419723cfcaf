use polars::prelude::DataFrame;

use crate::errors::{ReaderAttempt, ReaderError};
use crate::formats::{CsvTableReader, XlsxTableReader, ZipTableReader};
use crate::model::{ReadOptions, TableFormat};

pub trait TableReader {
    fn name(&self) -> &'static str;
    fn read(&self, payload: &[u8], options: &ReadOptions) -> Result<DataFrame, ReaderError>;
}

/// Decodes a raw snapshot into a string-typed table.
///
/// When the manifest pins a format the matching reader runs alone and its
/// errors surface untouched. Without a pinned format the readers are tried
/// in order from most to least specific, since any byte stream passes for
/// CSV if nothing better claims it first.
pub fn read_table(
    payload: &[u8],
    format: Option<TableFormat>,
    options: &ReadOptions,
) -> Result<DataFrame, ReaderError> {
    let xlsx = XlsxTableReader;
    let zip = ZipTableReader;
    let csv = CsvTableReader;

    match format {
        Some(TableFormat::Xlsx) => xlsx.read(payload, options),
        Some(TableFormat::Zip) => zip.read(payload, options),
        Some(TableFormat::Csv) => csv.read(payload, options),
        None => {
            let readers: [&dyn TableReader; 3] = [&xlsx, &zip, &csv];
            read_with_readers(payload, options, &readers)
        }
    }
}

pub fn read_with_readers(
    payload: &[u8],
    options: &ReadOptions,
    readers: &[&dyn TableReader],
) -> Result<DataFrame, ReaderError> {
    let mut attempts = Vec::new();

    for reader in readers {
        match reader.read(payload, options) {
            Ok(df) => return Ok(df),
            Err(ReaderError::FormatMismatch { reason, .. }) => {
                attempts.push(ReaderAttempt::new(reader.name(), reason));
            }
            Err(err) => return Err(err),
        }
    }

    Err(ReaderError::NoMatchingReader { attempts })
}
