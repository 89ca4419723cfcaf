use std::io::{Cursor, Read, Seek};

use calamine::{Data, Range, Reader, Xlsx, XlsxError};
use chrono::NaiveTime;
use polars::prelude::DataFrame;

use crate::errors::ReaderError;
use crate::model::ReadOptions;
use crate::registry::TableReader;

use super::table_from_rows;

pub struct XlsxTableReader;

impl Default for XlsxTableReader {
    fn default() -> Self {
        Self
    }
}

impl XlsxTableReader {
    const NAME: &'static str = "XLSX_TABLE";

    /// Resolves the worksheet the options ask for: name first, positional
    /// index as the fallback, first sheet when neither is set.
    fn select_range<RS>(
        workbook: &mut Xlsx<RS>,
        options: &ReadOptions,
    ) -> Result<Range<Data>, ReaderError>
    where
        RS: Read + Seek,
    {
        if let Some(name) = options.sheet.as_deref() {
            match workbook.worksheet_range(name) {
                Ok(range) => return Ok(range),
                Err(XlsxError::WorksheetNotFound(_)) => {
                    if options.sheet_index.is_none() {
                        return Err(ReaderError::Sheet {
                            reader: Self::NAME,
                            requested: format!("'{name}'"),
                        });
                    }
                }
                Err(err) => {
                    return Err(ReaderError::Workbook {
                        reader: Self::NAME,
                        source: err,
                    });
                }
            }
        }

        let index = options.sheet_index.unwrap_or(0);
        let names = workbook.sheet_names();
        let sheet = match names.get(index) {
            Some(sheet) => sheet.clone(),
            None => {
                return Err(ReaderError::Sheet {
                    reader: Self::NAME,
                    requested: format!("index {index} (workbook has {} sheets)", names.len()),
                });
            }
        };

        workbook
            .worksheet_range(&sheet)
            .map_err(|err| ReaderError::Workbook {
                reader: Self::NAME,
                source: err,
            })
    }

    fn render_cell(cell: &Data) -> Option<String> {
        match cell {
            Data::Empty => None,
            Data::String(value) => {
                let value = value.trim();
                if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
            Data::Float(value) => Some(Self::render_float(*value)),
            Data::Int(value) => Some(value.to_string()),
            Data::Bool(value) => Some(if *value { "true" } else { "false" }.to_string()),
            Data::DateTime(value) => value.as_datetime().map(|naive| {
                if naive.time() == NaiveTime::MIN {
                    naive.date().to_string()
                } else {
                    naive.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }),
            Data::DateTimeIso(value) => Some(value.clone()),
            Data::DurationIso(value) => Some(value.clone()),
            Data::Error(_) => None,
        }
    }

    // Whole numbers render without the trailing ".0" Excel never shows.
    fn render_float(value: f64) -> String {
        if value.fract() == 0.0 && value.abs() < 1e15 {
            format!("{value:.0}")
        } else {
            value.to_string()
        }
    }
}

impl TableReader for XlsxTableReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read(&self, payload: &[u8], options: &ReadOptions) -> Result<DataFrame, ReaderError> {
        let mut workbook =
            Xlsx::new(Cursor::new(payload)).map_err(|err| ReaderError::FormatMismatch {
                reader: Self::NAME,
                reason: format!("not an XLSX workbook: {err}"),
            })?;

        let range = Self::select_range(&mut workbook, options)?;
        let rows: Vec<Vec<Option<String>>> = range
            .rows()
            .map(|row| row.iter().map(Self::render_cell).collect())
            .collect();

        table_from_rows(Self::NAME, rows, options.skip_rows)
    }
}
