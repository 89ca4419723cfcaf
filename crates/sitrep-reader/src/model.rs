use std::fmt;

/// Snapshot payload encodings the registry knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Xlsx,
    Zip,
}

impl TableFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Xlsx => "xlsx",
            TableFormat::Zip => "zip",
        }
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TableFormat {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(TableFormat::Csv),
            "xlsx" => Ok(TableFormat::Xlsx),
            "zip" => Ok(TableFormat::Zip),
            other => Err(format!("unknown table format '{other}'")),
        }
    }
}

/// Per-source knobs applied while decoding a snapshot into a table.
///
/// `skip_rows` drops leading rows before the header row. `sheet` picks an
/// XLSX worksheet by name, with `sheet_index` as the fallback when the name
/// is absent from the workbook.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub skip_rows: usize,
    pub sheet: Option<String>,
    pub sheet_index: Option<usize>,
}

impl ReadOptions {
    pub fn with_skip_rows(skip_rows: usize) -> Self {
        Self {
            skip_rows,
            ..Self::default()
        }
    }
}
