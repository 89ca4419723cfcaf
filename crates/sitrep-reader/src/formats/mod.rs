mod common;
mod csv_table;
mod xlsx_table;
mod zip_table;

pub use csv_table::CsvTableReader;
pub use xlsx_table::XlsxTableReader;
pub use zip_table::ZipTableReader;

pub(crate) use common::{dedupe_headers, table_from_rows};
