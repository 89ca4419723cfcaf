pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::{ReaderAttempt, ReaderError};
pub use formats::{CsvTableReader, XlsxTableReader, ZipTableReader};
pub use model::{ReadOptions, TableFormat};
pub use registry::{read_table, read_with_readers, TableReader};

#[cfg(test)]
mod tests;
