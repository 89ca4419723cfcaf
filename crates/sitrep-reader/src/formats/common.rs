use std::collections::HashMap;

use polars::prelude::*;

use crate::errors::ReaderError;

/// Assembles a table from raw rows: the first row after `skip_rows` becomes
/// the header, everything after it becomes string-typed columns. Ragged rows
/// are padded or truncated to the header width.
pub(crate) fn table_from_rows(
    reader: &'static str,
    rows: Vec<Vec<Option<String>>>,
    skip_rows: usize,
) -> Result<DataFrame, ReaderError> {
    let mut remaining = rows.into_iter().skip(skip_rows);

    let header_cells = match remaining.next() {
        Some(cells) => cells,
        None => {
            return Err(ReaderError::FormatMismatch {
                reader,
                reason: format!("no header row left after skipping {skip_rows} rows"),
            });
        }
    };

    let header = dedupe_headers(&header_cells);
    if header.is_empty() {
        return Err(ReaderError::FormatMismatch {
            reader,
            reason: "header row has no columns".to_string(),
        });
    }

    let data: Vec<Vec<Option<String>>> = remaining.collect();
    if data.is_empty() {
        return Err(ReaderError::EmptyData { reader });
    }

    let width = header.len();
    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(data.len()); width];
    for row in data {
        for (idx, column) in columns.iter_mut().enumerate() {
            column.push(row.get(idx).cloned().flatten());
        }
    }

    let mut cols: Vec<Column> = Vec::with_capacity(width);
    for (name, values) in header.iter().zip(columns) {
        cols.push(Series::new(name.as_str().into(), values).into());
    }

    DataFrame::new(cols).map_err(|err| ReaderError::Validation {
        reader,
        message: format!("failed to build dataframe: {err}"),
    })
}

/// Produces unique, non-empty column names. Blank headers become
/// `column_{n}` (1-based position), repeats get a `_2`, `_3`, ... suffix.
pub(crate) fn dedupe_headers(cells: &[Option<String>]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(cells.len());

    for (idx, cell) in cells.iter().enumerate() {
        let base = cell
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| name.to_string())
            .unwrap_or_else(|| format!("column_{}", idx + 1));

        let count = {
            let entry = seen.entry(base.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        if count == 1 {
            names.push(base);
        } else {
            names.push(format!("{base}_{count}"));
        }
    }

    names
}
