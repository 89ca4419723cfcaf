use polars::prelude::*;

use crate::error::Result;

/// Coercing number parse used across every transform: separators stripped,
/// placeholders (`.`, `nan`, empty) and junk become `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|ch| *ch != ',' && *ch != '\u{a0}' && *ch != ' ')
        .collect();
    if cleaned.is_empty() || cleaned == "." || cleaned.eq_ignore_ascii_case("nan") {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Column values as numbers, whatever dtype the CSV reader inferred.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?;
    match column.dtype() {
        DataType::String => Ok(column
            .str()?
            .into_iter()
            .map(|value| value.and_then(parse_number))
            .collect()),
        _ => {
            let casted = column.cast(&DataType::Float64)?;
            Ok(casted.f64()?.into_iter().collect())
        }
    }
}

/// Column values as owned strings, nulls preserved.
pub fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?;
    let casted = column.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|value| value.map(|cell| cell.to_string()))
        .collect())
}

/// First `limit` characters of a header cell, the way period headers are
/// shortened into a `Date` label.
pub fn truncate_chars(value: &str, limit: usize) -> String {
    value.chars().take(limit).collect::<String>().trim().to_string()
}

/// Name of the rightmost column holding at least one value, ignoring the
/// listed columns. This is how the latest reporting period is located in
/// statistical sheets that grow one column per month.
pub fn latest_value_column(df: &DataFrame, ignore: &[&str]) -> Option<String> {
    let mut latest = None;
    for column in df.get_columns() {
        let name = column.name().as_str();
        if ignore.contains(&name) {
            continue;
        }
        if column.len() > column.null_count() {
            latest = Some(name.to_string());
        }
    }
    latest
}
