//! Assertions over the JSON array a row command prints with `-o json`.

use anyhow::{Context, Result, bail};
use serde_json::Value;

/// Values of one field across all rows, as strings (missing fields skipped).
pub fn column(json: &Value, field: &str) -> Result<Vec<String>> {
    let rows = json.as_array().context("Expected a JSON array of rows")?;
    Ok(rows
        .iter()
        .filter_map(|row| match &row[field] {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .collect())
}

pub fn assert_row_count(json: &Value, expected: usize) -> Result<()> {
    let rows = json.as_array().context("Expected a JSON array of rows")?;
    if rows.len() != expected {
        bail!("Expected {} rows, got {}", expected, rows.len());
    }
    Ok(())
}

/// Every row carries exactly these fields. Parsed objects do not keep
/// field order; check the raw output for that.
pub fn assert_fields(json: &Value, expected: &[&str]) -> Result<()> {
    let mut expected = expected.to_vec();
    expected.sort_unstable();
    let rows = json.as_array().context("Expected a JSON array of rows")?;
    for (i, row) in rows.iter().enumerate() {
        let object = row
            .as_object()
            .with_context(|| format!("Row {} is not an object", i))?;
        let mut names: Vec<&str> = object.keys().map(String::as_str).collect();
        names.sort_unstable();
        if names != expected {
            bail!("Row {} has fields {:?}, expected {:?}", i, names, expected);
        }
    }
    Ok(())
}
