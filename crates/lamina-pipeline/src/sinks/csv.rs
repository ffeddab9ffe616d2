use crate::error::SinkError;
use crate::sink::{RowSink, SinkMode};
use lamina_types::{Row, Value};
use std::collections::HashMap;
use std::io::Write;

/// How the header of a delimited file is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnPolicy {
    /// Union of all columns in first-seen order; buffers every row
    #[default]
    Union,
    /// Columns of the first row; streams, and rejects rows with new columns
    FirstRow,
}

type FlatRow = Vec<(String, String)>;

/// Delimited output (CSV, TSV). Nested maps are flattened into
/// `parent.child` columns and lists of scalars are joined with `;`.
#[derive(Debug, Clone)]
pub struct CsvSink {
    delimiter: u8,
    separator: String,
    list_separator: String,
    policy: ColumnPolicy,
    header: bool,
    columns: Vec<String>,
    buffered: Vec<FlatRow>,
    header_written: bool,
}

impl Default for CsvSink {
    fn default() -> Self {
        Self::new(b',')
    }
}

impl CsvSink {
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            separator: ".".to_string(),
            list_separator: ";".to_string(),
            policy: ColumnPolicy::default(),
            header: true,
            columns: Vec::new(),
            buffered: Vec::new(),
            header_written: false,
        }
    }

    pub fn csv() -> Self {
        Self::new(b',')
    }

    pub fn tsv() -> Self {
        Self::new(b'\t')
    }

    pub fn with_policy(mut self, policy: ColumnPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Separator between a parent field name and a nested key
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    fn flatten(&self, row: &Row) -> Result<FlatRow, SinkError> {
        let mut flat = Vec::with_capacity(row.len());
        for (name, value) in row.iter() {
            self.flatten_value(name.to_string(), value, &mut flat)?;
        }
        Ok(flat)
    }

    fn flatten_value(&self, name: String, value: &Value, flat: &mut FlatRow) -> Result<(), SinkError> {
        match value {
            Value::Map(map) => {
                for (key, nested) in map {
                    let column = format!("{}{}{}", name, self.separator, key);
                    self.flatten_value(column, nested, flat)?;
                }
                Ok(())
            }
            Value::List(items) => {
                if let Some(nested) = items.iter().find(|v| !v.is_scalar()) {
                    return Err(SinkError::format(
                        name,
                        format!("list contains a nested {} value", nested.type_name()),
                    ));
                }
                let joined = items
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(&self.list_separator);
                push_column(flat, name, joined)
            }
            scalar => push_column(flat, name, scalar.to_string()),
        }
    }

    fn write_record<'a, I>(&self, out: &mut dyn Write, fields: I) -> Result<(), SinkError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .from_writer(out);
        writer.write_record(fields)?;
        writer.flush()?;
        Ok(())
    }

    fn write_aligned(&self, out: &mut dyn Write, row: &FlatRow) -> Result<(), SinkError> {
        let cells: HashMap<&str, &str> = row
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        self.write_record(
            out,
            self.columns
                .iter()
                .map(|c| cells.get(c.as_str()).copied().unwrap_or("")),
        )
    }

    fn write_header(&mut self, out: &mut dyn Write) -> Result<(), SinkError> {
        if self.header && !self.header_written {
            self.write_record(out, self.columns.iter().map(String::as_str))?;
        }
        self.header_written = true;
        Ok(())
    }
}

fn push_column(flat: &mut FlatRow, name: String, value: String) -> Result<(), SinkError> {
    if flat.iter().any(|(existing, _)| *existing == name) {
        return Err(SinkError::format(
            name,
            "flattened column name collides with another field",
        ));
    }
    flat.push((name, value));
    Ok(())
}

impl RowSink for CsvSink {
    fn name(&self) -> &'static str {
        if self.delimiter == b'\t' { "tsv" } else { "csv" }
    }

    fn mode(&self) -> SinkMode {
        match self.policy {
            ColumnPolicy::Union => SinkMode::Buffered,
            ColumnPolicy::FirstRow => SinkMode::Streaming,
        }
    }

    fn write_row(&mut self, row: Row, out: &mut dyn Write) -> Result<(), SinkError> {
        let flat = self.flatten(&row)?;
        match self.policy {
            ColumnPolicy::Union => {
                for (column, _) in &flat {
                    if !self.columns.contains(column) {
                        self.columns.push(column.clone());
                    }
                }
                self.buffered.push(flat);
                Ok(())
            }
            ColumnPolicy::FirstRow => {
                if !self.header_written {
                    self.columns = flat.iter().map(|(c, _)| c.clone()).collect();
                    self.write_header(out)?;
                } else if let Some((unknown, _)) =
                    flat.iter().find(|(c, _)| !self.columns.contains(c))
                {
                    return Err(SinkError::format(
                        unknown.clone(),
                        "column not present in the header row",
                    ));
                }
                self.write_aligned(out, &flat)
            }
        }
    }

    fn finish(&mut self, out: &mut dyn Write) -> Result<(), SinkError> {
        if self.policy == ColumnPolicy::FirstRow || self.buffered.is_empty() {
            return Ok(());
        }
        self.write_header(out)?;
        let rows = std::mem::take(&mut self.buffered);
        for row in &rows {
            self.write_aligned(out, row)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::render;
    use lamina_types::row;

    fn nested(json: serde_json::Value) -> Value {
        json.into()
    }

    fn map(pairs: &[(&str, Value)]) -> Value {
        Value::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_union_columns_in_first_seen_order() {
        let text = render(
            &mut CsvSink::csv(),
            vec![row! { "a" => 1, "b" => "x" }, row! { "c" => true, "a" => 2 }],
        );
        assert_eq!(text, "a,b,c\n1,x,\n2,,true\n");
    }

    #[test]
    fn test_flattens_maps_and_joins_lists() {
        let text = render(
            &mut CsvSink::csv(),
            vec![row! {
                "owner" => map(&[("name", Value::from("ada")), ("id", Value::from(7))]),
                "tags" => vec!["x", "y"],
                "note" => "has, comma",
            }],
        );
        assert_eq!(text, "owner.name,owner.id,tags,note\nada,7,x;y,\"has, comma\"\n");
    }

    #[test]
    fn test_custom_separator_and_tsv() {
        let text = render(
            &mut CsvSink::tsv().with_separator("_"),
            vec![row! { "m" => map(&[("k", Value::from(1))]), "n" => Value::Null }],
        );
        assert_eq!(text, "m_k\tn\n1\t\n");
    }

    #[test]
    fn test_nested_list_is_format_error() {
        let mut sink = CsvSink::csv();
        let mut out = Vec::new();
        let err = sink
            .write_row(
                row! { "deep" => nested(serde_json::json!([[1, 2]])) },
                &mut out,
            )
            .unwrap_err();
        assert!(matches!(err, SinkError::Format { field: Some(ref f), .. } if f == "deep"));
    }

    #[test]
    fn test_first_row_policy_streams_and_rejects_new_columns() -> anyhow::Result<()> {
        let mut sink = CsvSink::csv().with_policy(ColumnPolicy::FirstRow);
        assert_eq!(sink.mode(), SinkMode::Streaming);
        let mut out = Vec::new();
        sink.write_row(row! { "a" => 1, "b" => 2 }, &mut out)?;
        assert_eq!(String::from_utf8(out.clone())?, "a,b\n1,2\n");

        sink.write_row(row! { "b" => 3 }, &mut out)?;
        let err = sink.write_row(row! { "z" => 1 }, &mut out).unwrap_err();
        assert!(matches!(err, SinkError::Format { field: Some(ref f), .. } if f == "z"));

        sink.finish(&mut out)?;
        assert_eq!(String::from_utf8(out)?, "a,b\n1,2\n,3\n");
        Ok(())
    }

    #[test]
    fn test_empty_input_writes_nothing() {
        assert_eq!(render(&mut CsvSink::csv(), vec![]), "");
        assert_eq!(
            render(&mut CsvSink::csv().with_policy(ColumnPolicy::FirstRow), vec![]),
            ""
        );
    }
}
