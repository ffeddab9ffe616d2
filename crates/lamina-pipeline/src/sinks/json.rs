use crate::error::SinkError;
use crate::sink::{RowSink, SinkMode};
use lamina_types::Row;
use std::io::Write;

/// One compact JSON object per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesSink;

impl RowSink for JsonLinesSink {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn mode(&self) -> SinkMode {
        SinkMode::Streaming
    }

    fn write_row(&mut self, row: Row, out: &mut dyn Write) -> Result<(), SinkError> {
        let line = serde_json::to_string(&row)?;
        writeln!(out, "{}", line)?;
        Ok(())
    }

    fn finish(&mut self, _out: &mut dyn Write) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Pretty-printed JSON array of every row.
#[derive(Debug, Clone, Default)]
pub struct JsonSink {
    rows: Vec<Row>,
}

impl JsonSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowSink for JsonSink {
    fn name(&self) -> &'static str {
        "json"
    }

    fn mode(&self) -> SinkMode {
        SinkMode::Buffered
    }

    fn write_row(&mut self, row: Row, _out: &mut dyn Write) -> Result<(), SinkError> {
        self.rows.push(row);
        Ok(())
    }

    fn finish(&mut self, out: &mut dyn Write) -> Result<(), SinkError> {
        let rows = std::mem::take(&mut self.rows);
        let text = serde_json::to_string_pretty(&rows)?;
        writeln!(out, "{}", text)?;
        Ok(())
    }
}

/// YAML sequence of every row.
#[derive(Debug, Clone, Default)]
pub struct YamlSink {
    rows: Vec<Row>,
}

impl YamlSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowSink for YamlSink {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn mode(&self) -> SinkMode {
        SinkMode::Buffered
    }

    fn write_row(&mut self, row: Row, _out: &mut dyn Write) -> Result<(), SinkError> {
        self.rows.push(row);
        Ok(())
    }

    fn finish(&mut self, out: &mut dyn Write) -> Result<(), SinkError> {
        let rows = std::mem::take(&mut self.rows);
        let text = serde_yaml::to_string(&rows)?;
        out.write_all(text.as_bytes())?;
        Ok(())
    }
}
