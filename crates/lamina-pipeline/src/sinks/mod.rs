mod csv;
mod json;
mod table;
mod template;

pub use self::csv::{ColumnPolicy, CsvSink};
pub use json::{JsonLinesSink, JsonSink, YamlSink};
pub use table::{TableSink, TableStyle};
pub use template::TemplateSink;

#[cfg(test)]
pub(crate) fn render(sink: &mut dyn crate::RowSink, rows: Vec<lamina_types::Row>) -> String {
    let mut out = Vec::new();
    for row in rows {
        sink.write_row(row, &mut out).expect("row accepted");
    }
    sink.finish(&mut out).expect("sink finished");
    String::from_utf8(out).expect("utf-8 output")
}
