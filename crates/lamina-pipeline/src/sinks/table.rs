use crate::error::SinkError;
use crate::sink::{RowSink, SinkMode};
use lamina_types::{Row, Value};
use owo_colors::OwoColorize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableStyle {
    /// Space-aligned columns under a dashed rule
    #[default]
    Ascii,
    /// GitHub-flavored markdown table
    Markdown,
}

/// Human-readable table. Buffers every row so columns can be sized.
#[derive(Debug, Clone, Default)]
pub struct TableSink {
    style: TableStyle,
    max_column_width: Option<usize>,
    color: bool,
    rows: Vec<Row>,
}

impl TableSink {
    pub fn new(style: TableStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    /// Truncate cells wider than `width` characters, ending them with `...`
    pub fn with_max_column_width(mut self, width: Option<usize>) -> Self {
        self.max_column_width = width;
        self
    }

    /// Bold header row (ASCII style only)
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn cell(&self, value: Option<&Value>) -> String {
        let text = value.map(Value::to_string).unwrap_or_default();
        let text = text.replace(['\n', '\r'], " ");
        let text = match self.style {
            TableStyle::Markdown => text.replace('|', "\\|"),
            TableStyle::Ascii => text,
        };
        match self.max_column_width {
            Some(max) => truncate(&text, max),
            None => text,
        }
    }
}

pub(crate) fn truncate(text: &str, max_len: usize) -> String {
    let char_count = text.chars().count();

    if char_count <= max_len {
        text.to_string()
    } else if max_len <= 3 {
        text.chars().take(max_len).collect()
    } else {
        let truncated: String = text.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

struct Column {
    title: String,
    width: usize,
    numeric: bool,
}

fn pad(text: &str, width: usize, right: bool) -> String {
    if right {
        format!("{:>width$}", text, width = width)
    } else {
        format!("{:<width$}", text, width = width)
    }
}

impl RowSink for TableSink {
    fn name(&self) -> &'static str {
        match self.style {
            TableStyle::Ascii => "table",
            TableStyle::Markdown => "markdown",
        }
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
        if rows.is_empty() {
            return Ok(());
        }

        let mut names: Vec<String> = Vec::new();
        for row in &rows {
            for name in row.field_names() {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }

        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| names.iter().map(|n| self.cell(row.get(n))).collect())
            .collect();

        let min_width = match self.style {
            TableStyle::Markdown => 3,
            TableStyle::Ascii => 0,
        };
        let columns: Vec<Column> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let title = self.cell(Some(&Value::from(name.as_str())));
                let width = cells
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(title.chars().count()))
                    .max()
                    .unwrap_or(0)
                    .max(min_width);
                let mut values = rows.iter().filter_map(|r| r.get(name)).filter(|v| !v.is_null());
                let numeric = values
                    .clone()
                    .next()
                    .is_some()
                    && values.all(|v| matches!(v, Value::Int(_) | Value::Float(_)));
                Column {
                    title,
                    width,
                    numeric,
                }
            })
            .collect();

        match self.style {
            TableStyle::Ascii => self.write_ascii(out, &columns, &cells)?,
            TableStyle::Markdown => write_markdown(out, &columns, &cells)?,
        }
        Ok(())
    }
}

impl TableSink {
    fn write_ascii(
        &self,
        out: &mut dyn Write,
        columns: &[Column],
        cells: &[Vec<String>],
    ) -> std::io::Result<()> {
        let line = |texts: Vec<&str>| -> String {
            let last = columns.len().saturating_sub(1);
            let parts: Vec<String> = columns
                .iter()
                .zip(texts)
                .enumerate()
                .map(|(i, (col, text))| {
                    if col.numeric {
                        pad(text, col.width, true)
                    } else if i == last {
                        text.to_string()
                    } else {
                        pad(text, col.width, false)
                    }
                })
                .collect();
            parts.join("  ").trim_end().to_string()
        };

        let header = line(columns.iter().map(|c| c.title.as_str()).collect());
        if self.color {
            writeln!(out, "{}", header.bold())?;
        } else {
            writeln!(out, "{}", header)?;
        }
        let rule: Vec<String> = columns.iter().map(|c| "-".repeat(c.width)).collect();
        writeln!(out, "{}", rule.join("  "))?;
        for row in cells {
            writeln!(out, "{}", line(row.iter().map(String::as_str).collect()))?;
        }
        Ok(())
    }
}

fn write_markdown(
    out: &mut dyn Write,
    columns: &[Column],
    cells: &[Vec<String>],
) -> std::io::Result<()> {
    let line = |texts: Vec<&str>| -> String {
        let parts: Vec<String> = columns
            .iter()
            .zip(texts)
            .map(|(col, text)| pad(text, col.width, col.numeric))
            .collect();
        format!("| {} |", parts.join(" | "))
    };

    writeln!(out, "{}", line(columns.iter().map(|c| c.title.as_str()).collect()))?;
    let rule: Vec<String> = columns
        .iter()
        .map(|c| {
            if c.numeric {
                format!("{}:", "-".repeat(c.width - 1))
            } else {
                "-".repeat(c.width)
            }
        })
        .collect();
    writeln!(out, "| {} |", rule.join(" | "))?;
    for row in cells {
        writeln!(out, "{}", line(row.iter().map(String::as_str).collect()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::render;
    use lamina_types::row;

    fn sample() -> Vec<Row> {
        vec![
            row! { "name" => "Cargo.toml", "size" => 1200, "kind" => "file" },
            row! { "name" => "src", "size" => 96, "kind" => "dir" },
            row! { "name" => "a|b", "kind" => "file", "extra" => "x" },
        ]
    }

    #[test]
    fn test_ascii_alignment() {
        let text = render(&mut TableSink::new(TableStyle::Ascii), sample());
        insta::assert_snapshot!(text.trim_end(), @r"
        name        size  kind  extra
        ----------  ----  ----  -----
        Cargo.toml  1200  file
        src           96  dir
        a|b               file  x
        ");
    }

    #[test]
    fn test_markdown_escapes_pipes() {
        let text = render(&mut TableSink::new(TableStyle::Markdown), sample());
        insta::assert_snapshot!(text.trim_end(), @r"
        | name       | size | kind | extra |
        | ---------- | ---: | ---- | ----- |
        | Cargo.toml | 1200 | file |       |
        | src        |   96 | dir  |       |
        | a\|b       |      | file | x     |
        ");
    }

    #[test]
    fn test_truncates_wide_cells() {
        let text = render(
            &mut TableSink::new(TableStyle::Ascii).with_max_column_width(Some(8)),
            vec![row! { "path" => "a/very/long/path", "n" => 1 }],
        );
        assert_eq!(text, "path      n\n--------  -\na/ver...  1\n");
    }

    #[test]
    fn test_truncate_helper() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("hello", 2), "he");
    }

    #[test]
    fn test_empty_table_writes_nothing() {
        assert_eq!(render(&mut TableSink::new(TableStyle::Ascii), vec![]), "");
        assert_eq!(render(&mut TableSink::new(TableStyle::Markdown), vec![]), "");
    }
}
