use crate::error::{Error, Result, SinkError};
use crate::sink::{RowSink, SinkMode};
use lamina_types::Row;
use std::io::Write;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Field(String),
}

/// Renders each row through a `{{ field }}` template.
///
/// Placeholders may use dotted paths (`{{ owner.name }}`); a missing field
/// renders as an empty string. A newline is appended after each render
/// unless the template already ends with one.
#[derive(Debug, Clone)]
pub struct TemplateSink {
    segments: Vec<Segment>,
    newline: bool,
}

impl TemplateSink {
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                let offset = template.len() - rest.len() + start;
                return Err(Error::InvalidTemplate(format!(
                    "unclosed '{{{{' at offset {}",
                    offset
                )));
            };
            let name = after[..end].trim();
            if name.is_empty() {
                return Err(Error::InvalidTemplate("empty placeholder".to_string()));
            }
            segments.push(Segment::Field(name.to_string()));
            rest = &after[end + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self {
            segments,
            newline: !template.ends_with('\n'),
        })
    }

    pub fn render(&self, row: &Row) -> String {
        let mut text = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(s) => text.push_str(s),
                Segment::Field(name) => {
                    if let Some(value) = row.lookup(name) {
                        text.push_str(&value.to_string());
                    }
                }
            }
        }
        if self.newline {
            text.push('\n');
        }
        text
    }
}

impl RowSink for TemplateSink {
    fn name(&self) -> &'static str {
        "template"
    }

    fn mode(&self) -> SinkMode {
        SinkMode::Streaming
    }

    fn write_row(&mut self, row: Row, out: &mut dyn Write) -> std::result::Result<(), SinkError> {
        out.write_all(self.render(&row).as_bytes())?;
        Ok(())
    }

    fn finish(&mut self, _out: &mut dyn Write) -> std::result::Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::render;
    use lamina_types::{Value, row};

    #[test]
    fn test_renders_fields_and_nested_paths() -> anyhow::Result<()> {
        let owner = Value::Map(
            [("name".to_string(), Value::from("ada"))]
                .into_iter()
                .collect(),
        );
        let mut sink = TemplateSink::parse("{{name}} by {{ owner.name }} ({{ missing }})")?;
        let text = render(
            &mut sink,
            vec![row! { "name" => "lamina", "owner" => owner }, row! { "name" => "x" }],
        );
        assert_eq!(text, "lamina by ada ()\nx by  ()\n");
        Ok(())
    }

    #[test]
    fn test_trailing_newline_not_doubled() -> anyhow::Result<()> {
        let mut sink = TemplateSink::parse("- {{ id }}\n")?;
        assert_eq!(render(&mut sink, vec![row! { "id" => 1 }]), "- 1\n");
        Ok(())
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            TemplateSink::parse("{{ name"),
            Err(Error::InvalidTemplate(_))
        ));
        assert!(matches!(
            TemplateSink::parse("a {{ }} b"),
            Err(Error::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_empty_input_writes_nothing() -> anyhow::Result<()> {
        let mut sink = TemplateSink::parse("{{ id }}")?;
        assert_eq!(render(&mut sink, vec![]), "");
        Ok(())
    }
}
