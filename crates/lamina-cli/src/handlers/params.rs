use crate::command::WriterCommand;
use anyhow::Result;
use lamina_middleware::ParsedLayers;
use lamina_params::{ParameterDefinition, ParameterLayer, ParameterType, TypeRegistry};
use std::io::Write;

pub fn layer(registry: &TypeRegistry) -> lamina_params::Result<ParameterLayer> {
    ParameterLayer::builder("params", "Parameters")
        .parameter(
            ParameterDefinition::new("show-history", ParameterType::Bool)
                .help("Also list the sources a value overrode")
                .default_value(false),
        )
        .build(registry)
}

/// Dumps every resolved parameter with its source.
pub struct ShowParams;

const HEADERS: [&str; 4] = ["LAYER", "PARAMETER", "VALUE", "SOURCE"];

impl WriterCommand for ShowParams {
    fn run(&self, parsed: &ParsedLayers, out: &mut dyn Write) -> Result<()> {
        let show_history = parsed
            .layer("params")?
            .get_as::<bool>("show-history")?
            .unwrap_or(false);

        let mut lines: Vec<[String; 4]> = Vec::new();
        for layer in parsed.iter() {
            for (name, parameter) in layer.iter() {
                let mut source = parameter.source.to_string();
                if show_history && !parameter.history.is_empty() {
                    let overridden: Vec<String> =
                        parameter.history.iter().rev().map(|p| p.to_string()).collect();
                    source = format!("{} (over {})", source, overridden.join(", "));
                }
                lines.push([
                    layer.slug().to_string(),
                    name.to_string(),
                    parameter.value.to_string(),
                    source,
                ]);
            }
        }

        let mut widths = HEADERS.map(str::len);
        for line in &lines {
            for (width, cell) in widths.iter_mut().zip(line) {
                *width = (*width).max(cell.chars().count());
            }
        }

        write_line(out, &HEADERS.map(str::to_string), &widths)?;
        for line in &lines {
            write_line(out, line, &widths)?;
        }
        Ok(())
    }
}

fn write_line(out: &mut dyn Write, cells: &[String; 4], widths: &[usize; 4]) -> Result<()> {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = width))
        .collect();
    writeln!(out, "{}", padded.join("  ").trim_end())?;
    Ok(())
}
