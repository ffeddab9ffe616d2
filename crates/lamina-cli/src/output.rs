use anyhow::{Result, bail};
use lamina_middleware::{Bindings, LayerSettings};
use lamina_params::{ParameterDefinition, ParameterLayer, ParameterType, TypeRegistry};
use lamina_pipeline::{
    CancellationToken, ColumnPolicy, CsvSink, Exclude, Filter, JsonLinesSink, JsonSink, Limit,
    Pipeline, Rename, RowSink, Select, Sort, TableSink, TableStyle, TemplateSink, YamlSink,
};
use lamina_types::IndexMap;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

pub const OUTPUT_LAYER: &str = "output";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Markdown,
    Json,
    JsonLines,
    Yaml,
    Csv,
    Tsv,
    Template,
}

impl OutputFormat {
    pub const NAMES: [&'static str; 8] = [
        "table", "markdown", "json", "jsonl", "yaml", "csv", "tsv", "template",
    ];
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputFormat::Table => "table",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Json => "json",
            OutputFormat::JsonLines => "jsonl",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Template => "template",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "table" => Ok(OutputFormat::Table),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            "jsonl" => Ok(OutputFormat::JsonLines),
            "yaml" => Ok(OutputFormat::Yaml),
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            "template" => Ok(OutputFormat::Template),
            _ => Err(format!("unknown output format '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(ColorMode::Auto),
            "always" => Ok(ColorMode::Always),
            "never" => Ok(ColorMode::Never),
            _ => Err(format!("unknown color mode '{}'", s)),
        }
    }
}

/// Parameters shared by every row command.
pub fn output_layer(registry: &TypeRegistry) -> lamina_params::Result<ParameterLayer> {
    ParameterLayer::builder(OUTPUT_LAYER, "Output")
        .description("Format, shape and filter the rows a command produces")
        .parameter(
            ParameterDefinition::new("output", ParameterType::Choice)
                .help("Output format")
                .choices(OutputFormat::NAMES)
                .default_value("table")
                .short('o'),
        )
        .parameter(
            ParameterDefinition::new("fields", ParameterType::StringList)
                .help("Only show these fields, in this order"),
        )
        .parameter(
            ParameterDefinition::new("exclude", ParameterType::StringList)
                .help("Drop these fields"),
        )
        .parameter(
            ParameterDefinition::new("filter", ParameterType::String)
                .help("Keep rows matching an expression, e.g. 'size > 1024 && kind == \"file\"'"),
        )
        .parameter(
            ParameterDefinition::new("sort-by", ParameterType::StringList)
                .help("Sort keys; prefix with '-' or suffix ':desc' for descending"),
        )
        .parameter(
            ParameterDefinition::new("limit", ParameterType::Integer)
                .help("Emit at most this many rows")
                .min(0.0),
        )
        .parameter(
            ParameterDefinition::new("offset", ParameterType::Integer)
                .help("Skip this many rows first")
                .default_value(0_i64)
                .min(0.0),
        )
        .parameter(
            ParameterDefinition::new("template", ParameterType::String)
                .help("Row template for --output template, e.g. '{{ name }}: {{ size }}'"),
        )
        .parameter(
            ParameterDefinition::new("template-file", ParameterType::StringFromFile)
                .help("Read the row template from a file"),
        )
        .parameter(
            ParameterDefinition::new("max-width", ParameterType::Integer)
                .help("Truncate table cells wider than this")
                .min(4.0),
        )
        .parameter(
            ParameterDefinition::new("rename", ParameterType::KeyValue)
                .help("Rename fields, as old:new"),
        )
        .parameter(
            ParameterDefinition::new("csv-columns", ParameterType::Choice)
                .help("CSV header from the union of all rows or from the first row")
                .choices(["union", "first-row"])
                .default_value("union"),
        )
        .parameter(
            ParameterDefinition::new("flatten-separator", ParameterType::String)
                .help("Joins nested field names in CSV headers")
                .default_value("."),
        )
        .parameter(
            ParameterDefinition::new("color", ParameterType::Choice)
                .help("Colorize table headers")
                .choices(["auto", "always", "never"])
                .default_value("auto"),
        )
        .build(registry)
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub format: OutputFormat,
    pub fields: Vec<String>,
    pub exclude: Vec<String>,
    pub filter: Option<String>,
    pub sort_by: Vec<String>,
    pub limit: Option<usize>,
    pub offset: usize,
    pub template: Option<String>,
    pub template_file: Option<String>,
    pub max_width: Option<usize>,
    pub rename: IndexMap<String, String>,
    pub csv_columns: ColumnPolicy,
    pub flatten_separator: String,
    pub color: ColorMode,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            fields: Vec::new(),
            exclude: Vec::new(),
            filter: None,
            sort_by: Vec::new(),
            limit: None,
            offset: 0,
            template: None,
            template_file: None,
            max_width: None,
            rename: IndexMap::new(),
            csv_columns: ColumnPolicy::default(),
            flatten_separator: ".".to_string(),
            color: ColorMode::default(),
        }
    }
}

impl LayerSettings for OutputSettings {
    const LAYER: &'static str = OUTPUT_LAYER;

    fn bindings() -> Bindings<Self> {
        Bindings::new()
            .field("output", |s: &mut Self, v: String| {
                if let Ok(format) = v.parse() {
                    s.format = format;
                }
            })
            .field("fields", |s: &mut Self, v: Vec<String>| s.fields = v)
            .field("exclude", |s: &mut Self, v: Vec<String>| s.exclude = v)
            .field("filter", |s: &mut Self, v: String| s.filter = Some(v))
            .field("sort-by", |s: &mut Self, v: Vec<String>| s.sort_by = v)
            .field("limit", |s: &mut Self, v: usize| s.limit = Some(v))
            .field("offset", |s: &mut Self, v: usize| s.offset = v)
            .field("template", |s: &mut Self, v: String| s.template = Some(v))
            .field("template-file", |s: &mut Self, v: String| {
                s.template_file = Some(v)
            })
            .field("max-width", |s: &mut Self, v: usize| s.max_width = Some(v))
            .field("rename", |s: &mut Self, v: IndexMap<String, String>| {
                s.rename = v
            })
            .field("csv-columns", |s: &mut Self, v: String| {
                s.csv_columns = if v == "first-row" {
                    ColumnPolicy::FirstRow
                } else {
                    ColumnPolicy::Union
                }
            })
            .field("flatten-separator", |s: &mut Self, v: String| {
                s.flatten_separator = v
            })
            .field("color", |s: &mut Self, v: String| {
                if let Ok(color) = v.parse() {
                    s.color = color;
                }
            })
    }
}

/// What the process knows about its stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Terminal {
    pub is_tty: bool,
    pub width: Option<usize>,
}

impl Terminal {
    pub fn detect() -> Self {
        use is_terminal::IsTerminal;

        let is_tty = std::io::stdout().is_terminal();
        let width = if is_tty {
            terminal_size::terminal_size().map(|(w, _)| w.0 as usize)
        } else {
            None
        };
        Self { is_tty, width }
    }
}

impl OutputSettings {
    fn template_source(&self) -> Result<&str> {
        match (&self.template, &self.template_file) {
            (Some(_), Some(_)) => bail!("--template and --template-file are mutually exclusive"),
            (Some(t), None) | (None, Some(t)) => Ok(t.as_str()),
            (None, None) => bail!("--output template needs --template or --template-file"),
        }
    }

    /// Sink for the selected format
    pub fn sink(&self, terminal: Terminal) -> Result<Box<dyn RowSink>> {
        let color = match self.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => terminal.is_tty,
        };
        // A single cell never takes more than half the terminal unless asked
        let max_width = self
            .max_width
            .or_else(|| terminal.width.map(|w| (w / 2).max(16)));

        let sink: Box<dyn RowSink> = match self.format {
            OutputFormat::Table => Box::new(
                TableSink::new(TableStyle::Ascii)
                    .with_max_column_width(max_width)
                    .with_color(color),
            ),
            OutputFormat::Markdown => Box::new(
                TableSink::new(TableStyle::Markdown).with_max_column_width(self.max_width),
            ),
            OutputFormat::Json => Box::new(JsonSink::new()),
            OutputFormat::JsonLines => Box::new(JsonLinesSink),
            OutputFormat::Yaml => Box::new(YamlSink::new()),
            OutputFormat::Csv | OutputFormat::Tsv => {
                let sink = if self.format == OutputFormat::Tsv {
                    CsvSink::tsv()
                } else {
                    CsvSink::csv()
                };
                Box::new(
                    sink.with_policy(self.csv_columns)
                        .with_separator(self.flatten_separator.clone()),
                )
            }
            OutputFormat::Template => Box::new(TemplateSink::parse(self.template_source()?)?),
        };
        Ok(sink)
    }

    /// Assemble the pipeline: filter, sort, offset/limit, rename, select, exclude.
    ///
    /// Filter and sort see the fields the command produced; renames and
    /// projections only shape what is printed.
    pub fn build_pipeline<W: Write>(
        &self,
        writer: W,
        terminal: Terminal,
        token: CancellationToken,
    ) -> Result<Pipeline<W>> {
        let mut pipeline =
            Pipeline::with_boxed_sink(self.sink(terminal)?, writer).with_cancellation(token);

        if let Some(expression) = &self.filter {
            pipeline.push_stage(Box::new(Filter::parse(expression)?));
        }
        if !self.sort_by.is_empty() {
            pipeline.push_stage(Box::new(Sort::parse(&self.sort_by)?));
        }
        if self.limit.is_some() || self.offset > 0 {
            pipeline.push_stage(Box::new(Limit::new(self.limit).with_offset(self.offset)));
        }
        if !self.rename.is_empty() {
            pipeline.push_stage(Box::new(Rename::new(self.rename.clone())));
        }
        if !self.fields.is_empty() {
            pipeline.push_stage(Box::new(Select::new(self.fields.clone())));
        }
        if !self.exclude.is_empty() {
            pipeline.push_stage(Box::new(Exclude::new(self.exclude.clone())));
        }
        Ok(pipeline)
    }
}
