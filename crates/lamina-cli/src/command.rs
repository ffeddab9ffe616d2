use crate::config::ConfigLocation;
use crate::output::{OUTPUT_LAYER, OutputSettings, Terminal};
use anyhow::Result;
use lamina_middleware::{
    CliArguments, CliSource, ConfigFileSource, DefaultsSource, EnvSource, LayerSettings,
    MiddlewareChain, OverrideSource, ParsedLayers,
};
use lamina_params::{LayerSet, TypeRegistry};
use lamina_pipeline::{CancellationToken, Error as PipelineError, Flow, Pipeline};
use lamina_types::Row;
use std::io::Write;

/// Runs with resolved parameters and no output channel of its own.
pub trait DirectCommand {
    fn run(&self, parsed: &ParsedLayers) -> Result<()>;
}

/// Writes free-form text.
pub trait WriterCommand {
    fn run(&self, parsed: &ParsedLayers, out: &mut dyn Write) -> Result<()>;
}

/// Produces rows; formatting is left to the output layer.
pub trait RowCommand {
    fn run(&self, parsed: &ParsedLayers, rows: &mut RowEmitter<'_, '_>) -> Result<()>;
}

/// Command kind, fixed when the command is built.
pub enum Command {
    Direct(Box<dyn DirectCommand>),
    Writer(Box<dyn WriterCommand>),
    Rows(Box<dyn RowCommand>),
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Direct(_) => "direct",
            Command::Writer(_) => "writer",
            Command::Rows(_) => "rows",
        }
    }
}

/// A command plus the layers it declares.
pub struct CommandDef {
    pub name: String,
    pub layers: LayerSet,
    pub command: Command,
}

impl CommandDef {
    pub fn new(name: impl Into<String>, layers: LayerSet, command: Command) -> Self {
        Self {
            name: name.into(),
            layers,
            command,
        }
    }
}

/// The only handle a row command gets on the pipeline.
pub struct RowEmitter<'p, 'w> {
    pipeline: &'p mut Pipeline<&'w mut dyn Write>,
    rejected: Option<PipelineError>,
}

impl RowEmitter<'_, '_> {
    /// Hand one row to the pipeline.
    ///
    /// Every error is returned, including [`PipelineError::RowFormat`] for
    /// a row the sink cannot represent. A command may keep adding rows
    /// after a rejection, but the invocation still fails once it returns.
    pub fn add_row(&mut self, row: Row) -> lamina_pipeline::Result<Flow> {
        let result = self.pipeline.add_row(row);
        if let Err(PipelineError::RowFormat { row, field, reason }) = &result
            && self.rejected.is_none()
        {
            self.rejected = Some(PipelineError::RowFormat {
                row: *row,
                field: field.clone(),
                reason: reason.clone(),
            });
        }
        result
    }
}

/// Resolves a command's layers from every source, then dispatches by kind.
pub struct Runner {
    registry: TypeRegistry,
    env_prefix: String,
    env_vars: Option<Vec<(String, String)>>,
    config: Option<ConfigLocation>,
    overrides: OverrideSource,
    terminal: Terminal,
    token: CancellationToken,
}

impl Runner {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry,
            env_prefix: "LAMINA".to_string(),
            env_vars: None,
            config: None,
            overrides: OverrideSource::new(),
            terminal: Terminal::default(),
            token: CancellationToken::new(),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn with_config(mut self, config: Option<ConfigLocation>) -> Self {
        self.config = config;
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Read these variables instead of the process environment
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn with_overrides(mut self, overrides: OverrideSource) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_terminal(mut self, terminal: Terminal) -> Self {
        self.terminal = terminal;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Sources for one invocation, lowest precedence first
    pub fn chain(&self, cli: CliArguments) -> MiddlewareChain {
        let mut chain = MiddlewareChain::new().with(DefaultsSource);
        if let Some(config) = &self.config {
            let source = ConfigFileSource::new(&config.path);
            chain.push(if config.required {
                source.required()
            } else {
                source
            });
        }
        chain.push(match &self.env_vars {
            Some(vars) => EnvSource::from_vars(&self.env_prefix, vars.iter().cloned()),
            None => EnvSource::new(&self.env_prefix),
        });
        chain.push(CliSource::new(cli));
        if !self.overrides.is_empty() {
            chain.push(self.overrides.clone());
        }
        chain
    }

    pub fn resolve(&self, def: &CommandDef, cli: CliArguments) -> Result<ParsedLayers> {
        let chain = self.chain(cli);
        tracing::debug!(command = %def.name, sources = ?chain.names(), "resolving parameters");
        Ok(chain.resolve(&self.registry, &def.layers)?)
    }

    pub fn run(&self, def: &CommandDef, cli: CliArguments, out: &mut dyn Write) -> Result<()> {
        let parsed = self.resolve(def, cli)?;
        tracing::debug!(command = %def.name, kind = def.command.kind(), "dispatching");

        match &def.command {
            Command::Direct(command) => command.run(&parsed),
            Command::Writer(command) => {
                command.run(&parsed, out)?;
                out.flush()?;
                Ok(())
            }
            Command::Rows(command) => self.run_rows(command.as_ref(), &parsed, out),
        }
    }

    fn run_rows(
        &self,
        command: &dyn RowCommand,
        parsed: &ParsedLayers,
        out: &mut dyn Write,
    ) -> Result<()> {
        let settings = match parsed.get(OUTPUT_LAYER) {
            Some(layer) => layer.project(&OutputSettings::bindings())?,
            None => OutputSettings::default(),
        };
        let mut pipeline = settings.build_pipeline(out, self.terminal, self.token.clone())?;
        if !pipeline.is_streaming() {
            tracing::debug!(
                sink = %pipeline.sink_mode(),
                stages = ?pipeline.stage_names(),
                "output is held until the command finishes"
            );
        }

        let mut emitter = RowEmitter {
            pipeline: &mut pipeline,
            rejected: None,
        };
        command.run(parsed, &mut emitter)?;
        if let Some(err) = emitter.rejected {
            // the sink is left unfinished so buffered output is dropped
            return Err(err.into());
        }

        let summary = pipeline.close()?;
        tracing::debug!(emitted = summary.rows_emitted, "rows written");
        Ok(())
    }
}
