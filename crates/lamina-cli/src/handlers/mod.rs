pub mod ls;
pub mod params;
pub mod version;

use crate::args::Commands;
use crate::command::{Command, CommandDef};
use crate::output::output_layer;
use anyhow::{Result, bail};
use lamina_params::{LayerSet, TypeRegistry};

/// Layers a subcommand declares. Used both to build its flags and to
/// resolve its parameters.
pub fn layers(name: &str, registry: &TypeRegistry) -> Result<LayerSet> {
    let layers = match name {
        "ls" => LayerSet::new()
            .with(ls::layer(registry)?)?
            .with(output_layer(registry)?)?,
        "params" => LayerSet::new()
            .with(params::layer(registry)?)?
            .with(ls::layer(registry)?)?
            .with(output_layer(registry)?)?,
        "version" => LayerSet::new(),
        other => bail!("unknown command '{}'", other),
    };
    Ok(layers)
}

/// Bind a parsed subcommand to its implementation.
pub fn definition(command: &Commands, registry: &TypeRegistry) -> Result<CommandDef> {
    let kind = match command {
        Commands::Ls { path } => Command::Rows(Box::new(ls::ListDirectory::new(
            path.clone().unwrap_or_else(|| ".".into()),
        ))),
        Commands::Params => Command::Writer(Box::new(params::ShowParams)),
        Commands::Version => Command::Direct(Box::new(version::ShowVersion)),
    };
    Ok(CommandDef::new(
        command.name(),
        layers(command.name(), registry)?,
        kind,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_command_has_layers() -> anyhow::Result<()> {
        let registry = TypeRegistry::standard();
        for name in Commands::NAMES {
            layers(name, &registry)?;
        }
        assert!(layers("nope", &registry).is_err());
        Ok(())
    }
}
