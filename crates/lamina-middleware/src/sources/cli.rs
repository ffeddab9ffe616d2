use crate::error::Result;
use crate::source::{Contributions, Provenance, Source, SourceKind};
use indexmap::IndexMap;
use lamina_params::{LayerSet, RawValue};

/// Flag values collected from the command line, keyed by flag name
/// (without leading dashes). A flag that was not given is absent, never
/// an empty string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliArguments {
    values: IndexMap<String, Vec<String>>,
}

impl CliArguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of a flag
    pub fn push(&mut self, flag: impl Into<String>, value: impl Into<String>) {
        self.values
            .entry(flag.into())
            .or_default()
            .push(value.into());
    }

    /// Builder form of [`CliArguments::push`]
    pub fn with(mut self, flag: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(flag, value);
        self
    }

    pub fn get(&self, flag: &str) -> Option<&[String]> {
        self.values.get(flag).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Values from parsed command-line flags.
///
/// The flag for a parameter is the layer prefix followed by the parameter
/// name. Repeated occurrences are handed to the parser together: list kinds
/// gather them, scalar kinds keep the last one.
#[derive(Debug, Clone, Default)]
pub struct CliSource {
    arguments: CliArguments,
}

impl CliSource {
    pub fn new(arguments: CliArguments) -> Self {
        Self { arguments }
    }
}

impl Source for CliSource {
    fn name(&self) -> &str {
        "cli"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Cli
    }

    fn contribute(&self, layers: &LayerSet, acc: &mut Contributions) -> Result<()> {
        for layer in layers {
            for def in layer.definitions() {
                let flag = layer.flag_name(def);
                let raw = match self.arguments.get(&flag) {
                    Some([]) | None => continue,
                    Some([single]) => RawValue::Text(single.clone()),
                    Some(many) => RawValue::Texts(many.to_vec()),
                };
                acc.set(
                    layer.slug(),
                    &def.name,
                    raw,
                    Provenance::new(SourceKind::Cli, format!("cli:--{}", flag)),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_params::{ParameterDefinition, ParameterLayer, ParameterType, TypeRegistry};

    #[test]
    fn test_prefixed_flags_and_repeats() -> anyhow::Result<()> {
        let layer = ParameterLayer::builder("db", "Database")
            .prefix("db-")
            .parameter(ParameterDefinition::new("host", ParameterType::String))
            .parameter(ParameterDefinition::new("tags", ParameterType::StringList))
            .build(&TypeRegistry::standard())?;
        let layers = LayerSet::new().with(layer)?;

        let args = CliArguments::new()
            .with("db-host", "example")
            .with("db-tags", "a")
            .with("db-tags", "b")
            .with("host", "ignored");
        let mut acc = Contributions::new();
        CliSource::new(args).contribute(&layers, &mut acc)?;

        assert_eq!(
            acc.get("db", "host").map(|c| &c.raw),
            Some(&RawValue::from("example"))
        );
        assert_eq!(
            acc.get("db", "tags").map(|c| &c.raw),
            Some(&RawValue::Texts(vec!["a".to_string(), "b".to_string()]))
        );
        assert_eq!(
            acc.get("db", "host").map(|c| c.provenance.origin.as_str()),
            Some("cli:--db-host")
        );
        Ok(())
    }
}
