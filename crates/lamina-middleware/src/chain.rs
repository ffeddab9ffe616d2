use crate::error::Result;
use crate::resolve::{ParsedLayers, Resolver};
use crate::source::{Contributions, Source};
use lamina_params::{LayerSet, TypeRegistry};

/// Ordered set of value sources.
///
/// Sources run in ascending [`crate::SourceKind`] rank regardless of the
/// order they were added; among equal ranks the one added later runs later
/// and therefore wins.
#[derive(Default)]
pub struct MiddlewareChain {
    sources: Vec<Box<dyn Source>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: impl Source + 'static) {
        self.sources.push(Box::new(source));
    }

    pub fn with(mut self, source: impl Source + 'static) -> Self {
        self.push(source);
        self
    }

    /// Source names in execution order
    pub fn names(&self) -> Vec<&str> {
        self.ordered().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn ordered(&self) -> impl Iterator<Item = &dyn Source> {
        let mut sources: Vec<&dyn Source> = self.sources.iter().map(|s| s.as_ref()).collect();
        sources.sort_by_key(|s| s.kind());
        sources.into_iter()
    }

    /// Run every source and return the accumulated contributions
    pub fn run(&self, layers: &LayerSet) -> Result<Contributions> {
        let mut acc = Contributions::new();
        for source in self.ordered() {
            let before = acc.clone();
            source.contribute(layers, &mut acc)?;
            tracing::debug!(
                source = source.name(),
                kind = %source.kind(),
                changed = changed_count(&before, &acc),
                "source applied"
            );
        }
        Ok(acc)
    }

    /// Run every source, then parse and validate the result
    pub fn resolve(&self, registry: &TypeRegistry, layers: &LayerSet) -> Result<ParsedLayers> {
        let contributions = self.run(layers)?;
        Resolver::new(registry).resolve(layers, &contributions)
    }
}

fn changed_count(before: &Contributions, after: &Contributions) -> usize {
    after
        .iter()
        .filter(|(layer, parameter, c)| before.get(layer, parameter) != Some(*c))
        .count()
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("sources", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Provenance, SourceKind};
    use crate::sources::{DefaultsSource, OverrideSource};
    use lamina_params::{ParameterDefinition, ParameterLayer, ParameterType, RawValue};

    struct Fixed {
        name: &'static str,
        kind: SourceKind,
        value: &'static str,
    }

    impl Source for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn contribute(&self, _layers: &LayerSet, acc: &mut Contributions) -> Result<()> {
            acc.set(
                "app",
                "mode",
                RawValue::from(self.value),
                Provenance::new(self.kind, self.name),
            );
            Ok(())
        }
    }

    fn layers() -> LayerSet {
        let layer = ParameterLayer::builder("app", "App")
            .parameter(ParameterDefinition::new("mode", ParameterType::String).default_value("d"))
            .build(&TypeRegistry::standard())
            .expect("valid layer");
        LayerSet::new().with(layer).expect("unique slug")
    }

    #[test]
    fn test_sources_sorted_by_rank() {
        let chain = MiddlewareChain::new()
            .with(Fixed {
                name: "cli",
                kind: SourceKind::Cli,
                value: "c",
            })
            .with(DefaultsSource)
            .with(Fixed {
                name: "env",
                kind: SourceKind::Environment,
                value: "e",
            });
        assert_eq!(chain.names(), vec!["defaults", "env", "cli"]);
    }

    #[test]
    fn test_equal_rank_later_wins() -> anyhow::Result<()> {
        let chain = MiddlewareChain::new()
            .with(Fixed {
                name: "first",
                kind: SourceKind::ConfigFile,
                value: "one",
            })
            .with(Fixed {
                name: "second",
                kind: SourceKind::ConfigFile,
                value: "two",
            });
        let acc = chain.run(&layers())?;
        assert_eq!(
            acc.get("app", "mode").map(|c| c.provenance.origin.as_str()),
            Some("second")
        );
        Ok(())
    }

    #[test]
    fn test_override_beats_everything() -> anyhow::Result<()> {
        let chain = MiddlewareChain::new()
            .with(OverrideSource::new().set("app", "mode", "forced"))
            .with(Fixed {
                name: "cli",
                kind: SourceKind::Cli,
                value: "c",
            })
            .with(DefaultsSource);
        let parsed = chain.resolve(&TypeRegistry::standard(), &layers())?;
        let layer = parsed.layer("app")?;
        assert_eq!(layer.get_as::<String>("mode")?, Some("forced".to_string()));
        assert_eq!(
            layer.parameter("mode").map(|p| p.history.len()),
            Some(2)
        );
        Ok(())
    }
}
