use crate::error::Result;
use crate::source::{Contributions, Provenance, Source, SourceKind};
use lamina_params::{LayerSet, RawValue};

/// Values set programmatically; the highest-precedence source.
///
/// Entries naming a layer or parameter the command does not declare are
/// skipped with a warning.
#[derive(Debug, Clone, Default)]
pub struct OverrideSource {
    entries: Vec<(String, String, RawValue)>,
}

impl OverrideSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        mut self,
        layer: impl Into<String>,
        parameter: impl Into<String>,
        value: impl Into<RawValue>,
    ) -> Self {
        self.entries
            .push((layer.into(), parameter.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Source for OverrideSource {
    fn name(&self) -> &str {
        "overrides"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Override
    }

    fn contribute(&self, layers: &LayerSet, acc: &mut Contributions) -> Result<()> {
        for (slug, parameter, raw) in &self.entries {
            let declared = layers
                .get(slug)
                .is_some_and(|layer| layer.definition(parameter).is_some());
            if !declared {
                tracing::warn!(layer = %slug, parameter = %parameter, "override targets an undeclared parameter");
                continue;
            }
            acc.set(
                slug,
                parameter,
                raw.clone(),
                Provenance::new(SourceKind::Override, "override"),
            );
        }
        Ok(())
    }
}
