use crate::error::Result;
use crate::source::{Contributions, Provenance, Source, SourceKind};
use lamina_params::{LayerSet, RawValue};

/// Contributes the defaults declared on each parameter definition.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultsSource;

impl Source for DefaultsSource {
    fn name(&self) -> &str {
        "defaults"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Defaults
    }

    fn contribute(&self, layers: &LayerSet, acc: &mut Contributions) -> Result<()> {
        for layer in layers {
            for def in layer.definitions() {
                if let Some(default) = &def.default {
                    acc.set(
                        layer.slug(),
                        &def.name,
                        RawValue::Typed(default.clone()),
                        Provenance::default_value(),
                    );
                }
            }
        }
        Ok(())
    }
}
