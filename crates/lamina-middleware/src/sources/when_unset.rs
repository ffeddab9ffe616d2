use crate::error::Result;
use crate::source::{Contributions, Source, SourceKind};
use lamina_params::LayerSet;

/// Wraps a source so it only fills parameters nothing earlier has set.
///
/// Useful for fallback documents such as a system-wide config that should
/// never shadow a value already provided.
#[derive(Debug, Clone)]
pub struct WhenUnset<S> {
    inner: S,
}

impl<S: Source> WhenUnset<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Source> Source for WhenUnset<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn kind(&self) -> SourceKind {
        self.inner.kind()
    }

    fn contribute(&self, layers: &LayerSet, acc: &mut Contributions) -> Result<()> {
        let mut scratch = Contributions::new();
        self.inner.contribute(layers, &mut scratch)?;

        for (layer, parameter, contribution) in scratch.iter() {
            if acc.is_set(layer, parameter) {
                continue;
            }
            acc.set(
                layer,
                parameter,
                contribution.raw.clone(),
                contribution.provenance.clone(),
            );
        }
        Ok(())
    }
}
