use crate::error::Result;
use indexmap::IndexMap;
use lamina_params::{LayerSet, RawValue};
use std::fmt;

/// Rank of a source. Sources run in ascending rank; a higher rank wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    Defaults,
    ConfigFile,
    Environment,
    Cli,
    Override,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Defaults => write!(f, "default"),
            SourceKind::ConfigFile => write!(f, "config"),
            SourceKind::Environment => write!(f, "env"),
            SourceKind::Cli => write!(f, "cli"),
            SourceKind::Override => write!(f, "override"),
        }
    }
}

/// Where a value came from, e.g. `env:LAMINA_LIMIT` or `cli:--limit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub kind: SourceKind,
    pub origin: String,
}

impl Provenance {
    pub fn new(kind: SourceKind, origin: impl Into<String>) -> Self {
        Self {
            kind,
            origin: origin.into(),
        }
    }

    pub fn default_value() -> Self {
        Self::new(SourceKind::Defaults, "default")
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.origin)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub raw: RawValue,
    pub provenance: Provenance,
}

/// Accumulated raw values, per layer slug and parameter name.
///
/// Every write is kept; the last one is the effective value.
#[derive(Debug, Clone, Default)]
pub struct Contributions {
    layers: IndexMap<String, IndexMap<String, Vec<Contribution>>>,
}

impl Contributions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value, replacing any earlier one for the same parameter
    pub fn set(
        &mut self,
        layer: &str,
        parameter: &str,
        raw: RawValue,
        provenance: Provenance,
    ) {
        tracing::trace!(layer, parameter, source = %provenance, "contribution");
        self.layers
            .entry(layer.to_string())
            .or_default()
            .entry(parameter.to_string())
            .or_default()
            .push(Contribution { raw, provenance });
    }

    /// Effective (last written) contribution
    pub fn get(&self, layer: &str, parameter: &str) -> Option<&Contribution> {
        self.history(layer, parameter).last()
    }

    /// Every contribution for a parameter, lowest precedence first
    pub fn history(&self, layer: &str, parameter: &str) -> &[Contribution] {
        self.layers
            .get(layer)
            .and_then(|params| params.get(parameter))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_set(&self, layer: &str, parameter: &str) -> bool {
        self.get(layer, parameter).is_some()
    }

    /// Iterate effective contributions as `(layer, parameter, contribution)`
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Contribution)> {
        self.layers.iter().flat_map(|(layer, params)| {
            params.iter().filter_map(move |(name, history)| {
                history
                    .last()
                    .map(|c| (layer.as_str(), name.as_str(), c))
            })
        })
    }

    /// Number of parameters with at least one contribution
    pub fn len(&self) -> usize {
        self.layers.values().map(|p| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A ranked provider of raw parameter values.
///
/// Responsibilities:
/// - Read its backing store (file, environment, argv, code)
/// - Write zero or more values per declared layer into the accumulator
/// - Treat an unreachable store as "no contribution" unless told otherwise
pub trait Source: Send + Sync {
    /// Short label used in logs
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    fn contribute(&self, layers: &LayerSet, acc: &mut Contributions) -> Result<()>;
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn kind(&self) -> SourceKind {
        (**self).kind()
    }

    fn contribute(&self, layers: &LayerSet, acc: &mut Contributions) -> Result<()> {
        (**self).contribute(layers, acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins_and_history_kept() {
        let mut acc = Contributions::new();
        acc.set(
            "db",
            "host",
            RawValue::from("a"),
            Provenance::new(SourceKind::ConfigFile, "config:test"),
        );
        acc.set(
            "db",
            "host",
            RawValue::from("b"),
            Provenance::new(SourceKind::Cli, "cli:--host"),
        );
        let effective = acc.get("db", "host").expect("set");
        assert_eq!(effective.raw, RawValue::from("b"));
        assert_eq!(acc.history("db", "host").len(), 2);
        assert_eq!(acc.len(), 1);
        assert!(!acc.is_set("db", "port"));
    }

    #[test]
    fn test_kind_ordering() {
        assert!(SourceKind::Defaults < SourceKind::ConfigFile);
        assert!(SourceKind::ConfigFile < SourceKind::Environment);
        assert!(SourceKind::Environment < SourceKind::Cli);
        assert!(SourceKind::Cli < SourceKind::Override);
    }
}
