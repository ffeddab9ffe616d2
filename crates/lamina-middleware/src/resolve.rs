use crate::error::{Error, Result};
use crate::projection::{Bindings, LayerSettings};
use crate::source::{Contributions, Provenance};
use indexmap::IndexMap;
use lamina_params::{
    LayerSet, ParamValue, ParameterDefinition, ParameterLayer, RawValue, TypeRegistry,
    ValueTypeError,
};

/// A resolved value with the source that supplied it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedParameter {
    pub value: ParamValue,
    pub source: Provenance,
    /// Overridden contributions, lowest precedence first
    pub history: Vec<Provenance>,
}

/// Resolved values of one layer, in declaration order.
///
/// Optional parameters that received no value and have no default are
/// absent rather than zero-valued.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedLayer {
    slug: String,
    parameters: IndexMap<String, ParsedParameter>,
}

impl ParsedLayer {
    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.get(name).map(|p| &p.value)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParsedParameter> {
        self.parameters.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParsedParameter)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Typed read of one parameter; `Ok(None)` when it is absent
    pub fn get_as<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: for<'a> TryFrom<&'a ParamValue, Error = ValueTypeError>,
    {
        self.get(name)
            .map(|value| {
                T::try_from(value).map_err(|e| Error::Projection {
                    layer: self.slug.clone(),
                    parameter: name.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// Fill a settings struct through explicit field bindings
    pub fn project<T: Default>(&self, bindings: &Bindings<T>) -> Result<T> {
        bindings.apply(self)
    }
}

/// Every declared layer, resolved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedLayers {
    layers: IndexMap<String, ParsedLayer>,
}

impl ParsedLayers {
    pub fn get(&self, slug: &str) -> Option<&ParsedLayer> {
        self.layers.get(slug)
    }

    /// Like [`ParsedLayers::get`], but a missing layer is an error
    pub fn layer(&self, slug: &str) -> Result<&ParsedLayer> {
        self.get(slug)
            .ok_or_else(|| Error::UnknownLayer(slug.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParsedLayer> {
        self.layers.values()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Project the layer a settings type is bound to
    pub fn settings<S: LayerSettings>(&self) -> Result<S> {
        self.layer(S::LAYER)?.project(&S::bindings())
    }
}

/// Turns accumulated raw contributions into typed, validated layers.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    /// Resolve every layer. The first failure aborts the whole resolution.
    pub fn resolve(&self, layers: &LayerSet, contributions: &Contributions) -> Result<ParsedLayers> {
        let mut parsed = ParsedLayers::default();
        for layer in layers {
            let resolved = self.resolve_layer(layer, contributions)?;
            parsed.layers.insert(layer.slug().to_string(), resolved);
        }
        Ok(parsed)
    }

    fn resolve_layer(
        &self,
        layer: &ParameterLayer,
        contributions: &Contributions,
    ) -> Result<ParsedLayer> {
        let mut parameters = IndexMap::new();
        for def in layer.definitions() {
            if let Some(parsed) = self.resolve_parameter(layer.slug(), def, contributions)? {
                parameters.insert(def.name.clone(), parsed);
            }
        }
        Ok(ParsedLayer {
            slug: layer.slug().to_string(),
            parameters,
        })
    }

    fn resolve_parameter(
        &self,
        slug: &str,
        def: &ParameterDefinition,
        contributions: &Contributions,
    ) -> Result<Option<ParsedParameter>> {
        let history = contributions.history(slug, &def.name);
        let (raw, source, overridden) = match history.split_last() {
            Some((winner, earlier)) => (
                winner.raw.clone(),
                winner.provenance.clone(),
                earlier.iter().map(|c| c.provenance.clone()).collect(),
            ),
            None => match &def.default {
                Some(default) => (
                    RawValue::Typed(default.clone()),
                    Provenance::default_value(),
                    Vec::new(),
                ),
                None if def.required => {
                    return Err(Error::MissingRequiredParameter {
                        layer: slug.to_string(),
                        parameter: def.name.clone(),
                    });
                }
                None => return Ok(None),
            },
        };

        let parse_error = |expected: String, reason: String| Error::ParameterParseError {
            layer: slug.to_string(),
            parameter: def.name.clone(),
            raw: raw.describe(def.is_secret()),
            expected,
            reason,
        };

        let handler = self.registry.handler(def.ty).ok_or_else(|| {
            parse_error(
                def.ty.expected().to_string(),
                format!("no handler registered for type {}", def.ty),
            )
        })?;

        let value = handler
            .parse(def, &raw)
            .map_err(|failure| parse_error(failure.expected, failure.reason))?;

        handler
            .validate(def, &value)
            .map_err(|failure| Error::ParameterValidationError {
                layer: slug.to_string(),
                parameter: def.name.clone(),
                reason: failure.reason,
            })?;

        tracing::trace!(layer = slug, parameter = %def.name, source = %source, "resolved");

        Ok(Some(ParsedParameter {
            value,
            source,
            history: overridden,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceKind;
    use lamina_params::ParameterType;

    fn layers() -> LayerSet {
        let layer = ParameterLayer::builder("db", "Database")
            .parameter(ParameterDefinition::new("host", ParameterType::String).required())
            .parameter(ParameterDefinition::new("port", ParameterType::Integer).default_value(5432_i64))
            .parameter(ParameterDefinition::new("password", ParameterType::Secret))
            .parameter(ParameterDefinition::new("note", ParameterType::String))
            .build(&TypeRegistry::standard())
            .expect("valid layer");
        LayerSet::new().with(layer).expect("unique slug")
    }

    fn cli(acc: &mut Contributions, name: &str, raw: &str) {
        acc.set(
            "db",
            name,
            RawValue::from(raw),
            Provenance::new(SourceKind::Cli, format!("cli:--{}", name)),
        );
    }

    #[test]
    fn test_default_used_and_optional_absent() -> anyhow::Result<()> {
        let mut acc = Contributions::new();
        cli(&mut acc, "host", "localhost");
        let registry = TypeRegistry::standard();
        let parsed = Resolver::new(&registry).resolve(&layers(), &acc)?;
        let db = parsed.layer("db")?;

        assert_eq!(db.get("port"), Some(&ParamValue::Integer(5432)));
        assert_eq!(
            db.parameter("port").map(|p| p.source.kind),
            Some(SourceKind::Defaults)
        );
        assert!(!db.contains("note"));
        assert_eq!(db.len(), 2);
        Ok(())
    }

    #[test]
    fn test_missing_required() {
        let registry = TypeRegistry::standard();
        let err = Resolver::new(&registry)
            .resolve(&layers(), &Contributions::new())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingRequiredParameter { ref layer, ref parameter }
                if layer == "db" && parameter == "host"
        ));
    }

    #[test]
    fn test_parse_error_masks_secret() {
        let mut acc = Contributions::new();
        cli(&mut acc, "host", "h");
        acc.set(
            "db",
            "password",
            RawValue::Structured(serde_json::json!(["hunter2"])),
            Provenance::new(SourceKind::ConfigFile, "config:test"),
        );
        let registry = TypeRegistry::standard();
        let err = Resolver::new(&registry)
            .resolve(&layers(), &acc)
            .unwrap_err();
        assert!(matches!(err, Error::ParameterParseError { ref raw, .. } if raw == "***"));
        assert!(!err.to_string().contains("hunter2"));
    }

    #[test]
    fn test_parse_error_names_parameter() {
        let mut acc = Contributions::new();
        cli(&mut acc, "host", "h");
        cli(&mut acc, "port", "ten");
        let registry = TypeRegistry::standard();
        let err = Resolver::new(&registry)
            .resolve(&layers(), &acc)
            .unwrap_err();
        match err {
            Error::ParameterParseError {
                layer,
                parameter,
                raw,
                expected,
                ..
            } => {
                assert_eq!(layer, "db");
                assert_eq!(parameter, "port");
                assert_eq!(raw, "ten");
                assert_eq!(expected, "an integer");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_layer_lookup() {
        let parsed = ParsedLayers::default();
        assert!(matches!(parsed.layer("nope"), Err(Error::UnknownLayer(_))));
    }
}
