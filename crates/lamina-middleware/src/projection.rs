use crate::error::{Error, Result};
use crate::resolve::ParsedLayer;
use lamina_params::{ParamValue, ValueTypeError};

type Setter<T> = Box<dyn Fn(&mut T, &ParamValue) -> std::result::Result<(), ValueTypeError> + Send + Sync>;

/// Explicit parameter-to-field table used to fill a settings struct.
///
/// ```ignore
/// let bindings = Bindings::<Output>::new()
///     .field("limit", |o, v: usize| o.limit = Some(v))
///     .field("fields", |o, v: Vec<String>| o.fields = v);
/// let output = parsed.layer("output")?.project(&bindings)?;
/// ```
pub struct Bindings<T> {
    setters: Vec<(String, Setter<T>)>,
}

impl<T> Default for Bindings<T> {
    fn default() -> Self {
        Self {
            setters: Vec::new(),
        }
    }
}

impl<T> Bindings<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a parameter to a setter. The value is converted with
    /// `TryFrom<&ParamValue>` before the setter runs.
    pub fn field<V, F>(mut self, parameter: impl Into<String>, setter: F) -> Self
    where
        T: 'static,
        V: for<'a> TryFrom<&'a ParamValue, Error = ValueTypeError> + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.setters.push((
            parameter.into(),
            Box::new(move |target, value| {
                setter(target, V::try_from(value)?);
                Ok(())
            }),
        ));
        self
    }

    /// Parameter names with a binding
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.setters.iter().map(|(name, _)| name.as_str())
    }

    /// Start from `T::default()` and apply every bound parameter present in
    /// the layer
    pub fn apply(&self, layer: &ParsedLayer) -> Result<T>
    where
        T: Default,
    {
        let mut target = T::default();
        for (name, setter) in &self.setters {
            let Some(value) = layer.get(name) else {
                continue;
            };
            setter(&mut target, value).map_err(|e| Error::Projection {
                layer: layer.slug().to_string(),
                parameter: name.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(target)
    }
}

/// A settings struct tied to one layer slug.
pub trait LayerSettings: Default + 'static {
    const LAYER: &'static str;

    fn bindings() -> Bindings<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Contributions, Provenance, SourceKind};
    use crate::Resolver;
    use lamina_params::{
        LayerSet, ParameterDefinition, ParameterLayer, ParameterType, RawValue, TypeRegistry,
    };

    #[derive(Debug, Default, PartialEq)]
    struct Server {
        host: String,
        port: i64,
        tags: Vec<String>,
        verbose: bool,
    }

    impl LayerSettings for Server {
        const LAYER: &'static str = "server";

        fn bindings() -> Bindings<Self> {
            Bindings::new()
                .field("host", |s: &mut Server, v: String| s.host = v)
                .field("port", |s: &mut Server, v: i64| s.port = v)
                .field("tags", |s: &mut Server, v: Vec<String>| s.tags = v)
                .field("verbose", |s: &mut Server, v: bool| s.verbose = v)
        }
    }

    fn layers() -> LayerSet {
        let layer = ParameterLayer::builder("server", "Server")
            .parameter(ParameterDefinition::new("host", ParameterType::String).default_value("0.0.0.0"))
            .parameter(ParameterDefinition::new("port", ParameterType::Integer))
            .parameter(ParameterDefinition::new("tags", ParameterType::StringList))
            .parameter(ParameterDefinition::new("verbose", ParameterType::Bool))
            .build(&TypeRegistry::standard())
            .expect("valid layer");
        LayerSet::new().with(layer).expect("unique slug")
    }

    #[test]
    fn test_settings_projection_leaves_absent_fields_default() -> anyhow::Result<()> {
        let mut acc = Contributions::new();
        acc.set(
            "server",
            "tags",
            RawValue::from("a, b"),
            Provenance::new(SourceKind::Cli, "cli:--tags"),
        );
        let registry = TypeRegistry::standard();
        let parsed = Resolver::new(&registry).resolve(&layers(), &acc)?;
        let server: Server = parsed.settings()?;
        assert_eq!(
            server,
            Server {
                host: "0.0.0.0".to_string(),
                port: 0,
                tags: vec!["a".to_string(), "b".to_string()],
                verbose: false,
            }
        );
        Ok(())
    }

    #[test]
    fn test_type_mismatch_is_projection_error() -> anyhow::Result<()> {
        let registry = TypeRegistry::standard();
        let parsed = Resolver::new(&registry).resolve(&layers(), &Contributions::new())?;
        let wrong = Bindings::<Server>::new().field("host", |s: &mut Server, v: i64| s.port = v);
        let err = parsed.layer("server")?.project(&wrong).unwrap_err();
        assert!(matches!(err, Error::Projection { ref parameter, .. } if parameter == "host"));
        Ok(())
    }
}
