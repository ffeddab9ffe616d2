use crate::error::Result;
use crate::source::{Contributions, Provenance, Source, SourceKind};
use lamina_params::{LayerSet, RawValue};
use std::collections::HashMap;

/// Values from environment variables named `<PREFIX>_<PARAMETER>`,
/// upper-cased with `-` turned into `_`.
///
/// By default the process environment is read when the source runs;
/// `from_vars` injects a fixed set of variables instead.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    vars: Option<HashMap<String, String>>,
}

impl EnvSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            vars: None,
        }
    }

    pub fn from_vars<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            vars: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Variable name consulted for a parameter
    pub fn variable_name(&self, parameter: &str) -> String {
        let name = if self.prefix.is_empty() {
            parameter.to_string()
        } else {
            format!("{}_{}", self.prefix, parameter)
        };
        name.to_uppercase().replace('-', "_")
    }

    fn lookup(&self, key: &str) -> Option<String> {
        match &self.vars {
            Some(vars) => vars.get(key).cloned(),
            None => std::env::var(key).ok(),
        }
    }
}

impl Source for EnvSource {
    fn name(&self) -> &str {
        "environment"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Environment
    }

    fn contribute(&self, layers: &LayerSet, acc: &mut Contributions) -> Result<()> {
        for layer in layers {
            for def in layer.definitions().iter().filter(|d| d.from_env) {
                let key = self.variable_name(&def.name);
                if let Some(value) = self.lookup(&key) {
                    acc.set(
                        layer.slug(),
                        &def.name,
                        RawValue::Text(value),
                        Provenance::new(SourceKind::Environment, format!("env:{}", key)),
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_params::{ParameterDefinition, ParameterLayer, ParameterType, TypeRegistry};

    fn layers() -> LayerSet {
        let layer = ParameterLayer::builder("db", "Database")
            .parameter(ParameterDefinition::new("max-connections", ParameterType::Integer))
            .parameter(ParameterDefinition::new("password", ParameterType::Secret).no_env())
            .build(&TypeRegistry::standard())
            .expect("valid layer");
        LayerSet::new().with(layer).expect("unique slug")
    }

    #[test]
    fn test_variable_name_transform() {
        let source = EnvSource::new("app");
        assert_eq!(source.variable_name("max-connections"), "APP_MAX_CONNECTIONS");
        assert_eq!(EnvSource::new("").variable_name("limit"), "LIMIT");
    }

    #[test]
    fn test_contributes_present_vars_only() -> anyhow::Result<()> {
        let source = EnvSource::from_vars(
            "APP",
            [("APP_MAX_CONNECTIONS", "12"), ("APP_PASSWORD", "hunter2")],
        );
        let mut acc = Contributions::new();
        source.contribute(&layers(), &mut acc)?;

        let c = acc.get("db", "max-connections").expect("set from env");
        assert_eq!(c.raw, RawValue::from("12"));
        assert_eq!(c.provenance.origin, "env:APP_MAX_CONNECTIONS");
        assert!(!acc.is_set("db", "password"));
        Ok(())
    }
}
