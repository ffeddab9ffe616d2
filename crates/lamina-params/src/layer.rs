use crate::definition::ParameterDefinition;
use crate::error::{Error, Result};
use crate::registry::TypeRegistry;
use crate::value::RawValue;
use std::collections::HashSet;
use std::sync::Arc;

/// A named, ordered group of parameter definitions for one concern.
///
/// Layers are schema only. They are built once, validated against a
/// [`TypeRegistry`], and shared read-only (usually behind an `Arc`).
#[derive(Debug, Clone)]
pub struct ParameterLayer {
    slug: String,
    name: String,
    description: String,
    prefix: String,
    definitions: Vec<ParameterDefinition>,
}

impl ParameterLayer {
    pub fn builder(slug: impl Into<String>, name: impl Into<String>) -> LayerBuilder {
        LayerBuilder {
            slug: slug.into(),
            name: name.into(),
            description: String::new(),
            prefix: String::new(),
            definitions: Vec::new(),
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Prefix prepended to every flag name of this layer
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn definitions(&self) -> &[ParameterDefinition] {
        &self.definitions
    }

    pub fn definition(&self, name: &str) -> Option<&ParameterDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// CLI flag name for a parameter of this layer
    pub fn flag_name(&self, definition: &ParameterDefinition) -> String {
        format!("{}{}", self.prefix, definition.name)
    }
}

/// Builder for [`ParameterLayer`]; `build` enforces the definition invariants.
#[derive(Debug, Clone)]
pub struct LayerBuilder {
    slug: String,
    name: String,
    description: String,
    prefix: String,
    definitions: Vec<ParameterDefinition>,
}

impl LayerBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn parameter(mut self, definition: ParameterDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn parameters(mut self, definitions: impl IntoIterator<Item = ParameterDefinition>) -> Self {
        self.definitions.extend(definitions);
        self
    }

    /// Validate every definition and freeze the layer.
    ///
    /// Defaults are normalized through the type's parser so that, for
    /// example, `default_value("10")` on an integer parameter stores
    /// `Integer(10)`.
    pub fn build(self, registry: &TypeRegistry) -> Result<ParameterLayer> {
        validate_name(&self.slug, "layer slug")?;

        let mut seen = HashSet::new();
        let mut definitions = Vec::with_capacity(self.definitions.len());

        for mut def in self.definitions {
            validate_name(&def.name, "parameter name")?;

            if !seen.insert(def.name.clone()) {
                return Err(Error::DuplicateParameter {
                    layer: self.slug.clone(),
                    parameter: def.name,
                });
            }

            let handler = registry
                .handler(def.ty)
                .ok_or_else(|| Error::UnregisteredType {
                    layer: self.slug.clone(),
                    parameter: def.name.clone(),
                    kind: def.ty.to_string(),
                })?;

            if def.ty.is_choice() && def.constraints.choices.is_empty() {
                return Err(Error::MissingChoices {
                    layer: self.slug.clone(),
                    parameter: def.name,
                });
            }

            if def.required && def.default.is_some() {
                return Err(Error::RequiredWithDefault {
                    layer: self.slug.clone(),
                    parameter: def.name,
                });
            }

            if let Some(default) = def.default.take() {
                let invalid = |reason: String| Error::InvalidDefault {
                    layer: self.slug.clone(),
                    parameter: def.name.clone(),
                    reason,
                };
                let parsed = handler
                    .parse(&def, &RawValue::Typed(default))
                    .map_err(|e| invalid(e.to_string()))?;
                handler
                    .validate(&def, &parsed)
                    .map_err(|e| invalid(e.to_string()))?;
                def.default = Some(parsed);
            }

            definitions.push(def);
        }

        Ok(ParameterLayer {
            slug: self.slug,
            name: self.name,
            description: self.description,
            prefix: self.prefix,
            definitions,
        })
    }
}

fn validate_name(name: &str, what: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidName(format!(
            "{} '{}' must be non-empty and use only [A-Za-z0-9_-]",
            what, name
        )))
    }
}

/// Ordered set of layers a command declares, unique by slug.
#[derive(Debug, Clone, Default)]
pub struct LayerSet {
    layers: Vec<Arc<ParameterLayer>>,
}

impl LayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, layer: impl Into<Arc<ParameterLayer>>) -> Result<()> {
        let layer = layer.into();
        if self.get(layer.slug()).is_some() {
            return Err(Error::DuplicateLayer(layer.slug().to_string()));
        }
        self.layers.push(layer);
        Ok(())
    }

    pub fn with(mut self, layer: impl Into<Arc<ParameterLayer>>) -> Result<Self> {
        self.push(layer)?;
        Ok(self)
    }

    pub fn get(&self, slug: &str) -> Option<&Arc<ParameterLayer>> {
        self.layers.iter().find(|l| l.slug() == slug)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ParameterLayer>> {
        self.layers.iter()
    }

    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.slug())
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl<'a> IntoIterator for &'a LayerSet {
    type Item = &'a Arc<ParameterLayer>;
    type IntoIter = std::slice::Iter<'a, Arc<ParameterLayer>>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}
