use crate::error::{Error, Result};
use crate::source::{Contributions, Provenance, Source, SourceKind};
use lamina_params::{LayerSet, ParameterLayer, RawValue};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
enum Origin {
    Path(PathBuf),
    Inline { label: String, value: serde_json::Value },
}

/// Values from a configuration document shaped as
/// `{ <layer-slug>: { <parameter>: value } }`.
///
/// The format is picked from the extension: `.yaml`/`.yml` for YAML,
/// `.json` for JSON, anything else is read as TOML. A missing file
/// contributes nothing unless the source is marked required.
#[derive(Debug, Clone)]
pub struct ConfigFileSource {
    origin: Origin,
    required: bool,
}

impl ConfigFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: Origin::Path(path.into()),
            required: false,
        }
    }

    /// In-memory document, mostly for tests and embedding
    pub fn from_value(label: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            origin: Origin::Inline {
                label: label.into(),
                value,
            },
            required: false,
        }
    }

    /// Fail with [`Error::MissingConfigFile`] when the file does not exist
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            Origin::Path(path) => Some(path),
            Origin::Inline { .. } => None,
        }
    }

    fn label(&self) -> String {
        match &self.origin {
            Origin::Path(path) => format!("config:{}", path.display()),
            Origin::Inline { label, .. } => format!("config:{}", label),
        }
    }

    fn load(&self) -> Result<Option<serde_json::Value>> {
        let path = match &self.origin {
            Origin::Inline { value, .. } => return Ok(Some(value.clone())),
            Origin::Path(path) => path,
        };

        if !path.exists() {
            if self.required {
                return Err(Error::MissingConfigFile(path.clone()));
            }
            tracing::debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let invalid = |reason: String| Error::ConfigFile {
            path: path.clone(),
            reason,
        };
        let value: serde_json::Value = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            _ => toml::from_str(&content).map_err(|e| invalid(e.to_string()))?,
        };
        Ok(Some(value))
    }
}

/// Config keys may use `_` where parameter names use `-`
fn find_parameter<'a>(layer: &'a ParameterLayer, key: &str) -> Option<&'a str> {
    layer
        .definitions()
        .iter()
        .find(|d| d.name == key || d.name.replace('-', "_") == key)
        .map(|d| d.name.as_str())
}

impl Source for ConfigFileSource {
    fn name(&self) -> &str {
        "config-file"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::ConfigFile
    }

    fn contribute(&self, layers: &LayerSet, acc: &mut Contributions) -> Result<()> {
        let Some(document) = self.load()? else {
            return Ok(());
        };
        let label = self.label();

        let serde_json::Value::Object(sections) = document else {
            return Err(Error::ConfigFile {
                path: self.path().map(Path::to_path_buf).unwrap_or_default(),
                reason: "top level must be a table keyed by layer".to_string(),
            });
        };

        for (slug, section) in &sections {
            let Some(layer) = layers.get(slug) else {
                tracing::debug!(source = %label, layer = %slug, "ignoring unknown layer");
                continue;
            };
            let serde_json::Value::Object(values) = section else {
                tracing::debug!(source = %label, layer = %slug, "layer section is not a table");
                continue;
            };
            for (key, value) in values {
                match find_parameter(layer, key) {
                    Some(name) => acc.set(
                        layer.slug(),
                        name,
                        RawValue::Structured(value.clone()),
                        Provenance::new(SourceKind::ConfigFile, label.clone()),
                    ),
                    None => {
                        tracing::debug!(source = %label, layer = %slug, key = %key, "ignoring unknown parameter")
                    }
                }
            }
        }
        Ok(())
    }
}
