use crate::command::{RowCommand, RowEmitter};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use lamina_middleware::{Bindings, LayerSettings, ParsedLayers};
use lamina_params::{ParameterDefinition, ParameterLayer, ParameterType, TypeRegistry};
use lamina_pipeline::Flow;
use lamina_types::Row;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

pub fn layer(registry: &TypeRegistry) -> lamina_params::Result<ParameterLayer> {
    ParameterLayer::builder("ls", "Listing")
        .parameter(
            ParameterDefinition::new("recursive", ParameterType::Bool)
                .help("Descend into subdirectories")
                .default_value(false)
                .short('r'),
        )
        .parameter(
            ParameterDefinition::new("max-depth", ParameterType::Integer)
                .help("Maximum depth when recursing")
                .min(1.0),
        )
        .parameter(
            ParameterDefinition::new("all", ParameterType::Bool)
                .help("Include entries whose name starts with '.'")
                .default_value(false)
                .short('a'),
        )
        .build(registry)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LsSettings {
    pub recursive: bool,
    pub max_depth: Option<usize>,
    pub all: bool,
}

impl LayerSettings for LsSettings {
    const LAYER: &'static str = "ls";

    fn bindings() -> Bindings<Self> {
        Bindings::new()
            .field("recursive", |s: &mut Self, v: bool| s.recursive = v)
            .field("max-depth", |s: &mut Self, v: usize| s.max_depth = Some(v))
            .field("all", |s: &mut Self, v: bool| s.all = v)
    }
}

/// One row per directory entry: name, kind, size, modified.
pub struct ListDirectory {
    root: PathBuf,
}

impl ListDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

fn kind(entry: &DirEntry) -> &'static str {
    let file_type = entry.file_type();
    if file_type.is_symlink() {
        "symlink"
    } else if file_type.is_dir() {
        "dir"
    } else {
        "file"
    }
}

fn entry_row(root: &Path, entry: &DirEntry) -> Result<Row> {
    let metadata = entry
        .metadata()
        .with_context(|| format!("Failed to read metadata for {}", entry.path().display()))?;
    let name = entry
        .path()
        .strip_prefix(root)
        .unwrap_or(entry.path())
        .display()
        .to_string();
    let modified = metadata
        .modified()
        .ok()
        .map(|t| DateTime::<Utc>::from(t).to_rfc3339());

    let mut row = Row::with_capacity(4);
    row.push("name", name);
    row.push("kind", kind(entry));
    row.push("size", metadata.len());
    row.push("modified", modified);
    Ok(row)
}

impl RowCommand for ListDirectory {
    fn run(&self, parsed: &ParsedLayers, rows: &mut RowEmitter<'_, '_>) -> Result<()> {
        let settings: LsSettings = parsed.settings()?;
        if !self.root.is_dir() {
            bail!("Not a directory: {}", self.root.display());
        }

        let depth = if settings.recursive {
            settings.max_depth.unwrap_or(usize::MAX)
        } else {
            1
        };
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| settings.all || !is_hidden(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("skipping entry: {}", err);
                    continue;
                }
            };
            let row = entry_row(&self.root, &entry)?;
            tracing::trace!(path = %entry.path().display(), "entry");
            if rows.add_row(row)? == Flow::Stop {
                tracing::debug!("row limit reached, stopping walk");
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandDef, Runner};
    use crate::output::output_layer;
    use lamina_middleware::CliArguments;
    use lamina_params::LayerSet;
    use std::fs;

    fn list(root: &Path, cli: CliArguments) -> anyhow::Result<Vec<String>> {
        let runner = Runner::new(TypeRegistry::standard()).with_env_vars(Vec::<(String, String)>::new());
        let layers = LayerSet::new()
            .with(layer(runner.registry())?)?
            .with(output_layer(runner.registry())?)?;
        let def = CommandDef::new(
            "ls",
            layers,
            Command::Rows(Box::new(ListDirectory::new(root))),
        );
        let mut out = Vec::new();
        runner.run(&def, cli.with("output", "jsonl").with("fields", "name"), &mut out)?;
        String::from_utf8(out)?
            .lines()
            .map(|line| -> anyhow::Result<String> {
                let value: serde_json::Value = serde_json::from_str(line)?;
                Ok(value["name"].as_str().unwrap_or_default().to_string())
            })
            .collect()
    }

    fn tree() -> anyhow::Result<tempfile::TempDir> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("b.txt"), "bb")?;
        fs::write(dir.path().join("a.txt"), "a")?;
        fs::write(dir.path().join(".hidden"), "")?;
        fs::create_dir(dir.path().join("sub"))?;
        fs::write(dir.path().join("sub").join("c.txt"), "ccc")?;
        Ok(dir)
    }

    #[test]
    fn test_lists_sorted_without_hidden() -> anyhow::Result<()> {
        let dir = tree()?;
        let names = list(dir.path(), CliArguments::new())?;
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
        Ok(())
    }

    #[test]
    fn test_all_includes_hidden() -> anyhow::Result<()> {
        let dir = tree()?;
        let names = list(dir.path(), CliArguments::new().with("all", "true"))?;
        assert_eq!(names, vec![".hidden", "a.txt", "b.txt", "sub"]);
        Ok(())
    }

    #[test]
    fn test_recursive_walk() -> anyhow::Result<()> {
        let dir = tree()?;
        let names = list(dir.path(), CliArguments::new().with("recursive", "true"))?;
        let nested = Path::new("sub").join("c.txt").display().to_string();
        assert_eq!(names, vec!["a.txt".to_string(), "b.txt".to_string(), "sub".to_string(), nested]);
        Ok(())
    }

    #[test]
    fn test_missing_directory_is_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        assert!(list(&dir.path().join("absent"), CliArguments::new()).is_err());
        Ok(())
    }
}
