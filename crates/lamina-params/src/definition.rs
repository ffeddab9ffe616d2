use crate::error::ValidationFailure;
use crate::types::ParameterType;
use crate::value::{FileData, ParamValue};
use regex::Regex;
use std::path::Path;

/// Definition-level validation rules.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    /// Allowed values for `choice`/`choiceList`
    pub choices: Vec<String>,
    /// Inclusive lower bound for numeric kinds (applied element-wise to lists)
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric kinds
    pub max: Option<f64>,
    /// Allowed file extensions, without the dot
    pub file_extensions: Vec<String>,
    /// String values are paths that must exist
    pub must_exist: bool,
    /// Regex string values must match
    pub pattern: Option<Regex>,
}

impl Constraints {
    /// Check a typed value against every declared constraint.
    pub fn check(&self, value: &ParamValue) -> Result<(), ValidationFailure> {
        match value {
            ParamValue::Integer(i) => self.check_number(*i as f64),
            ParamValue::Float(f) => self.check_number(*f),
            ParamValue::IntegerList(items) => items
                .iter()
                .try_for_each(|i| self.check_number(*i as f64)),
            ParamValue::FloatList(items) => items.iter().try_for_each(|f| self.check_number(*f)),
            ParamValue::String(s) => self.check_string(s),
            ParamValue::Secret(s) => self.check_pattern(s.expose()),
            ParamValue::StringList(items) => items.iter().try_for_each(|s| self.check_string(s)),
            ParamValue::File(file) => self.check_file(file),
            ParamValue::FileList(files) => files.iter().try_for_each(|f| self.check_file(f)),
            ParamValue::Bool(_) | ParamValue::Date(_) | ParamValue::KeyValue(_) => Ok(()),
        }
    }

    fn check_number(&self, n: f64) -> Result<(), ValidationFailure> {
        if let Some(min) = self.min
            && n < min
        {
            return Err(ValidationFailure::new(format!(
                "{} is below the minimum {}",
                n, min
            )));
        }
        if let Some(max) = self.max
            && n > max
        {
            return Err(ValidationFailure::new(format!(
                "{} is above the maximum {}",
                n, max
            )));
        }
        Ok(())
    }

    fn check_string(&self, s: &str) -> Result<(), ValidationFailure> {
        if !self.choices.is_empty() && !self.choices.iter().any(|c| c == s) {
            return Err(ValidationFailure::new(format!(
                "'{}' is not one of [{}]",
                s,
                self.choices.join(", ")
            )));
        }
        self.check_pattern(s)?;
        if self.must_exist || !self.file_extensions.is_empty() {
            self.check_path(Path::new(s))?;
        }
        Ok(())
    }

    fn check_pattern(&self, s: &str) -> Result<(), ValidationFailure> {
        match &self.pattern {
            Some(re) if !re.is_match(s) => Err(ValidationFailure::new(format!(
                "value does not match pattern {}",
                re.as_str()
            ))),
            _ => Ok(()),
        }
    }

    fn check_file(&self, file: &FileData) -> Result<(), ValidationFailure> {
        self.check_path(&file.path)
    }

    fn check_path(&self, path: &Path) -> Result<(), ValidationFailure> {
        if self.must_exist && !path.exists() {
            return Err(ValidationFailure::new(format!(
                "path does not exist: {}",
                path.display()
            )));
        }
        if !self.file_extensions.is_empty() {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !self
                .file_extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            {
                return Err(ValidationFailure::new(format!(
                    "{} does not have an allowed extension ({})",
                    path.display(),
                    self.file_extensions.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// A named, typed parameter declaration.
///
/// Built with chained setters, then handed to a
/// [`crate::LayerBuilder`], which checks the cross-field invariants
/// (required vs default, default type, choices) against a registry.
#[derive(Debug, Clone)]
pub struct ParameterDefinition {
    pub name: String,
    pub ty: ParameterType,
    pub help: String,
    pub default: Option<ParamValue>,
    pub required: bool,
    pub constraints: Constraints,
    /// Single-character CLI alias
    pub short_flag: Option<char>,
    /// Whether the environment source may set this parameter
    pub from_env: bool,
}

impl ParameterDefinition {
    pub fn new(name: impl Into<String>, ty: ParameterType) -> Self {
        Self {
            name: name.into(),
            ty,
            help: String::new(),
            default: None,
            required: false,
            constraints: Constraints::default(),
            short_flag: None,
            from_env: true,
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn default_value(mut self, value: impl Into<ParamValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.constraints.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.constraints.max = Some(max);
        self
    }

    pub fn file_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints.file_extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_string())
            .collect();
        self
    }

    pub fn must_exist(mut self) -> Self {
        self.constraints.must_exist = true;
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.constraints.pattern = Some(pattern);
        self
    }

    pub fn short(mut self, flag: char) -> Self {
        self.short_flag = Some(flag);
        self
    }

    pub fn no_env(mut self) -> Self {
        self.from_env = false;
        self
    }

    pub fn is_secret(&self) -> bool {
        self.ty == ParameterType::Secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_check() {
        let def = ParameterDefinition::new("limit", ParameterType::Integer)
            .min(0.0)
            .max(100.0);
        assert!(def.constraints.check(&ParamValue::Integer(50)).is_ok());
        let err = def
            .constraints
            .check(&ParamValue::Integer(-1))
            .unwrap_err();
        assert!(err.reason.contains("below the minimum"));
    }

    #[test]
    fn test_choice_check_applies_to_lists() {
        let def = ParameterDefinition::new("cols", ParameterType::ChoiceList).choices(["a", "b"]);
        assert!(def.constraints.check(&ParamValue::from(vec!["a", "b"])).is_ok());
        assert!(def.constraints.check(&ParamValue::from(vec!["a", "c"])).is_err());
    }

    #[test]
    fn test_pattern_check() {
        let def = ParameterDefinition::new("host", ParameterType::String)
            .pattern(Regex::new(r"^[a-z.]+$").expect("valid regex"));
        assert!(def.constraints.check(&ParamValue::from("db.local")).is_ok());
        assert!(def.constraints.check(&ParamValue::from("DB!")).is_err());
    }

    #[test]
    fn test_extension_check() {
        let def = ParameterDefinition::new("input", ParameterType::File).file_extensions([".csv"]);
        let file = FileData {
            path: "data.json".into(),
            ..FileData::default()
        };
        assert!(def.constraints.check(&ParamValue::File(file)).is_err());
    }
}
