use crate::types::ParameterType;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use lamina_types::Value;
use std::fmt;
use std::path::PathBuf;

/// String value that never shows up in logs or dumps.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Contents of a file loaded by a `file`/`fileList` parameter
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileData {
    pub path: PathBuf,
    pub content: String,
    pub size: u64,
}

impl FileData {
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }
}

/// A resolved, typed parameter value.
///
/// `choice` values are stored as `String`, `choiceList` and
/// `stringListFromFile` as `StringList`, `stringFromFile` as `String`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Secret(Secret),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    StringList(Vec<String>),
    IntegerList(Vec<i64>),
    FloatList(Vec<f64>),
    File(FileData),
    FileList(Vec<FileData>),
    KeyValue(IndexMap<String, String>),
}

impl ParamValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ParamValue::String(_) => "string",
            ParamValue::Secret(_) => "secret",
            ParamValue::Integer(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Bool(_) => "bool",
            ParamValue::Date(_) => "date",
            ParamValue::StringList(_) => "stringList",
            ParamValue::IntegerList(_) => "intList",
            ParamValue::FloatList(_) => "floatList",
            ParamValue::File(_) => "file",
            ParamValue::FileList(_) => "fileList",
            ParamValue::KeyValue(_) => "keyValue",
        }
    }

    /// Whether this value is the storage shape of the given parameter type
    pub fn fits(&self, ty: ParameterType) -> bool {
        use ParameterType as T;
        matches!(
            (self, ty),
            (
                ParamValue::String(_),
                T::String | T::Choice | T::StringFromFile
            ) | (ParamValue::Secret(_), T::Secret)
                | (ParamValue::Integer(_), T::Integer)
                | (ParamValue::Float(_), T::Float)
                | (ParamValue::Bool(_), T::Bool)
                | (ParamValue::Date(_), T::Date)
                | (
                    ParamValue::StringList(_),
                    T::StringList | T::ChoiceList | T::StringListFromFile
                )
                | (ParamValue::IntegerList(_), T::IntegerList)
                | (ParamValue::FloatList(_), T::FloatList)
                | (ParamValue::File(_), T::File)
                | (ParamValue::FileList(_), T::FileList)
                | (ParamValue::KeyValue(_), T::KeyValue)
        )
    }

    /// Row representation. Secrets are masked, files become their path.
    pub fn to_value(&self) -> Value {
        match self {
            ParamValue::String(s) => Value::from(s.as_str()),
            ParamValue::Secret(s) => Value::from(s.to_string()),
            ParamValue::Integer(i) => Value::Int(*i),
            ParamValue::Float(f) => Value::Float(*f),
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Date(d) => Value::from(d.to_rfc3339()),
            ParamValue::StringList(items) => Value::from(items.clone()),
            ParamValue::IntegerList(items) => Value::from(items.clone()),
            ParamValue::FloatList(items) => Value::from(items.clone()),
            ParamValue::File(file) => Value::from(file.path.display().to_string()),
            ParamValue::FileList(files) => Value::List(
                files
                    .iter()
                    .map(|f| Value::from(f.path.display().to_string()))
                    .collect(),
            ),
            ParamValue::KeyValue(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::String(s) => f.write_str(s),
            ParamValue::Secret(s) => write!(f, "{}", s),
            ParamValue::Integer(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Date(d) => write!(f, "{}", d.to_rfc3339()),
            ParamValue::StringList(items) => f.write_str(&items.join(",")),
            ParamValue::IntegerList(items) => f.write_str(&join_display(items)),
            ParamValue::FloatList(items) => f.write_str(&join_display(items)),
            ParamValue::File(file) => write!(f, "{}", file.path.display()),
            ParamValue::FileList(files) => {
                let paths: Vec<String> =
                    files.iter().map(|f| f.path.display().to_string()).collect();
                f.write_str(&paths.join(","))
            }
            ParamValue::KeyValue(map) => {
                let pairs: Vec<String> = map.iter().map(|(k, v)| format!("{}:{}", k, v)).collect();
                f.write_str(&pairs.join(","))
            }
        }
    }
}

fn join_display<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Integer(i)
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        ParamValue::Float(f)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(items: Vec<String>) -> Self {
        ParamValue::StringList(items)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(items: Vec<&str>) -> Self {
        ParamValue::StringList(items.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<i64>> for ParamValue {
    fn from(items: Vec<i64>) -> Self {
        ParamValue::IntegerList(items)
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(d: DateTime<Utc>) -> Self {
        ParamValue::Date(d)
    }
}

/// Unparsed value as contributed by a source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Single textual occurrence (env var, one CLI flag)
    Text(String),
    /// Repeated textual occurrences from one source pass
    Texts(Vec<String>),
    /// Structured value from a config file
    Structured(serde_json::Value),
    /// Already-typed value (defaults, programmatic overrides)
    Typed(ParamValue),
}

impl RawValue {
    /// Rendering for error messages. Secret parameters pass `masked = true`.
    pub fn describe(&self, masked: bool) -> String {
        if masked {
            return "***".to_string();
        }
        match self {
            RawValue::Text(s) => s.clone(),
            RawValue::Texts(items) => items.join(" "),
            RawValue::Structured(v) => v.to_string(),
            RawValue::Typed(v) => v.to_string(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<ParamValue> for RawValue {
    fn from(v: ParamValue) -> Self {
        RawValue::Typed(v)
    }
}

/// A typed value was read as the wrong Rust type during projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTypeError {
    pub expected: &'static str,
    pub found: &'static str,
}

impl fmt::Display for ValueTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, found {}", self.expected, self.found)
    }
}

impl std::error::Error for ValueTypeError {}

fn mismatch(expected: &'static str, value: &ParamValue) -> ValueTypeError {
    ValueTypeError {
        expected,
        found: value.kind_name(),
    }
}

impl TryFrom<&ParamValue> for String {
    type Error = ValueTypeError;

    fn try_from(value: &ParamValue) -> Result<Self, Self::Error> {
        match value {
            ParamValue::String(s) => Ok(s.clone()),
            ParamValue::Secret(s) => Ok(s.expose().to_string()),
            other => Err(mismatch("string", other)),
        }
    }
}

impl TryFrom<&ParamValue> for Secret {
    type Error = ValueTypeError;

    fn try_from(value: &ParamValue) -> Result<Self, Self::Error> {
        match value {
            ParamValue::Secret(s) => Ok(s.clone()),
            ParamValue::String(s) => Ok(Secret::new(s.clone())),
            other => Err(mismatch("secret", other)),
        }
    }
}

impl TryFrom<&ParamValue> for i64 {
    type Error = ValueTypeError;

    fn try_from(value: &ParamValue) -> Result<Self, Self::Error> {
        match value {
            ParamValue::Integer(i) => Ok(*i),
            other => Err(mismatch("int", other)),
        }
    }
}

impl TryFrom<&ParamValue> for usize {
    type Error = ValueTypeError;

    fn try_from(value: &ParamValue) -> Result<Self, Self::Error> {
        match value {
            ParamValue::Integer(i) => usize::try_from(*i).map_err(|_| ValueTypeError {
                expected: "non-negative int",
                found: "negative int",
            }),
            other => Err(mismatch("int", other)),
        }
    }
}

impl TryFrom<&ParamValue> for f64 {
    type Error = ValueTypeError;

    fn try_from(value: &ParamValue) -> Result<Self, Self::Error> {
        match value {
            ParamValue::Float(f) => Ok(*f),
            ParamValue::Integer(i) => Ok(*i as f64),
            other => Err(mismatch("float", other)),
        }
    }
}

impl TryFrom<&ParamValue> for bool {
    type Error = ValueTypeError;

    fn try_from(value: &ParamValue) -> Result<Self, Self::Error> {
        match value {
            ParamValue::Bool(b) => Ok(*b),
            other => Err(mismatch("bool", other)),
        }
    }
}

impl TryFrom<&ParamValue> for DateTime<Utc> {
    type Error = ValueTypeError;

    fn try_from(value: &ParamValue) -> Result<Self, Self::Error> {
        match value {
            ParamValue::Date(d) => Ok(*d),
            other => Err(mismatch("date", other)),
        }
    }
}

impl TryFrom<&ParamValue> for Vec<String> {
    type Error = ValueTypeError;

    fn try_from(value: &ParamValue) -> Result<Self, Self::Error> {
        match value {
            ParamValue::StringList(items) => Ok(items.clone()),
            other => Err(mismatch("stringList", other)),
        }
    }
}

impl TryFrom<&ParamValue> for Vec<i64> {
    type Error = ValueTypeError;

    fn try_from(value: &ParamValue) -> Result<Self, Self::Error> {
        match value {
            ParamValue::IntegerList(items) => Ok(items.clone()),
            other => Err(mismatch("intList", other)),
        }
    }
}

impl TryFrom<&ParamValue> for Vec<f64> {
    type Error = ValueTypeError;

    fn try_from(value: &ParamValue) -> Result<Self, Self::Error> {
        match value {
            ParamValue::FloatList(items) => Ok(items.clone()),
            ParamValue::IntegerList(items) => Ok(items.iter().map(|i| *i as f64).collect()),
            other => Err(mismatch("floatList", other)),
        }
    }
}

impl TryFrom<&ParamValue> for FileData {
    type Error = ValueTypeError;

    fn try_from(value: &ParamValue) -> Result<Self, Self::Error> {
        match value {
            ParamValue::File(file) => Ok(file.clone()),
            other => Err(mismatch("file", other)),
        }
    }
}

impl TryFrom<&ParamValue> for Vec<FileData> {
    type Error = ValueTypeError;

    fn try_from(value: &ParamValue) -> Result<Self, Self::Error> {
        match value {
            ParamValue::FileList(files) => Ok(files.clone()),
            other => Err(mismatch("fileList", other)),
        }
    }
}

impl TryFrom<&ParamValue> for PathBuf {
    type Error = ValueTypeError;

    fn try_from(value: &ParamValue) -> Result<Self, Self::Error> {
        match value {
            ParamValue::String(s) => Ok(PathBuf::from(s)),
            ParamValue::File(file) => Ok(file.path.clone()),
            other => Err(mismatch("path", other)),
        }
    }
}

impl TryFrom<&ParamValue> for IndexMap<String, String> {
    type Error = ValueTypeError;

    fn try_from(value: &ParamValue) -> Result<Self, Self::Error> {
        match value {
            ParamValue::KeyValue(map) => Ok(map.clone()),
            other => Err(mismatch("keyValue", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_masked() {
        let value = ParamValue::Secret(Secret::new("hunter2"));
        assert_eq!(value.to_string(), "***");
        assert_eq!(format!("{:?}", value), "Secret(Secret(***))");
        assert_eq!(value.to_value(), Value::from("***"));
    }

    #[test]
    fn test_fits_storage_shapes() {
        assert!(ParamValue::from("table").fits(ParameterType::Choice));
        assert!(ParamValue::from(vec!["a"]).fits(ParameterType::ChoiceList));
        assert!(!ParamValue::from(1i64).fits(ParameterType::Float));
    }

    #[test]
    fn test_try_from_conversions() {
        let value = ParamValue::Integer(5);
        assert_eq!(i64::try_from(&value), Ok(5));
        assert_eq!(usize::try_from(&value), Ok(5));
        assert_eq!(f64::try_from(&value), Ok(5.0));
        assert!(bool::try_from(&value).is_err());
        assert!(usize::try_from(&ParamValue::Integer(-1)).is_err());
    }
}
