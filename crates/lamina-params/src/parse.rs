use crate::error::ParseFailure;
use crate::types::ParameterType;
use crate::value::{FileData, ParamValue, RawValue, Secret};
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use std::path::Path;

// toml datetimes pass through serde as a single-key object
const TOML_DATETIME_KEY: &str = "$__toml_private_datetime";

pub(crate) fn parse_raw(ty: ParameterType, raw: &RawValue) -> Result<ParamValue, ParseFailure> {
    use ParameterType as T;

    if let RawValue::Typed(value) = raw {
        return coerce_typed(ty, value);
    }

    match ty {
        T::String | T::Choice => scalar_text(ty, raw).map(ParamValue::String),
        T::Secret => scalar_text(ty, raw).map(|s| ParamValue::Secret(Secret::new(s))),
        T::Integer => match raw {
            RawValue::Structured(serde_json::Value::Number(n)) => n
                .as_i64()
                .map(ParamValue::Integer)
                .ok_or_else(|| fail(ty, format!("{} is not an integer", n))),
            _ => scalar_text(ty, raw).and_then(|s| parse_integer(&s)).map(ParamValue::Integer),
        },
        T::Float => match raw {
            RawValue::Structured(serde_json::Value::Number(n)) => n
                .as_f64()
                .map(ParamValue::Float)
                .ok_or_else(|| fail(ty, format!("{} is not a number", n))),
            _ => scalar_text(ty, raw).and_then(|s| parse_float(&s)).map(ParamValue::Float),
        },
        T::Bool => match raw {
            RawValue::Structured(serde_json::Value::Bool(b)) => Ok(ParamValue::Bool(*b)),
            _ => scalar_text(ty, raw).and_then(|s| parse_bool(&s)).map(ParamValue::Bool),
        },
        T::Date => scalar_text(ty, raw).and_then(|s| parse_date(&s)).map(ParamValue::Date),
        T::StringList | T::ChoiceList => list_items(ty, raw).map(ParamValue::StringList),
        T::IntegerList => list_items(ty, raw)?
            .iter()
            .map(|s| parse_integer(s))
            .collect::<Result<Vec<_>, _>>()
            .map(ParamValue::IntegerList)
            .map_err(|e| fail(ty, e.reason)),
        T::FloatList => list_items(ty, raw)?
            .iter()
            .map(|s| parse_float(s))
            .collect::<Result<Vec<_>, _>>()
            .map(ParamValue::FloatList)
            .map_err(|e| fail(ty, e.reason)),
        T::File => {
            let path = scalar_text(ty, raw)?;
            read_file(ty, &path).map(ParamValue::File)
        }
        T::FileList => list_items(ty, raw)?
            .iter()
            .map(|p| read_file(ty, p))
            .collect::<Result<Vec<_>, _>>()
            .map(ParamValue::FileList),
        T::StringFromFile => {
            let path = scalar_text(ty, raw)?;
            read_file(ty, &path).map(|f| ParamValue::String(f.content))
        }
        T::StringListFromFile => {
            let path = scalar_text(ty, raw)?;
            let file = read_file(ty, &path)?;
            Ok(ParamValue::StringList(
                file.content
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect(),
            ))
        }
        T::KeyValue => parse_key_value(raw).map(ParamValue::KeyValue),
    }
}

/// Typed values are accepted as-is when they already fit. A typed `String`
/// offered to a non-string kind is parsed as text, and integers widen to
/// floats.
fn coerce_typed(ty: ParameterType, value: &ParamValue) -> Result<ParamValue, ParseFailure> {
    if value.fits(ty) {
        return Ok(value.clone());
    }
    match (ty, value) {
        (ParameterType::Float, ParamValue::Integer(i)) => Ok(ParamValue::Float(*i as f64)),
        (ParameterType::FloatList, ParamValue::IntegerList(items)) => Ok(ParamValue::FloatList(
            items.iter().map(|i| *i as f64).collect(),
        )),
        (ParameterType::Secret, ParamValue::String(s)) => Ok(ParamValue::Secret(Secret::new(s))),
        (_, ParamValue::String(s)) => parse_raw(ty, &RawValue::Text(s.clone())),
        (_, ParamValue::StringList(items)) if ty.is_multi_value() => {
            parse_raw(ty, &RawValue::Texts(items.clone()))
        }
        (_, other) => Err(fail(ty, format!("got a {} value", other.kind_name()))),
    }
}

fn fail(ty: ParameterType, reason: impl Into<String>) -> ParseFailure {
    ParseFailure::new(ty.expected(), reason)
}

/// Single textual value. Repeated occurrences of a scalar keep the last one.
fn scalar_text(ty: ParameterType, raw: &RawValue) -> Result<String, ParseFailure> {
    match raw {
        RawValue::Text(s) => Ok(s.clone()),
        RawValue::Texts(items) => items
            .last()
            .cloned()
            .ok_or_else(|| fail(ty, "no value given")),
        RawValue::Structured(value) => match value {
            serde_json::Value::String(s) => Ok(s.clone()),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            serde_json::Value::Bool(b) => Ok(b.to_string()),
            serde_json::Value::Object(map) if map.len() == 1 => map
                .get(TOML_DATETIME_KEY)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| fail(ty, "got a table")),
            serde_json::Value::Null => Err(fail(ty, "got null")),
            serde_json::Value::Array(_) => Err(fail(ty, "got a list")),
            serde_json::Value::Object(_) => Err(fail(ty, "got a table")),
        },
        RawValue::Typed(value) => Ok(value.to_string()),
    }
}

/// List elements: every occurrence is split on commas and trimmed.
fn list_items(ty: ParameterType, raw: &RawValue) -> Result<Vec<String>, ParseFailure> {
    match raw {
        RawValue::Text(s) => Ok(split_list(s)),
        RawValue::Texts(items) => Ok(items.iter().flat_map(|s| split_list(s)).collect()),
        RawValue::Structured(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| scalar_text(ty, &RawValue::Structured(item.clone())))
            .collect(),
        RawValue::Structured(serde_json::Value::String(s)) => Ok(split_list(s)),
        RawValue::Structured(other) => Err(fail(ty, format!("got {}", other))),
        RawValue::Typed(value) => Ok(split_list(&value.to_string())),
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn parse_integer(s: &str) -> Result<i64, ParseFailure> {
    s.trim()
        .parse::<i64>()
        .map_err(|e| fail(ParameterType::Integer, format!("'{}': {}", s, e)))
}

pub(crate) fn parse_float(s: &str) -> Result<f64, ParseFailure> {
    let value = s
        .trim()
        .parse::<f64>()
        .map_err(|e| fail(ParameterType::Float, format!("'{}': {}", s, e)))?;
    if !value.is_finite() {
        return Err(fail(ParameterType::Float, format!("'{}' is not finite", s)));
    }
    Ok(value)
}

pub(crate) fn parse_bool(s: &str) -> Result<bool, ParseFailure> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(fail(ParameterType::Bool, format!("'{}'", s))),
    }
}

pub(crate) fn parse_date(s: &str) -> Result<DateTime<Utc>, ParseFailure> {
    let trimmed = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| fail(ParameterType::Date, format!("'{}'", s)))
}

fn read_file(ty: ParameterType, path: &str) -> Result<FileData, ParseFailure> {
    let path = Path::new(path.trim());
    let content = std::fs::read_to_string(path)
        .map_err(|e| fail(ty, format!("{}: {}", path.display(), e)))?;
    Ok(FileData {
        path: path.to_path_buf(),
        size: content.len() as u64,
        content,
    })
}

fn parse_key_value(raw: &RawValue) -> Result<IndexMap<String, String>, ParseFailure> {
    let ty = ParameterType::KeyValue;
    let mut map = IndexMap::new();
    match raw {
        RawValue::Structured(serde_json::Value::Object(obj)) => {
            for (key, value) in obj {
                map.insert(key.clone(), stringify(value));
            }
        }
        other => {
            for entry in list_items(ty, other)? {
                if let Some(path) = entry.strip_prefix('@') {
                    map.extend(load_key_value_file(path)?);
                    continue;
                }
                let (key, value) = split_entry(&entry)
                    .ok_or_else(|| fail(ty, format!("'{}' has no ':' or '='", entry)))?;
                map.insert(key, value);
            }
        }
    }
    Ok(map)
}

fn split_entry(entry: &str) -> Option<(String, String)> {
    let idx = entry.find([':', '='])?;
    let key = entry[..idx].trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), entry[idx + 1..].trim().to_string()))
}

fn load_key_value_file(path: &str) -> Result<IndexMap<String, String>, ParseFailure> {
    let ty = ParameterType::KeyValue;
    let file = read_file(ty, path)?;
    let value: serde_json::Value = match file.extension() {
        Some("toml") => toml::from_str(&file.content).map_err(|e| fail(ty, e.to_string()))?,
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&file.content).map_err(|e| fail(ty, e.to_string()))?
        }
        _ => serde_json::from_str(&file.content).map_err(|e| fail(ty, e.to_string()))?,
    };
    match value {
        serde_json::Value::Object(obj) => Ok(obj.iter().map(|(k, v)| (k.clone(), stringify(v))).collect()),
        other => Err(fail(ty, format!("{} does not contain a mapping: {}", path, other))),
    }
}

fn stringify(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
