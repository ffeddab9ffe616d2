use crate::value::Value;
use indexmap::IndexMap;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashSet;

/// One structured record: an ordered list of named fields.
///
/// Field order is significant and preserved by every stage and sink. `push`
/// does not check for duplicates; the pipeline rejects rows with duplicate
/// names when they are added (see [`Row::duplicate_field`]).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Append a field, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a field without checking for an existing one.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Replace the value of an existing field, or append it.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Field lookup that also follows dotted paths into nested values
    /// (`owner.name`) when no field carries the full name.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.get(path) {
            return Some(value);
        }
        let (head, rest) = path.split_once('.')?;
        self.get(head)?.lookup(rest)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(idx).1)
    }

    /// Rename a field in place, keeping its position. Returns false when the
    /// field does not exist.
    pub fn rename(&mut self, from: &str, to: impl Into<String>) -> bool {
        match self.fields.iter_mut().find(|(n, _)| n == from) {
            Some((name, _)) => {
                *name = to.into();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// First field name that appears more than once, if any.
    pub fn duplicate_field(&self) -> Option<&str> {
        let mut seen = HashSet::with_capacity(self.fields.len());
        self.fields
            .iter()
            .map(|(n, _)| n.as_str())
            .find(|name| !seen.insert(*name))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl From<IndexMap<String, Value>> for Row {
    fn from(map: IndexMap<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IndexMap::<String, Value>::deserialize(deserializer).map(Row::from)
    }
}

/// Build a [`Row`] from `name => value` pairs.
///
/// ```
/// use lamina_types::row;
/// let r = row! { "id" => 1, "name" => "a" };
/// assert_eq!(r.len(), 2);
/// ```
#[macro_export]
macro_rules! row {
    () => { $crate::Row::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut row = $crate::Row::new();
        $( row.push($name, $value); )+
        row
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut row = row! { "a" => 1, "b" => 2 };
        row.set("a", 10);
        row.set("c", 3);
        let names: Vec<_> = row.field_names().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(row.get("a"), Some(&Value::Int(10)));
    }

    #[test]
    fn test_duplicate_field_detection() {
        let mut row = row! { "id" => 1 };
        assert_eq!(row.duplicate_field(), None);
        row.push("id", 2);
        assert_eq!(row.duplicate_field(), Some("id"));
    }

    #[test]
    fn test_rename_keeps_position() {
        let mut row = row! { "a" => 1, "b" => 2 };
        assert!(row.rename("a", "z"));
        assert!(!row.rename("missing", "y"));
        let names: Vec<_> = row.field_names().collect();
        assert_eq!(names, vec!["z", "b"]);
    }

    #[test]
    fn test_lookup_dotted_path() {
        let owner: IndexMap<String, Value> =
            [("name".to_string(), Value::from("ops"))].into_iter().collect();
        let row = row! { "owner" => owner, "a.b" => 1 };
        assert_eq!(row.lookup("owner.name"), Some(&Value::from("ops")));
        assert_eq!(row.lookup("a.b"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_serialize_preserves_order() {
        let row = row! { "z" => 1, "a" => 2 };
        let json = serde_json::to_string(&row).expect("serialize");
        assert_eq!(json, r#"{"z":1,"a":2}"#);
    }
}
