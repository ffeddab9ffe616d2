use crate::stage::RowStage;
use lamina_types::{Row, Value};

/// Projects rows onto a fixed list of fields, in that order.
///
/// Requested fields the row lacks come out as null. Dotted names reach
/// into nested maps (`owner.name`).
#[derive(Debug, Clone)]
pub struct Select {
    fields: Vec<String>,
}

impl Select {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl RowStage for Select {
    fn name(&self) -> &'static str {
        "select"
    }

    fn push(&mut self, row: Row, out: &mut Vec<Row>) {
        let mut projected = Row::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = row.lookup(field).cloned().unwrap_or(Value::Null);
            projected.push(field.clone(), value);
        }
        out.push(projected);
    }
}

/// Removes the listed fields.
#[derive(Debug, Clone)]
pub struct Exclude {
    fields: Vec<String>,
}

impl Exclude {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl RowStage for Exclude {
    fn name(&self) -> &'static str {
        "exclude"
    }

    fn push(&mut self, mut row: Row, out: &mut Vec<Row>) {
        for field in &self.fields {
            row.remove(field);
        }
        out.push(row);
    }
}

/// Renames fields in place. A renamed field replaces any existing field
/// that already carries the new name.
#[derive(Debug, Clone)]
pub struct Rename {
    renames: Vec<(String, String)>,
}

impl Rename {
    pub fn new<I, A, B>(renames: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            renames: renames
                .into_iter()
                .map(|(from, to)| (from.into(), to.into()))
                .collect(),
        }
    }
}

impl RowStage for Rename {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn push(&mut self, mut row: Row, out: &mut Vec<Row>) {
        for (from, to) in &self.renames {
            if from == to || !row.contains(from) {
                continue;
            }
            row.remove(to);
            row.rename(from, to.clone());
        }
        out.push(row);
    }
}
