use crate::error::{Error, Result};
use crate::stage::RowStage;
use lamina_types::{Row, Value};
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

impl FromStr for SortKey {
    type Err = Error;

    /// `field`, `-field`, `field:asc` or `field:desc`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (field, descending) = if let Some(rest) = s.strip_prefix('-') {
            (rest, true)
        } else if let Some((field, direction)) = s.rsplit_once(':') {
            match direction.to_ascii_lowercase().as_str() {
                "asc" => (field, false),
                "desc" => (field, true),
                other => {
                    return Err(Error::InvalidSort(format!(
                        "unknown direction '{}' in '{}'",
                        other, s
                    )));
                }
            }
        } else {
            (s, false)
        };
        if field.is_empty() {
            return Err(Error::InvalidSort(format!("missing field name in '{}'", s)));
        }
        Ok(SortKey {
            field: field.to_string(),
            descending,
        })
    }
}

/// Orders rows by one or more keys. Buffers the whole stream; ties keep
/// arrival order.
#[derive(Debug, Clone)]
pub struct Sort {
    keys: Vec<SortKey>,
    buffer: Vec<Row>,
}

impl Sort {
    pub fn new(keys: Vec<SortKey>) -> Self {
        Self {
            keys,
            buffer: Vec::new(),
        }
    }

    pub fn parse<I, S>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = keys
            .into_iter()
            .map(|k| k.as_ref().parse())
            .collect::<Result<Vec<SortKey>>>()?;
        Ok(Self::new(keys))
    }

    fn compare(&self, a: &Row, b: &Row) -> Ordering {
        for key in &self.keys {
            let x = a.lookup(&key.field).unwrap_or(&Value::Null);
            let y = b.lookup(&key.field).unwrap_or(&Value::Null);
            let ord = x.compare(y);
            let ord = if key.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl RowStage for Sort {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn streaming(&self) -> bool {
        false
    }

    fn push(&mut self, row: Row, _out: &mut Vec<Row>) {
        self.buffer.push(row);
    }

    fn finish(&mut self, out: &mut Vec<Row>) {
        let mut rows = std::mem::take(&mut self.buffer);
        rows.sort_by(|a, b| self.compare(a, b));
        tracing::debug!(rows = rows.len(), keys = self.keys.len(), "sorted buffered rows");
        out.extend(rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_types::row;

    fn sorted(sort: &mut Sort, rows: Vec<Row>) -> Vec<Row> {
        let mut out = Vec::new();
        for row in rows {
            sort.push(row, &mut out);
        }
        assert!(out.is_empty(), "sort must buffer until finish");
        sort.finish(&mut out);
        out
    }

    #[test]
    fn test_parse_keys() -> anyhow::Result<()> {
        assert_eq!("name".parse::<SortKey>()?, SortKey::asc("name"));
        assert_eq!("-size".parse::<SortKey>()?, SortKey::desc("size"));
        assert_eq!("size:DESC".parse::<SortKey>()?, SortKey::desc("size"));
        assert_eq!("size:asc".parse::<SortKey>()?, SortKey::asc("size"));
        assert!("size:sideways".parse::<SortKey>().is_err());
        assert!("-".parse::<SortKey>().is_err());
        Ok(())
    }

    #[test]
    fn test_ascending_by_number() -> anyhow::Result<()> {
        let out = sorted(
            &mut Sort::parse(["n"])?,
            vec![row! { "n" => 3 }, row! { "n" => 1 }, row! { "n" => 2 }],
        );
        assert_eq!(out, vec![row! { "n" => 1 }, row! { "n" => 2 }, row! { "n" => 3 }]);
        Ok(())
    }

    #[test]
    fn test_stable_for_equal_keys() -> anyhow::Result<()> {
        let out = sorted(
            &mut Sort::parse(["k"])?,
            vec![
                row! { "k" => 1, "id" => "a" },
                row! { "k" => 0, "id" => "b" },
                row! { "k" => 1, "id" => "c" },
                row! { "k" => 0, "id" => "d" },
            ],
        );
        let ids: Vec<_> = out.iter().filter_map(|r| r.get("id")?.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a", "c"]);
        Ok(())
    }

    #[test]
    fn test_multi_key_with_descending_tiebreak() -> anyhow::Result<()> {
        let out = sorted(
            &mut Sort::parse(["kind", "-size"])?,
            vec![
                row! { "kind" => "file", "size" => 1 },
                row! { "kind" => "dir", "size" => 0 },
                row! { "kind" => "file", "size" => 9 },
            ],
        );
        let sizes: Vec<_> = out.iter().filter_map(|r| r.get("size")?.as_i64()).collect();
        assert_eq!(sizes, vec![0, 9, 1]);
        Ok(())
    }

    #[test]
    fn test_nan_sorts_after_numbers() -> anyhow::Result<()> {
        let out = sorted(
            &mut Sort::parse(["n"])?,
            vec![
                row! { "n" => 3.0 },
                row! { "n" => f64::NAN },
                row! { "n" => 1.0 },
                row! { "n" => 2 },
            ],
        );
        let values: Vec<_> = out.iter().filter_map(|r| r.get("n")?.as_f64()).collect();
        assert_eq!(values[..3], [1.0, 2.0, 3.0]);
        assert!(values[3].is_nan());
        Ok(())
    }
}
