use crate::stage::RowStage;
use lamina_types::Row;

/// Skips `offset` rows, then passes at most `limit` rows.
#[derive(Debug, Clone, Default)]
pub struct Limit {
    offset: usize,
    limit: Option<usize>,
    skipped: usize,
    passed: usize,
}

impl Limit {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

impl RowStage for Limit {
    fn name(&self) -> &'static str {
        "limit"
    }

    fn push(&mut self, row: Row, out: &mut Vec<Row>) {
        if self.skipped < self.offset {
            self.skipped += 1;
            return;
        }
        if self.exhausted() {
            return;
        }
        self.passed += 1;
        out.push(row);
    }

    fn exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.passed >= limit)
    }
}
