use lamina_types::Row;

/// One transformation step between the producer and the sink.
///
/// Responsibilities:
/// - Accept rows one at a time and append zero or more rows to `out`
/// - Release anything it buffered when the pipeline closes
/// - Report when it will never pass another row downstream
pub trait RowStage {
    fn name(&self) -> &'static str;

    /// False for stages that must see the whole stream before emitting
    fn streaming(&self) -> bool {
        true
    }

    fn push(&mut self, row: Row, out: &mut Vec<Row>);

    /// Emit buffered rows; called once, in stage order, at close
    fn finish(&mut self, _out: &mut Vec<Row>) {}

    /// True once no further input can produce output
    fn exhausted(&self) -> bool {
        false
    }
}

impl<S: RowStage + ?Sized> RowStage for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn streaming(&self) -> bool {
        (**self).streaming()
    }

    fn push(&mut self, row: Row, out: &mut Vec<Row>) {
        (**self).push(row, out)
    }

    fn finish(&mut self, out: &mut Vec<Row>) {
        (**self).finish(out)
    }

    fn exhausted(&self) -> bool {
        (**self).exhausted()
    }
}
