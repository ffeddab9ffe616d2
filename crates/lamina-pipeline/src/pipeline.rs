use crate::cancel::CancellationToken;
use crate::error::{Error, Result, SinkError};
use crate::sink::{RowSink, SinkMode};
use crate::stage::RowStage;
use lamina_types::Row;
use std::fmt;
use std::io::Write;

/// Signal returned to the producer after each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// No further row can reach the output; the producer may stop early
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Open,
    Receiving,
    Closed,
    Failed,
    Cancelled,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Open => "open",
            PipelineState::Receiving => "receiving",
            PipelineState::Closed => "closed",
            PipelineState::Failed => "failed",
            PipelineState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Counts reported by a successful [`Pipeline::close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineSummary {
    /// Rows handed to `add_row`
    pub rows_received: usize,
    /// Rows that reached the sink
    pub rows_emitted: usize,
    /// Rows rejected as malformed
    pub rows_rejected: usize,
}

/// Stages plus a sink, writing into `W`.
///
/// One pipeline serves one command invocation and is driven from a single
/// thread; only the [`CancellationToken`] is shared.
pub struct Pipeline<W: Write> {
    stages: Vec<Box<dyn RowStage>>,
    sink: Box<dyn RowSink>,
    writer: W,
    token: CancellationToken,
    state: PipelineState,
    accepted: usize,
    summary: PipelineSummary,
}

impl<W: Write> Pipeline<W> {
    pub fn new(sink: impl RowSink + 'static, writer: W) -> Self {
        Self::with_boxed_sink(Box::new(sink), writer)
    }

    pub fn with_boxed_sink(sink: Box<dyn RowSink>, writer: W) -> Self {
        Self {
            stages: Vec::new(),
            sink,
            writer,
            token: CancellationToken::new(),
            state: PipelineState::Open,
            accepted: 0,
            summary: PipelineSummary::default(),
        }
    }

    /// Append a stage; stages run in the order they are added
    pub fn with_stage(mut self, stage: impl RowStage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn push_stage(&mut self, stage: Box<dyn RowStage>) {
        self.stages.push(stage);
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Whether output appears before `close`
    pub fn sink_mode(&self) -> SinkMode {
        self.sink.mode()
    }

    /// True when neither a stage nor the sink needs the whole stream
    pub fn is_streaming(&self) -> bool {
        self.sink.mode() == SinkMode::Streaming && self.stages.iter().all(|s| s.streaming())
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn check_usable(&self) -> Result<()> {
        match self.state {
            PipelineState::Open | PipelineState::Receiving => Ok(()),
            PipelineState::Closed => Err(Error::Closed),
            PipelineState::Failed => Err(Error::Failed),
            PipelineState::Cancelled => Err(Error::Cancelled {
                rows_accepted: self.accepted,
            }),
        }
    }

    fn cancel(&mut self) -> Error {
        self.state = PipelineState::Cancelled;
        if let Err(err) = self.writer.flush() {
            tracing::warn!(error = %err, "flush after cancellation failed");
        }
        tracing::debug!(rows_accepted = self.accepted, "pipeline cancelled");
        Error::Cancelled {
            rows_accepted: self.accepted,
        }
    }

    fn fail(&mut self, err: std::io::Error) -> Error {
        self.state = PipelineState::Failed;
        Error::SinkWrite(err)
    }

    /// Feed `rows` into the stages starting at `from`, returning what falls
    /// out of the last stage
    fn run_stages(&mut self, from: usize, rows: Vec<Row>) -> Vec<Row> {
        let mut current = rows;
        for stage in self.stages.iter_mut().skip(from) {
            if current.is_empty() {
                break;
            }
            let mut next = Vec::with_capacity(current.len());
            for row in current {
                stage.push(row, &mut next);
            }
            current = next;
        }
        current
    }

    fn emit(&mut self, index: usize, row: Row) -> Result<()> {
        match self.sink.write_row(row, &mut self.writer) {
            Ok(()) => {
                self.summary.rows_emitted += 1;
                Ok(())
            }
            Err(SinkError::Format { field, reason }) => {
                self.summary.rows_rejected += 1;
                Err(Error::RowFormat {
                    row: index,
                    field,
                    reason,
                })
            }
            Err(SinkError::Write(err)) => Err(self.fail(err)),
        }
    }

    /// Push one row through the stages and, for streaming sinks, out to the
    /// writer.
    ///
    /// A malformed row is rejected with [`Error::RowFormat`] and the
    /// pipeline keeps receiving; whether to go on is the producer's call.
    /// A rejected row has already passed every stage, so it still counts
    /// toward a `Limit`. A write failure fails the pipeline.
    pub fn add_row(&mut self, row: Row) -> Result<Flow> {
        self.check_usable()?;
        if self.token.is_cancelled() {
            return Err(self.cancel());
        }
        self.state = PipelineState::Receiving;

        let index = self.summary.rows_received;
        self.summary.rows_received += 1;
        tracing::trace!(row = index, fields = row.len(), "add_row");

        if let Some(field) = row.duplicate_field() {
            self.summary.rows_rejected += 1;
            return Err(Error::RowFormat {
                row: index,
                field: Some(field.to_string()),
                reason: "duplicate field name".to_string(),
            });
        }

        for out in self.run_stages(0, vec![row]) {
            self.emit(index, out)?;
        }
        self.accepted += 1;

        if self.stages.iter().any(|s| s.exhausted()) {
            Ok(Flow::Stop)
        } else {
            Ok(Flow::Continue)
        }
    }

    /// Flush buffered stages into the sink, let the sink finish and flush
    /// the writer.
    ///
    /// The first row released by a buffered stage that the sink rejects
    /// fails the pipeline with [`Error::RowFormat`]. The sink is not
    /// finished, so a buffered sink writes nothing.
    pub fn close(&mut self) -> Result<PipelineSummary> {
        self.check_usable()?;
        if self.token.is_cancelled() {
            return Err(self.cancel());
        }

        for i in 0..self.stages.len() {
            let mut flushed = Vec::new();
            self.stages[i].finish(&mut flushed);
            if flushed.is_empty() {
                continue;
            }
            for row in self.run_stages(i + 1, flushed) {
                if self.token.is_cancelled() {
                    return Err(self.cancel());
                }
                let index = self.summary.rows_emitted + self.summary.rows_rejected;
                if let Err(err) = self.emit(index, row) {
                    self.state = PipelineState::Failed;
                    return Err(err);
                }
            }
        }

        if self.token.is_cancelled() {
            return Err(self.cancel());
        }

        match self.sink.finish(&mut self.writer) {
            Ok(()) => {}
            Err(SinkError::Write(err)) => return Err(self.fail(err)),
            Err(SinkError::Format { field, reason }) => {
                self.state = PipelineState::Failed;
                return Err(Error::RowFormat {
                    row: self.summary.rows_emitted,
                    field,
                    reason,
                });
            }
        }
        if let Err(err) = self.writer.flush() {
            return Err(self.fail(err));
        }

        self.state = PipelineState::Closed;
        tracing::debug!(
            sink = self.sink.name(),
            received = self.summary.rows_received,
            emitted = self.summary.rows_emitted,
            rejected = self.summary.rows_rejected,
            "pipeline closed"
        );
        Ok(self.summary)
    }
}

impl<W: Write> fmt::Debug for Pipeline<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .field("sink", &self.sink.name())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{ColumnPolicy, CsvSink, JsonLinesSink, JsonSink};
    use crate::stages::{Limit, Sort};
    use lamina_types::{Value, row};

    #[test]
    fn test_state_transitions() -> anyhow::Result<()> {
        let mut pipeline = Pipeline::new(JsonLinesSink, Vec::new());
        assert_eq!(pipeline.state(), PipelineState::Open);
        pipeline.add_row(row! { "a" => 1 })?;
        assert_eq!(pipeline.state(), PipelineState::Receiving);
        let summary = pipeline.close()?;
        assert_eq!(pipeline.state(), PipelineState::Closed);
        assert_eq!(summary.rows_emitted, 1);

        assert!(matches!(pipeline.add_row(row! { "a" => 2 }), Err(Error::Closed)));
        assert!(matches!(pipeline.close(), Err(Error::Closed)));
        Ok(())
    }

    #[test]
    fn test_close_without_rows() -> anyhow::Result<()> {
        let mut pipeline = Pipeline::new(JsonSink::new(), Vec::new());
        let summary = pipeline.close()?;
        assert_eq!(summary, PipelineSummary::default());
        assert_eq!(pipeline.into_writer(), b"[]\n");
        Ok(())
    }

    #[test]
    fn test_streaming_property() {
        let streaming = Pipeline::new(JsonLinesSink, Vec::new()).with_stage(Limit::new(Some(1)));
        assert!(streaming.is_streaming());
        assert_eq!(streaming.sink_mode(), SinkMode::Streaming);

        let sorted = Pipeline::new(JsonLinesSink, Vec::new()).with_stage(Sort::new(vec![]));
        assert!(!sorted.is_streaming());

        let buffered = Pipeline::new(JsonSink::new(), Vec::new());
        assert_eq!(buffered.sink_mode(), SinkMode::Buffered);
    }

    #[test]
    fn test_rejected_row_after_sort_fails_close() -> anyhow::Result<()> {
        let mut pipeline = Pipeline::new(CsvSink::csv(), Vec::new()).with_stage(Sort::parse(["n"])?);
        let nested = Value::List(vec![Value::List(vec![Value::Int(1)])]);
        pipeline.add_row(row! { "n" => 2, "a" => nested })?;
        pipeline.add_row(row! { "n" => 1, "a" => 5 })?;

        let err = pipeline.close().unwrap_err();
        assert!(matches!(
            err,
            Error::RowFormat { row: 1, field: Some(ref f), .. } if f == "a"
        ));
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert!(pipeline.into_writer().is_empty());
        Ok(())
    }

    #[test]
    fn test_rejected_row_counts_toward_limit() -> anyhow::Result<()> {
        let sink = CsvSink::csv().with_policy(ColumnPolicy::FirstRow);
        let mut pipeline = Pipeline::new(sink, Vec::new()).with_stage(Limit::new(Some(2)));
        assert_eq!(pipeline.add_row(row! { "a" => 1 })?, Flow::Continue);
        assert!(matches!(
            pipeline.add_row(row! { "b" => 2 }),
            Err(Error::RowFormat { row: 1, .. })
        ));
        assert_eq!(pipeline.add_row(row! { "a" => 3 })?, Flow::Stop);
        pipeline.close()?;
        assert_eq!(pipeline.into_writer(), b"a\n1\n");
        Ok(())
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_fatal() {
        let mut pipeline = Pipeline::new(JsonLinesSink, BrokenPipe);
        assert!(matches!(
            pipeline.add_row(row! { "a" => 1 }),
            Err(Error::SinkWrite(_))
        ));
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert!(matches!(pipeline.add_row(row! { "a" => 2 }), Err(Error::Failed)));
    }
}
