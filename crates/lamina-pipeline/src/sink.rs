use crate::error::SinkError;
use lamina_types::Row;
use std::fmt;
use std::io::Write;

/// Whether a sink writes as rows arrive or composes everything at close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    Streaming,
    Buffered,
}

impl fmt::Display for SinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkMode::Streaming => write!(f, "streaming"),
            SinkMode::Buffered => write!(f, "buffered"),
        }
    }
}

/// Formatting endpoint of a pipeline.
///
/// Responsibilities:
/// - Declare its [`SinkMode`] up front
/// - Reject a row it cannot represent with [`SinkError::Format`], leaving
///   earlier output intact
/// - Write nothing before `finish` when buffered
pub trait RowSink {
    fn name(&self) -> &'static str;

    fn mode(&self) -> SinkMode;

    fn write_row(&mut self, row: Row, out: &mut dyn Write) -> Result<(), SinkError>;

    fn finish(&mut self, out: &mut dyn Write) -> Result<(), SinkError>;
}

impl<S: RowSink + ?Sized> RowSink for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn mode(&self) -> SinkMode {
        (**self).mode()
    }

    fn write_row(&mut self, row: Row, out: &mut dyn Write) -> Result<(), SinkError> {
        (**self).write_row(row, out)
    }

    fn finish(&mut self, out: &mut dyn Write) -> Result<(), SinkError> {
        (**self).finish(out)
    }
}
