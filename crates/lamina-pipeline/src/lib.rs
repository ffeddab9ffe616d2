// NOTE: Pipeline Flow
//
// Producer -> add_row -> stages (in order) -> sink -> writer
//
// Streaming stages pass rows straight through; buffered stages (sort) hold
// rows until close(). A sink declares whether it streams or composes the
// whole output at close(); callers can read that up front via
// Pipeline::sink_mode(). Cancellation is checked between rows only.

mod cancel;
pub mod error;
pub mod expr;
mod pipeline;
pub mod sink;
pub mod sinks;
pub mod stage;
pub mod stages;

pub use cancel::CancellationToken;
pub use error::{Error, Result, SinkError};
pub use expr::Expr;
pub use pipeline::{Flow, Pipeline, PipelineState, PipelineSummary};
pub use sink::{RowSink, SinkMode};
pub use sinks::{
    ColumnPolicy, CsvSink, JsonLinesSink, JsonSink, TableSink, TableStyle, TemplateSink, YamlSink,
};
pub use stage::RowStage;
pub use stages::{Exclude, Filter, Limit, Rename, Select, Sort, SortKey};
