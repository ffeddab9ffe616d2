use std::fmt;

/// Result type for lamina-pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or running a pipeline
#[derive(Debug)]
pub enum Error {
    /// A row could not be accepted; the pipeline keeps receiving
    RowFormat {
        row: usize,
        field: Option<String>,
        reason: String,
    },

    /// The destination rejected a write; the pipeline is failed
    SinkWrite(std::io::Error),

    /// Cancellation was observed between rows
    Cancelled { rows_accepted: usize },

    /// `add_row` or `close` after the pipeline was closed
    Closed,

    /// `add_row` or `close` after a fatal error
    Failed,

    /// Filter expression did not parse
    InvalidFilter {
        expression: String,
        position: usize,
        reason: String,
    },

    /// Sort key did not parse
    InvalidSort(String),

    /// Template did not parse
    InvalidTemplate(String),
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::RowFormat { row, field, reason } => match field {
                Some(field) => write!(f, "Row {}: field '{}': {}", row, field, reason),
                None => write!(f, "Row {}: {}", row, reason),
            },
            Error::SinkWrite(err) => write!(f, "Failed to write output: {}", err),
            Error::Cancelled { rows_accepted } => {
                write!(f, "Cancelled after {} rows", rows_accepted)
            }
            Error::Closed => write!(f, "Pipeline is already closed"),
            Error::Failed => write!(f, "Pipeline failed earlier and no longer accepts rows"),
            Error::InvalidFilter {
                expression,
                position,
                reason,
            } => write!(
                f,
                "Invalid filter '{}' at position {}: {}",
                expression, position, reason
            ),
            Error::InvalidSort(reason) => write!(f, "Invalid sort key: {}", reason),
            Error::InvalidTemplate(reason) => write!(f, "Invalid template: {}", reason),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::SinkWrite(err) => Some(err),
            _ => None,
        }
    }
}

/// Error reported by a sink for a single write
#[derive(Debug)]
pub enum SinkError {
    /// The row cannot be represented in this format
    Format {
        field: Option<String>,
        reason: String,
    },
    /// The destination failed
    Write(std::io::Error),
}

impl SinkError {
    pub fn format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SinkError::Format {
            field: Some(field.into()),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Format {
                field: Some(field),
                reason,
            } => write!(f, "field '{}': {}", field, reason),
            SinkError::Format {
                field: None,
                reason,
            } => f.write_str(reason),
            SinkError::Write(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for SinkError {}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Write(err)
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            SinkError::Write(err.into())
        } else {
            SinkError::Format {
                field: None,
                reason: err.to_string(),
            }
        }
    }
}

impl From<serde_yaml::Error> for SinkError {
    fn from(err: serde_yaml::Error) -> Self {
        SinkError::Write(std::io::Error::other(err.to_string()))
    }
}

impl From<csv::Error> for SinkError {
    fn from(err: csv::Error) -> Self {
        let reason = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(io) => SinkError::Write(io),
            _ => SinkError::Format {
                field: None,
                reason,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_format_message_names_row_and_field() {
        let err = Error::RowFormat {
            row: 3,
            field: Some("id".to_string()),
            reason: "duplicate field name".to_string(),
        };
        assert_eq!(err.to_string(), "Row 3: field 'id': duplicate field name");
    }

    #[test]
    fn test_csv_io_error_maps_to_write() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err = SinkError::from(csv::Error::from(io));
        assert!(matches!(err, SinkError::Write(_)));
    }
}
