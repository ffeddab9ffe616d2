use std::fmt;
use std::path::PathBuf;

/// Result type for lamina-middleware operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while gathering and resolving parameter values
#[derive(Debug)]
pub enum Error {
    /// A required parameter received no value from any source
    MissingRequiredParameter { layer: String, parameter: String },

    /// A raw value could not be parsed by the parameter's type
    ParameterParseError {
        layer: String,
        parameter: String,
        raw: String,
        expected: String,
        reason: String,
    },

    /// A parsed value was rejected by validation
    ParameterValidationError {
        layer: String,
        parameter: String,
        reason: String,
    },

    /// A config file marked as required does not exist
    MissingConfigFile(PathBuf),

    /// A config file exists but cannot be decoded
    ConfigFile { path: PathBuf, reason: String },

    /// IO operation failed
    Io(std::io::Error),

    /// A parsed value did not convert into the bound field type
    Projection {
        layer: String,
        parameter: String,
        reason: String,
    },

    /// Lookup of a layer the command did not declare
    UnknownLayer(String),
}

impl Error {
    /// Layer slug the error refers to, when there is one
    pub fn layer(&self) -> Option<&str> {
        match self {
            Error::MissingRequiredParameter { layer, .. }
            | Error::ParameterParseError { layer, .. }
            | Error::ParameterValidationError { layer, .. }
            | Error::Projection { layer, .. } => Some(layer),
            Error::UnknownLayer(slug) => Some(slug),
            Error::MissingConfigFile(_) | Error::ConfigFile { .. } | Error::Io(_) => None,
        }
    }

    /// Parameter name the error refers to, when there is one
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Error::MissingRequiredParameter { parameter, .. }
            | Error::ParameterParseError { parameter, .. }
            | Error::ParameterValidationError { parameter, .. }
            | Error::Projection { parameter, .. } => Some(parameter),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingRequiredParameter { layer, parameter } => write!(
                f,
                "Missing required parameter '{}' (layer '{}')",
                parameter, layer
            ),
            Error::ParameterParseError {
                layer,
                parameter,
                raw,
                expected,
                reason,
            } => write!(
                f,
                "Invalid value '{}' for parameter '{}' (layer '{}'): expected {}: {}",
                raw, parameter, layer, expected, reason
            ),
            Error::ParameterValidationError {
                layer,
                parameter,
                reason,
            } => write!(
                f,
                "Validation failed for parameter '{}' (layer '{}'): {}",
                parameter, layer, reason
            ),
            Error::MissingConfigFile(path) => {
                write!(f, "Config file not found: {}", path.display())
            }
            Error::ConfigFile { path, reason } => {
                write!(f, "Config file error in {}: {}", path.display(), reason)
            }
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Projection {
                layer,
                parameter,
                reason,
            } => write!(
                f,
                "Cannot bind parameter '{}' (layer '{}'): {}",
                parameter, layer, reason
            ),
            Error::UnknownLayer(slug) => write!(f, "Unknown layer '{}'", slug),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = Error::ParameterParseError {
            layer: "output".to_string(),
            parameter: "limit".to_string(),
            raw: "ten".to_string(),
            expected: "an integer".to_string(),
            reason: "invalid digit found in string".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'ten'"));
        assert!(msg.contains("'limit'"));
        assert!(msg.contains("'output'"));
        assert_eq!(err.layer(), Some("output"));
        assert_eq!(err.parameter(), Some("limit"));
    }
}
