use std::fmt;

/// Result type for lamina-params operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building parameter definitions and layers
#[derive(Debug)]
pub enum Error {
    /// Two definitions in one layer share a name
    DuplicateParameter { layer: String, parameter: String },

    /// Two layers in one set share a slug
    DuplicateLayer(String),

    /// A required parameter also declares a default
    RequiredWithDefault { layer: String, parameter: String },

    /// The declared default does not parse or validate under the parameter's type
    InvalidDefault {
        layer: String,
        parameter: String,
        reason: String,
    },

    /// A choice parameter declares no choices
    MissingChoices { layer: String, parameter: String },

    /// No handler is registered for the parameter's type
    UnregisteredType { layer: String, parameter: String, kind: String },

    /// Layer slug or parameter name is empty or malformed
    InvalidName(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DuplicateParameter { layer, parameter } => {
                write!(f, "Duplicate parameter '{}' in layer '{}'", parameter, layer)
            }
            Error::DuplicateLayer(slug) => write!(f, "Duplicate layer '{}'", slug),
            Error::RequiredWithDefault { layer, parameter } => write!(
                f,
                "Parameter '{}' in layer '{}' is required and cannot declare a default",
                parameter, layer
            ),
            Error::InvalidDefault {
                layer,
                parameter,
                reason,
            } => write!(
                f,
                "Invalid default for parameter '{}' in layer '{}': {}",
                parameter, layer, reason
            ),
            Error::MissingChoices { layer, parameter } => write!(
                f,
                "Choice parameter '{}' in layer '{}' declares no choices",
                parameter, layer
            ),
            Error::UnregisteredType {
                layer,
                parameter,
                kind,
            } => write!(
                f,
                "No handler registered for type '{}' (parameter '{}' in layer '{}')",
                kind, parameter, layer
            ),
            Error::InvalidName(msg) => write!(f, "Invalid name: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// A raw value could not be turned into a typed value.
///
/// Context (layer, parameter) is attached by the resolution engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    pub expected: String,
    pub reason: String,
}

impl ParseFailure {
    pub fn new(expected: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}: {}", self.expected, self.reason)
    }
}

impl std::error::Error for ParseFailure {}

/// A typed value was rejected by type-level or definition-level checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    pub reason: String,
}

impl ValidationFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for ValidationFailure {}
