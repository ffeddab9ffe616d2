// Parameter schema: the closed set of parameter types, the registry that
// owns their parse/validate rules, and the immutable layers commands declare.

pub mod definition;
pub mod error;
pub mod layer;
mod parse;
pub mod registry;
pub mod types;
pub mod value;

pub use definition::{Constraints, ParameterDefinition};
pub use error::{Error, ParseFailure, Result, ValidationFailure};
pub use layer::{LayerBuilder, LayerSet, ParameterLayer};
pub use registry::{BuiltinHandler, TypeHandler, TypeRegistry};
pub use types::ParameterType;
pub use value::{FileData, ParamValue, RawValue, Secret, ValueTypeError};
