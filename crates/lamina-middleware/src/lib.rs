// NOTE: Resolution Model
//
// Sources run lowest precedence first: defaults, config files, environment,
// CLI flags, programmatic overrides. Each source writes into a shared
// Contributions map; a later write for the same (layer, parameter) replaces
// the earlier one, which is kept only as history. The resolver then parses
// and validates the winning raw value per parameter. Resolution is
// all-or-nothing: any error aborts before business logic sees a value.

mod chain;
pub mod error;
mod projection;
mod resolve;
pub mod source;
pub mod sources;

pub use chain::MiddlewareChain;
pub use error::{Error, Result};
pub use projection::{Bindings, LayerSettings};
pub use resolve::{ParsedLayer, ParsedLayers, ParsedParameter, Resolver};
pub use source::{Contribution, Contributions, Provenance, Source, SourceKind};
pub use sources::{
    CliArguments, CliSource, ConfigFileSource, DefaultsSource, EnvSource, OverrideSource,
    WhenUnset,
};
