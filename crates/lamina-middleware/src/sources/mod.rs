mod cli;
mod config_file;
mod defaults;
mod env;
mod overrides;
mod when_unset;

pub use cli::{CliArguments, CliSource};
pub use config_file::ConfigFileSource;
pub use defaults::DefaultsSource;
pub use env::EnvSource;
pub use overrides::OverrideSource;
pub use when_unset::WhenUnset;
