// NOTE: Flag Sources
//
// Fixed flags (--config, --log-level, positional paths) are declared with
// clap derive below. Flags that belong to parameter layers are generated
// from the layer definitions at startup (see glue.rs) and attached to the
// matching subcommand, so the same parameter can also come from the config
// file or the environment.

mod enums;

pub use enums::*;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lamina")]
#[command(about = "Layered parameters and structured output for command-line tools", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (TOML, YAML or JSON); overrides LAMINA_CONFIG
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value = "warn", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List directory entries as rows
    Ls {
        /// Directory to list (defaults to the current directory)
        path: Option<PathBuf>,
    },

    /// Show resolved parameters and where each value came from
    Params,

    /// Print version information
    Version,
}

impl Commands {
    pub const NAMES: [&'static str; 3] = ["ls", "params", "version"];

    pub fn name(&self) -> &'static str {
        match self {
            Commands::Ls { .. } => "ls",
            Commands::Params => "params",
            Commands::Version => "version",
        }
    }
}
