//! Testing infrastructure for lamina integration tests.
//!
//! - `TestWorld`: isolated working directory, config files and environment
//!   for running the `lamina` binary
//! - `assertions`: helpers over the JSON a row command prints

pub mod assertions;
pub mod world;

pub use world::{CliResult, TestWorld};
