use crate::command::DirectCommand;
use anyhow::Result;
use lamina_middleware::ParsedLayers;

pub struct ShowVersion;

impl DirectCommand for ShowVersion {
    fn run(&self, _parsed: &ParsedLayers) -> Result<()> {
        println!("lamina {}", env!("CARGO_PKG_VERSION"));
        Ok(())
    }
}
