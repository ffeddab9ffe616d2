// NOTE: Command Lifecycle
//
// 1. Build the clap command from the derive `Cli`, then attach the flags
//    generated from each subcommand's layers.
// 2. Parse argv once. Only flags the user actually typed become CLI
//    contributions; everything else falls through to env, config, defaults.
// 3. Resolve all layers of the chosen subcommand. Any failure stops here,
//    before the command body runs.
// 4. Dispatch on the command kind. Row commands write through the output
//    pipeline, which is closed when the command returns Ok.

mod args;
pub mod command;
pub mod config;
pub mod glue;
pub mod handlers;
pub mod output;

pub use args::{Cli, Commands, LogLevel};
pub use command::{
    Command, CommandDef, DirectCommand, RowCommand, RowEmitter, Runner, WriterCommand,
};

use anyhow::Result;
use clap::{CommandFactory, FromArgMatches};
use lamina_params::TypeRegistry;
use lamina_pipeline::CancellationToken;
use std::ffi::OsString;

/// Parse `args` (including the program name) and run the chosen command.
pub fn run<I, T>(args: I, token: CancellationToken) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let registry = TypeRegistry::standard();

    let mut app = Cli::command();
    for name in Commands::NAMES {
        let layers = handlers::layers(name, &registry)?;
        let layer_args = glue::layer_args(&layers)?;
        app = app.mut_subcommand(name, |sub| sub.args(layer_args));
    }

    let matches = app.get_matches_from(args);
    let cli = Cli::from_arg_matches(&matches)?;
    init_logging(cli.log_level);

    let def = handlers::definition(&cli.command, &registry)?;
    let cli_arguments = match matches.subcommand() {
        Some((_, sub)) => glue::collect_cli_arguments(&def.layers, sub),
        None => Default::default(),
    };

    let config = config::resolve_config_path(
        cli.config.as_deref(),
        std::env::var(config::CONFIG_ENV).ok(),
    );
    if let Some(location) = &config {
        tracing::debug!(path = %location.path.display(), required = location.required, "config file");
    }

    let runner = Runner::new(registry)
        .with_config(config)
        .with_terminal(output::Terminal::detect())
        .with_cancellation(token);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    runner.run(&def, cli_arguments, &mut out)
}

/// Process exit code for an error returned by [`run`]
pub fn exit_code(err: &anyhow::Error) -> i32 {
    let cancelled = err
        .downcast_ref::<lamina_pipeline::Error>()
        .is_some_and(lamina_pipeline::Error::is_cancelled);
    if cancelled { 130 } else { 1 }
}

fn init_logging(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::new(level.to_string());
    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let cancelled = anyhow::Error::new(lamina_pipeline::Error::Cancelled { rows_accepted: 2 });
        assert_eq!(exit_code(&cancelled), 130);
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), 1);
        let malformed = anyhow::Error::new(lamina_pipeline::Error::RowFormat {
            row: 4,
            field: Some("id".to_string()),
            reason: "duplicate field name".to_string(),
        });
        assert_eq!(exit_code(&malformed), 1);
    }

    #[test]
    fn test_generated_flags_reach_subcommands() {
        let registry = TypeRegistry::standard();
        let mut app = Cli::command();
        for name in Commands::NAMES {
            let layers = handlers::layers(name, &registry).expect("layers");
            let layer_args = glue::layer_args(&layers).expect("args");
            app = app.mut_subcommand(name, |sub| sub.args(layer_args));
        }
        let matches = app
            .try_get_matches_from(["lamina", "ls", "-r", "/tmp", "-o", "json", "--limit", "3"])
            .expect("parsed");
        let (name, sub) = matches.subcommand().expect("subcommand");
        assert_eq!(name, "ls");

        let layers = handlers::layers("ls", &registry).expect("layers");
        let collected = glue::collect_cli_arguments(&layers, sub);
        assert_eq!(collected.get("output"), Some(&["json".to_string()][..]));
        assert_eq!(collected.get("limit"), Some(&["3".to_string()][..]));
        assert_eq!(collected.get("recursive"), Some(&["true".to_string()][..]));

        let cli = Cli::from_arg_matches(&matches).expect("derive fields");
        assert!(
            matches!(cli.command, Commands::Ls { path: Some(ref p) } if p.as_os_str() == "/tmp")
        );
    }
}
