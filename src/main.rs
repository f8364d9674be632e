//! Binary entry point for the metrostack CLI.

use std::io::{self, Write};
use std::process;

use camino::Utf8PathBuf;
use clap::Parser;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use metrostack::{
    ConfigError, DefinitionError, StackConfig, SynthError, declare_stack, render_template,
    resource_listing, write_template,
};

mod cli;

use cli::{Cli, SynthCommand};

/// Environment variable holding the log filter directives.
const LOG_ENV_VAR: &str = "METROSTACK_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("stack definition failed: {0}")]
    Definition(#[from] DefinitionError),
    #[error("synthesis failed: {0}")]
    Synth(#[from] SynthError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli, &mut io::stdout()) {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

fn dispatch(cli: Cli, out: &mut impl Write) -> Result<(), CliError> {
    let config = StackConfig::load_without_cli_args()?;
    debug!(?config, "loaded configuration");
    execute(cli, &config, out)
}

fn execute(cli: Cli, config: &StackConfig, out: &mut impl Write) -> Result<(), CliError> {
    let declared = declare_stack(&config.as_props()?)?;
    match cli {
        Cli::Synth(command) => synth(&command, config, &declared.stack, out),
        Cli::List => {
            for line in resource_listing(&declared.stack) {
                writeln!(out, "{line}")?;
            }
            Ok(())
        }
    }
}

fn synth(
    command: &SynthCommand,
    config: &StackConfig,
    stack: &metrostack::Stack,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let template = stack.synth();
    if command.stdout {
        out.write_all(render_template(&template)?.as_bytes())?;
        return Ok(());
    }

    let dir = Utf8PathBuf::from(command.output.as_deref().unwrap_or(&config.output_dir));
    let path = write_template(&dir, stack.name(), &template)?;
    writeln!(out, "{path}")?;
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
