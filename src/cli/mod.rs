//! Command-line interface definitions for the `metrostack` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `metrostack` binary.
#[derive(Debug, Parser)]
#[command(
    name = "metrostack",
    about = "Declare the metro stack and synthesize it to a CloudFormation template",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Synthesize the stack template.
    #[command(name = "synth", about = "Synthesize the stack template")]
    Synth(SynthCommand),
    /// List declared resources.
    #[command(name = "list", about = "List declared resources in declaration order")]
    List,
}

/// Arguments for the `metrostack synth` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct SynthCommand {
    /// Directory the template is written to.
    ///
    /// Overrides `output_dir` from configuration, which defaults to
    /// `cdk.out`. The directory is created when missing.
    #[arg(long, short, value_name = "DIR", conflicts_with = "stdout")]
    pub(crate) output: Option<String>,
    /// Print the template to standard output instead of writing a file.
    #[arg(long)]
    pub(crate) stdout: bool,
}
