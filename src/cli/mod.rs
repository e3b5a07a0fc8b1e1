//! [Command-line interface](Cli) (CLI) of the main binary.

use crate::RunArgs;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

// ----------------------------------------------------------------------------
// CLI Entry Point
// ----------------------------------------------------------------------------

/// The command-line interface (CLI).
/// ---
/// The CLI is intended for parsing user input from the command-line in the main function.
/// ```no_run
/// use clap::Parser;
/// let args = xmmvec::Cli::parse();
/// ```
/// Here is a manual example of setting the command-line input:
/// ```rust
/// # use clap::Parser;
/// let input = ["xmmvec", "-r", "ranks.tsv", "--omic1-values", ">=5", "<10", "-v", "debug"];
/// let args = xmmvec::Cli::parse_from(input);
/// assert_eq!(args.run.omic1_values, [">=5", "<10"]);
/// assert_eq!(args.verbosity.to_string(), "debug");
/// serde_json::to_string_pretty(&args)?;
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Debug, Deserialize, Parser, Serialize)]
#[clap(name = "xmmvec", author, version)]
#[clap(about = "Explore the conditional probabilities of co-occurrence between two omics.")]
pub struct Cli {
    /// Arguments of the run.
    #[clap(flatten)]
    pub run: RunArgs,

    /// Set the output [Verbosity] level.
    #[clap(short = 'v', long)]
    #[clap(value_enum, default_value_t = Verbosity::default())]
    #[clap(hide_possible_values = false)]
    #[clap(global = true)]
    #[clap(help = "Set the output verbosity level.")]
    pub verbosity: Verbosity,
}

// -----------------------------------------------------------------------------
// Verbosity
// -----------------------------------------------------------------------------

/// The output verbosity level.
#[derive(Clone, Debug, Default, Deserialize, Serialize, ValueEnum)]
pub enum Verbosity {
    #[default]
    Info,
    Warn,
    Debug,
    Error,
}

impl Display for Verbosity {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        // Convert to lowercase for RUST_LOG env var compatibility
        let lowercase = format!("{:?}", self).to_lowercase();
        write!(f, "{lowercase}")
    }
}
