#[cfg(feature = "cli")]
use clap::Parser;
use color_eyre::eyre::{Report, Result};
#[cfg(feature = "cli")]
use xmmvec::Cli;

fn main() -> Result<(), Report> {
    #[cfg(feature = "cli")]
    {
        // ------------------------------------------------------------------------
        // CLI Setup

        // Parse CLI parameters
        let args = Cli::parse();

        // initialize color_eyre crate for colorized logs
        color_eyre::install()?;

        // Set logging/verbosity level via RUST_LOG
        std::env::set_var("RUST_LOG", args.verbosity.to_string());

        // initialize env_logger crate for logging/verbosity level
        env_logger::init();

        let output = xmmvec::run(&args.run)?;
        log::info!("Done: {output:?}");
    }

    Ok(())
}
