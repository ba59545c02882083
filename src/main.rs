//! # codesign
//!
//! Command-line front end for the codesign library.
//!
//! ```bash
//! codesign generate-keys
//! codesign sign -d src -e .py .toml
//! codesign verify -d src -p keys/public_key.pem
//! ```
//!
//! Results go to stdout; logs go to stderr (and optionally to rotating
//! files, see [`codesign::logging`]). The process exits non-zero when any
//! file fails to sign or verify.

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // Results are printed by the CLI

mod cli;

use anyhow::Result;
use clap::Parser as _;
use codesign::logging::{self, LogOptions};
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let cli = cli::Cli::parse();

    logging::init(&LogOptions {
        verbosity: cli.verbose,
        log_to_file: cli.log_file,
    })?;

    cli::run_command(cli)
}
