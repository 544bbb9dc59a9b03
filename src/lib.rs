// Library crate for hostprep - exposes modules for the binary and the tests
pub mod commands;
pub mod config;
pub mod failure;
pub mod logging;
pub mod provision;
pub mod testing;
pub mod utils;

use clap::Parser;

/// Command line. clap's own help and version handling is switched off so
/// `--help` prints the full usage text and unknown options exit with 1.
#[derive(Parser, Debug)]
#[command(name = "hostprep")]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Walk through every step without changing the system
    #[arg(long)]
    pub demo: bool,

    /// Show usage and exit
    #[arg(long)]
    pub help: bool,

    /// Show version and exit
    #[arg(long, short = 'V')]
    pub version: bool,
}
