// Command routing for the hostprep binary
//
// The CLI surface is deliberately tiny: `--demo`, `--help`, `--version`.
// Anything else is rejected before a log file is created.

pub mod provision;
pub mod utils;

use crate::Cli;
use clap::Parser;
use clap::error::{ContextKind, ErrorKind};
use std::ffi::OsString;
use std::io::{self, Write};

/// Parse `args` (program name first) and run. Returns the process exit code.
pub fn handle_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    dispatch(args, &mut io::stdout(), provision::handle_provision)
}

/// Route a parsed command line. Help and version are written to `out`;
/// only a provisioning request reaches `provision`, which owns the log file.
pub fn dispatch<I, T>(args: I, out: &mut dyn Write, provision: impl FnOnce(bool) -> i32) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}", parse_error_message(&e));
            eprintln!("Use --help for usage information");
            return 1;
        }
    };

    if cli.help {
        return match utils::write_help(out) {
            Ok(()) => 0,
            Err(_) => 1,
        };
    }

    if cli.version {
        return match writeln!(out, "hostprep {}", utils::get_version_string()) {
            Ok(()) => 0,
            Err(_) => 1,
        };
    }

    provision(cli.demo)
}

fn parse_error_message(e: &clap::Error) -> String {
    match e.kind() {
        ErrorKind::UnknownArgument => {
            let arg = e
                .get(ContextKind::InvalidArg)
                .map(|v| v.to_string())
                .unwrap_or_default();
            format!("Unknown option: {}", arg)
        }
        kind => format!(
            "Invalid arguments: {}",
            kind.as_str().unwrap_or("could not parse command line")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Logger;
    use crate::testing::SharedBuffer;
    use tempfile::TempDir;

    #[test]
    fn test_known_flags() {
        let cli = Cli::try_parse_from(["hostprep", "--demo"]).unwrap();
        assert!(cli.demo && !cli.help);

        let cli = Cli::try_parse_from(["hostprep", "--help"]).unwrap();
        assert!(cli.help && !cli.demo);

        let cli = Cli::try_parse_from(["hostprep"]).unwrap();
        assert!(!cli.demo && !cli.help && !cli.version);
    }

    #[test]
    fn test_unknown_option_message() {
        let err = Cli::try_parse_from(["hostprep", "--force"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert_eq!(parse_error_message(&err), "Unknown option: --force");
    }

    #[test]
    fn test_unknown_option_exits_one() {
        assert_eq!(handle_args(["hostprep", "--bogus"]), 1);
    }

    #[test]
    fn test_help_exits_zero() {
        assert_eq!(handle_args(["hostprep", "--help"]), 0);
    }

    #[test]
    fn test_help_never_reaches_provisioning() {
        let temp = TempDir::new().unwrap();
        let logs = temp.path().join("logs");
        let mut out = SharedBuffer::default();

        let code = dispatch(["hostprep", "--help"], &mut out, |demo| {
            Logger::init(&logs, demo).unwrap();
            0
        });

        assert_eq!(code, 0);
        assert!(out.contents().contains("Usage:"));
        assert!(out.contents().contains("--demo"));
        assert!(!logs.exists());
    }

    #[test]
    fn test_version_written_to_output() {
        let mut out = SharedBuffer::default();
        let code = dispatch(["hostprep", "-V"], &mut out, |_| unreachable!());

        assert_eq!(code, 0);
        assert!(out.contents().starts_with("hostprep "));
    }

    #[test]
    fn test_demo_flag_reaches_provisioning() {
        let mut out = SharedBuffer::default();
        let mut requested = None;

        let code = dispatch(["hostprep", "--demo"], &mut out, |demo| {
            requested = Some(demo);
            0
        });

        assert_eq!(code, 0);
        assert_eq!(requested, Some(true));
        assert!(out.contents().is_empty());
    }
}
