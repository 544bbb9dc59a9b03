//! Last-resort handling for failures nothing else anticipated.
//!
//! The top level hands every unhandled error to [`FailureHandler::handle`],
//! which records it, points the operator at the run log and returns the exit
//! code to leave with.

use crate::logging::Logger;
use crate::provision::error::CommandFailure;
use crate::utils::exec::local;
use anyhow::{Context, Result, anyhow, bail};
use std::env;
use std::path::Path;
use std::process::{Command, Stdio};

const RULE: &str = "==========================================";

const COMMON_CAUSES: &[&str] = &[
    "Not running with root privileges (run with sudo)",
    "No network connectivity (check DNS and the default route)",
    "Package not available in the configured apt sources",
    "Insufficient disk space (check with df -h)",
    "Permission denied on a system file or directory",
];

/// Something that can put a file in front of the operator.
pub trait DiagnosticViewer {
    fn open(&self, path: &Path) -> Result<()>;
}

/// Launches the first installed GUI text editor on the log file.
pub struct GuiTextViewer {
    candidates: Vec<String>,
}

impl GuiTextViewer {
    pub fn new(candidates: &[String]) -> Self {
        Self {
            candidates: candidates.to_vec(),
        }
    }
}

impl DiagnosticViewer for GuiTextViewer {
    fn open(&self, path: &Path) -> Result<()> {
        if env::var_os("DISPLAY").is_none() && env::var_os("WAYLAND_DISPLAY").is_none() {
            bail!("No graphical session available (DISPLAY is not set)");
        }

        let viewer = self
            .candidates
            .iter()
            .find(|candidate| local::check_command_exists(candidate))
            .ok_or_else(|| {
                anyhow!(
                    "No graphical text viewer found (tried: {})",
                    self.candidates.join(", ")
                )
            })?;

        // Detached: the process is about to exit and must not wait on the editor
        Command::new(viewer)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to launch {}", viewer))?;
        Ok(())
    }
}

/// What went wrong, in the shape the handler reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub location: String,
    pub command: String,
    pub code: i32,
}

impl Failure {
    /// Pull location and command out of a [`CommandFailure`]; any other error
    /// is reported with an unknown location and exit code 1.
    pub fn from_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<CommandFailure>() {
            Some(failure) => Failure {
                location: failure.location.clone(),
                command: failure.command.clone(),
                code: failure.code,
            },
            None => Failure {
                location: "unknown".to_string(),
                command: format!("{:#}", err),
                code: 1,
            },
        }
    }
}

pub struct FailureHandler<'a> {
    logger: &'a Logger,
    viewer: &'a dyn DiagnosticViewer,
}

impl<'a> FailureHandler<'a> {
    pub fn new(logger: &'a Logger, viewer: &'a dyn DiagnosticViewer) -> Self {
        Self { logger, viewer }
    }

    /// Report `failure` and return the exit code to terminate with.
    ///
    /// Does not fail: every problem here is downgraded to a log entry.
    pub fn handle(&self, failure: &Failure) -> i32 {
        self.logger.error(&format!(
            "Unexpected failure at {} (exit code {}): {}",
            failure.location, failure.code, failure.command
        ));

        self.logger.blank();
        self.logger.plain(RULE);
        self.logger.plain("  PROVISIONING FAILED");
        self.logger.plain(RULE);
        self.logger.plain("A detailed log of this run has been saved to:");
        self.logger.plain(&format!("  {}", self.logger.path().display()));
        self.logger.blank();

        match self.viewer.open(self.logger.path()) {
            Ok(()) => self.logger.info("Opened the log file in a text viewer"),
            Err(e) => self
                .logger
                .warn(&format!("Could not open the log file automatically: {}", e)),
        }

        self.logger.blank();
        self.logger.plain("Common causes:");
        for cause in COMMON_CAUSES {
            self.logger.plain(&format!("  - {}", cause));
        }
        self.logger.blank();

        if failure.code == 0 { 1 } else { failure.code }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{NoViewer, RecordingViewer, SharedBuffer};
    use std::fs;
    use tempfile::TempDir;

    fn logger(temp: &TempDir) -> (Logger, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        let logger = Logger::with_console(
            temp.path(),
            false,
            Box::new(out.clone()),
            Box::new(err.clone()),
            false,
        )
        .unwrap();
        (logger, out, err)
    }

    fn failure() -> Failure {
        Failure {
            location: "src/provision/system.rs:42".into(),
            command: "systemctl start ssh".into(),
            code: 5,
        }
    }

    #[test]
    fn test_handle_reports_and_returns_code() {
        let temp = TempDir::new().unwrap();
        let (logger, out, err) = logger(&temp);
        let viewer = RecordingViewer::default();

        let code = FailureHandler::new(&logger, &viewer).handle(&failure());

        assert_eq!(code, 5);
        assert_eq!(viewer.opened(), vec![logger.path().to_path_buf()]);
        assert!(err.contents().contains("src/provision/system.rs:42"));
        assert!(err.contents().contains("systemctl start ssh"));

        let stdout = out.contents();
        assert!(stdout.contains("PROVISIONING FAILED"));
        assert!(stdout.contains(&logger.path().display().to_string()));
        assert!(stdout.contains("root privileges"));
        assert!(stdout.contains("disk space"));

        let log = fs::read_to_string(logger.path()).unwrap();
        assert!(log.contains("[ERROR] Unexpected failure at src/provision/system.rs:42"));
    }

    #[test]
    fn test_missing_viewer_is_only_a_warning() {
        let temp = TempDir::new().unwrap();
        let (logger, out, _) = logger(&temp);

        let code = FailureHandler::new(&logger, &NoViewer).handle(&failure());

        assert_eq!(code, 5);
        assert!(out
            .contents()
            .contains("WARNING: Could not open the log file automatically"));
        assert!(out.contents().contains("Common causes:"));
    }

    #[test]
    fn test_from_plain_error() {
        let err = anyhow!("Failed to read from terminal");
        let failure = Failure::from_error(&err);
        assert_eq!(failure.location, "unknown");
        assert_eq!(failure.code, 1);
        assert!(failure.command.contains("terminal"));
    }

    #[test]
    fn test_from_command_failure() {
        let err: anyhow::Error = CommandFailure {
            location: "src/provision/domain.rs:30".into(),
            command: "pam-auth-update --enable mkhomedir".into(),
            code: 2,
        }
        .into();
        let failure = Failure::from_error(&err);
        assert_eq!(failure.code, 2);
        assert_eq!(failure.command, "pam-auth-update --enable mkhomedir");
    }
}
