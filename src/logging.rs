//! Run log: one append-only file per run, mirrored to the console.
//!
//! Every line the operator sees during provisioning is recorded here as well,
//! so the log file alone is enough to reconstruct what happened.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use colored::Colorize;
use nix::unistd::geteuid;
use std::cell::RefCell;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, IsTerminal, Write};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

const RULE: &str = "==========================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
    Plain,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Plain => "PLAIN",
        };
        f.write_str(name)
    }
}

/// Process-wide log sink. Created once at startup and passed by reference.
///
/// The process is single-threaded, so interior mutability through `RefCell`
/// is all the coordination the sinks need.
pub struct Logger {
    path: PathBuf,
    file: RefCell<File>,
    stdout: RefCell<Box<dyn Write>>,
    stderr: RefCell<Box<dyn Write>>,
    color: bool,
}

impl Logger {
    /// Open the run's log file under `dir` and echo to the real terminal.
    pub fn init(dir: &Path, demo_mode: bool) -> Result<Self> {
        let color = io::stdout().is_terminal();
        Self::with_console(
            dir,
            demo_mode,
            Box::new(io::stdout()),
            Box::new(io::stderr()),
            color,
        )
    }

    /// Same as [`Logger::init`] with caller-supplied console streams.
    pub fn with_console(
        dir: &Path,
        demo_mode: bool,
        stdout: Box<dyn Write>,
        stderr: Box<dyn Write>,
        color: bool,
    ) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
        check_log_dir(dir)?;

        let started = Local::now();
        let (path, file) = create_log_file(dir, &started)?;

        let logger = Self {
            path,
            file: RefCell::new(file),
            stdout: RefCell::new(stdout),
            stderr: RefCell::new(stderr),
            color,
        };
        logger.write_header(&started, demo_mode)?;
        Ok(logger)
    }

    fn write_header(&self, started: &DateTime<Local>, demo_mode: bool) -> Result<()> {
        let user = whoami::username();
        let host = whoami::fallible::hostname().unwrap_or_else(|_| "unknown".to_string());
        let mode = if demo_mode { "DEMO" } else { "LIVE" };

        let mut file = self.file.borrow_mut();
        writeln!(file, "{}", RULE)?;
        writeln!(file, "hostprep v{}", env!("CARGO_PKG_VERSION"))?;
        writeln!(file, "Started: {}", started.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(file, "User: {}", user)?;
        writeln!(file, "Host: {}", host)?;
        writeln!(file, "Mode: {}", mode)?;
        writeln!(file, "{}", RULE)?;
        file.flush()
            .with_context(|| format!("Failed to write log file: {}", self.path.display()))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record to the file and echo it to the console.
    ///
    /// Write failures are swallowed: once the file exists, logging must never
    /// be the reason a run stops.
    pub fn record(&self, level: Level, message: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        if let Ok(mut file) = self.file.try_borrow_mut() {
            writeln!(file, "[{}] [{}] {}", timestamp, level, message).ok();
        }

        match level {
            Level::Error => {
                let prefix = self.paint("ERROR:", |s| s.red().bold().to_string());
                self.echo_err(&format!("{} {}", prefix, message));
            }
            Level::Warning => {
                let prefix = self.paint("WARNING:", |s| s.yellow().bold().to_string());
                self.echo(&format!("{} {}", prefix, message));
            }
            Level::Info => {
                let prefix = self.paint("INFO:", |s| s.cyan().to_string());
                self.echo(&format!("{} {}", prefix, message));
            }
            Level::Plain => self.echo(message),
        }
    }

    pub fn info(&self, message: &str) {
        self.record(Level::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.record(Level::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.record(Level::Error, message);
    }

    pub fn plain(&self, message: &str) {
        self.record(Level::Plain, message);
    }

    /// A `[DEMO]` narration line, logged as PLAIN.
    pub fn demo(&self, message: &str) {
        let line = format!("[DEMO] {}", message);
        if let Ok(mut file) = self.file.try_borrow_mut() {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            writeln!(file, "[{}] [{}] {}", timestamp, Level::Plain, line).ok();
        }
        let painted = self.paint(&line, |s| s.magenta().to_string());
        self.echo(&painted);
    }

    /// Blank console line; also keeps the log readable.
    pub fn blank(&self) {
        self.plain("");
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> String) -> String {
        if self.color {
            style(text)
        } else {
            text.to_string()
        }
    }

    fn echo(&self, line: &str) {
        if let Ok(mut out) = self.stdout.try_borrow_mut() {
            writeln!(out, "{}", line).ok();
            out.flush().ok();
        }
    }

    fn echo_err(&self, line: &str) {
        if let Ok(mut err) = self.stderr.try_borrow_mut() {
            writeln!(err, "{}", line).ok();
            err.flush().ok();
        }
    }
}

/// The log directory may live somewhere shared like /tmp, so refuse one that
/// is a symlink or belongs to someone else.
fn check_log_dir(dir: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(dir)
        .with_context(|| format!("Failed to inspect log directory: {}", dir.display()))?;
    if meta.file_type().is_symlink() {
        bail!("Log directory is a symlink: {}", dir.display());
    }
    if meta.uid() != geteuid().as_raw() {
        bail!("Log directory is owned by another user: {}", dir.display());
    }
    Ok(())
}

/// Create a fresh log file. Never opens an existing path, so a planted file
/// or symlink is skipped rather than written through.
fn create_log_file(dir: &Path, started: &DateTime<Local>) -> Result<(PathBuf, File)> {
    let stamp = started.format("%Y%m%d-%H%M%S");
    for attempt in 0..100 {
        let name = match attempt {
            0 => format!("hostprep-{}.log", stamp),
            n => format!("hostprep-{}-{}.log", stamp, n),
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to create log file: {}", path.display()));
            }
        }
    }
    bail!("Failed to create log file in {}: too many runs this second", dir.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SharedBuffer;
    use tempfile::TempDir;

    fn logger(temp: &TempDir) -> (Logger, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        let logger = Logger::with_console(
            temp.path(),
            true,
            Box::new(out.clone()),
            Box::new(err.clone()),
            false,
        )
        .unwrap();
        (logger, out, err)
    }

    #[test]
    fn test_header_written_on_init() {
        let temp = TempDir::new().unwrap();
        let (logger, _, _) = logger(&temp);

        let content = fs::read_to_string(logger.path()).unwrap();
        assert!(content.starts_with(RULE));
        assert!(content.contains(&format!("hostprep v{}", env!("CARGO_PKG_VERSION"))));
        assert!(content.contains("Started: "));
        assert!(content.contains("User: "));
        assert!(content.contains("Host: "));
        assert!(content.contains("Mode: DEMO"));
        let name = logger.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("hostprep-") && name.ends_with(".log"));
    }

    #[test]
    fn test_levels_route_to_console() {
        let temp = TempDir::new().unwrap();
        let (logger, out, err) = logger(&temp);

        logger.info("starting");
        logger.warn("no admins");
        logger.error("broken");
        logger.plain("=== Step ===");

        let stdout = out.contents();
        assert!(stdout.contains("INFO: starting"));
        assert!(stdout.contains("WARNING: no admins"));
        assert!(stdout.contains("=== Step ===\n"));
        assert!(!stdout.contains("broken"));
        assert_eq!(err.contents(), "ERROR: broken\n");
    }

    #[test]
    fn test_record_format_in_file() {
        let temp = TempDir::new().unwrap();
        let (logger, _, _) = logger(&temp);

        logger.error("Failed to join domain corp.local");
        logger.demo("Would execute: hostnamectl set-hostname test01");

        let content = fs::read_to_string(logger.path()).unwrap();
        let error_line = content
            .lines()
            .find(|l| l.contains("Failed to join domain"))
            .unwrap();
        assert!(error_line.starts_with('['));
        assert!(error_line.contains("] [ERROR] Failed to join domain corp.local"));
        assert!(content.contains("[PLAIN] [DEMO] Would execute: hostnamectl set-hostname test01"));
    }

    #[test]
    fn test_planted_log_file_is_not_reused() {
        let temp = TempDir::new().unwrap();
        let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
        let target = temp.path().join("target");
        fs::write(&target, "keep").unwrap();
        for name in [
            format!("hostprep-{}.log", stamp),
            format!("hostprep-{}-1.log", stamp),
        ] {
            std::os::unix::fs::symlink(&target, temp.path().join(name)).unwrap();
        }

        let (logger, _, _) = logger(&temp);
        logger.info("hello");

        assert_eq!(fs::read_to_string(&target).unwrap(), "keep");
        let meta = fs::symlink_metadata(logger.path()).unwrap();
        assert!(meta.file_type().is_file());
        assert!(fs::read_to_string(logger.path()).unwrap().contains("hello"));
    }

    #[test]
    fn test_symlinked_log_directory_refused() {
        let temp = TempDir::new().unwrap();
        let real = temp.path().join("real");
        fs::create_dir(&real).unwrap();
        let link = temp.path().join("logs");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let result = Logger::with_console(
            &link,
            true,
            Box::new(SharedBuffer::default()),
            Box::new(SharedBuffer::default()),
            false,
        );

        assert!(result.is_err());
        assert_eq!(fs::read_dir(&real).unwrap().count(), 0);
    }

    #[test]
    fn test_unwritable_directory_fails() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("not-a-dir");
        fs::write(&blocker, "file").unwrap();

        let result = Logger::with_console(
            &blocker.join("logs"),
            false,
            Box::new(SharedBuffer::default()),
            Box::new(SharedBuffer::default()),
            false,
        );
        assert!(result.is_err());
    }
}
