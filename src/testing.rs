//! In-memory stand-ins for the system, the terminal and the diagnostic viewer.
//!
//! They let the whole pipeline run without root, a domain, or a display.

use crate::config::collector::Prompter;
use crate::config::Secret;
use crate::failure::DiagnosticViewer;
use crate::utils::exec::{CommandOutput, CommandSpec, SystemCommand};
use anyhow::{Result, bail};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Cloneable in-memory writer for capturing console output.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).to_string()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Response {
    pattern: String,
    outcome: Option<CommandOutput>,
}

/// Records every command it is asked to run.
///
/// Commands succeed with no output unless a scripted response matches a
/// substring of the rendered command; the first match wins.
#[derive(Default)]
pub struct RecordingSystem {
    calls: RefCell<Vec<CommandSpec>>,
    responses: Vec<Response>,
}

impl RecordingSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands containing `pattern` exit with `code` and print `output`.
    pub fn fail_on(mut self, pattern: &str, code: i32, output: &str) -> Self {
        self.responses.push(Response {
            pattern: pattern.to_string(),
            outcome: Some(CommandOutput {
                code,
                output: output.to_string(),
            }),
        });
        self
    }

    /// Commands containing `pattern` cannot be started.
    pub fn missing(mut self, pattern: &str) -> Self {
        self.responses.push(Response {
            pattern: pattern.to_string(),
            outcome: None,
        });
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    /// Rendered commands, in the order they ran.
    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.to_string()).collect()
    }
}

impl SystemCommand for RecordingSystem {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(spec.clone());
        let rendered = spec.to_string();
        match self.responses.iter().find(|r| rendered.contains(&r.pattern)) {
            Some(Response {
                outcome: Some(out), ..
            }) => Ok(out.clone()),
            Some(Response { outcome: None, .. }) => {
                bail!("Failed to execute command: {}", spec.program)
            }
            None => Ok(CommandOutput {
                code: 0,
                output: String::new(),
            }),
        }
    }
}

/// Answers prompts from a queue. An exhausted line queue reads as an empty
/// line, the way end-of-input does on a real terminal; an exhausted secret
/// queue is an error, like a password read with no terminal attached.
#[derive(Default)]
pub struct ScriptedPrompter {
    lines: VecDeque<String>,
    secrets: VecDeque<String>,
    prompts: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_secrets<I, S>(mut self, secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.secrets = secrets.into_iter().map(Into::into).collect();
        self
    }

    /// Every label shown so far, secrets included.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl Prompter for ScriptedPrompter {
    fn read_line(&mut self, label: &str) -> Result<String> {
        self.prompts.push(label.to_string());
        Ok(self.lines.pop_front().unwrap_or_default())
    }

    fn read_secret(&mut self, label: &str) -> Result<Secret> {
        self.prompts.push(label.to_string());
        match self.secrets.pop_front() {
            Some(secret) => Ok(Secret::new(secret)),
            None => bail!("No secret input left for: {}", label),
        }
    }
}

/// A machine with no GUI text viewer.
pub struct NoViewer;

impl DiagnosticViewer for NoViewer {
    fn open(&self, _path: &Path) -> Result<()> {
        bail!("No graphical text viewer available")
    }
}

/// Remembers which files it was asked to show.
#[derive(Default)]
pub struct RecordingViewer {
    opened: RefCell<Vec<PathBuf>>,
}

impl RecordingViewer {
    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.borrow().clone()
    }
}

impl DiagnosticViewer for RecordingViewer {
    fn open(&self, path: &Path) -> Result<()> {
        self.opened.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}
