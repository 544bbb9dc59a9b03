use crate::config::Secret;
use anyhow::{Context, Result};
use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};

/// A system command, described but not yet run.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment, on top of the inherited one
    pub env: Vec<(String, String)>,
    /// Fed to the command's stdin; always masked when displayed
    pub stdin: Option<Secret>,
    /// Attach the operator's terminal to stdin (for tools that prompt)
    pub interactive: bool,
}

impl CommandSpec {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: Vec::new(),
            stdin: None,
            interactive: false,
        }
    }

    /// Run `script` through `sh -c`.
    pub fn shell(script: &str) -> Self {
        Self::new("sh", &["-c", script])
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_stdin(mut self, input: Secret) -> Self {
        self.stdin = Some(input);
        self
    }

    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }
}

fn quote(arg: &str) -> String {
    if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || "'\"$`\\|&;<>()*?".contains(c))
    {
        format!("'{}'", arg.replace('\'', r"'\''"))
    } else {
        arg.to_string()
    }
}

/// Shell-like rendering used in logs and `[DEMO]` lines. Stdin is masked.
impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{}={} ", key, quote(value))?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        if let Some(ref input) = self.stdin {
            write!(f, " <<< {}", input)?;
        }
        Ok(())
    }
}

/// Exit status and combined stdout/stderr of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: i32,
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// The one capability every system mutation goes through.
pub trait SystemCommand {
    /// Run the command to completion and report how it ended.
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Local command execution helpers
pub mod local {
    use super::*;

    /// Check if a command exists using native Rust (which crate)
    pub fn check_command_exists(command: &str) -> bool {
        which::which(command).is_ok()
    }

    pub fn execute(spec: &CommandSpec) -> Result<CommandOutput> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        if spec.stdin.is_some() {
            cmd.stdin(Stdio::piped());
        } else if spec.interactive {
            cmd.stdin(Stdio::inherit());
        } else {
            cmd.stdin(Stdio::null());
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to execute command: {}", spec.program))?;

        if let Some(ref input) = spec.stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input.expose().as_bytes())
                    .with_context(|| format!("Failed to write stdin of {}", spec.program))?;
                pipe.write_all(b"\n")?;
            }
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for command: {}", spec.program))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            code: exit_code(&output.status),
            output: combined,
        })
    }

    #[cfg(unix)]
    fn exit_code(status: &std::process::ExitStatus) -> i32 {
        use std::os::unix::process::ExitStatusExt;
        status
            .code()
            .or_else(|| status.signal().map(|sig| 128 + sig))
            .unwrap_or(1)
    }

    #[cfg(not(unix))]
    fn exit_code(status: &std::process::ExitStatus) -> i32 {
        status.code().unwrap_or(1)
    }
}

/// Runs commands on this machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalSystem;

impl SystemCommand for LocalSystem {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        local::execute(spec)
    }
}
