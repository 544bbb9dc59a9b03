//! Step executor - the single path from a provisioning step to the system.
//!
//! Every mutating command in the pipeline is run through [`StepExecutor`].
//! That is what makes demo mode trustworthy: the demo branch lives here and
//! nowhere else, so no step can mutate the machine behind its back.

use crate::logging::Logger;
use crate::provision::error::CommandFailure;
use crate::utils::exec::{CommandOutput, CommandSpec, SystemCommand};
use anyhow::Result;
use std::panic::Location;

/// Exit code reported for a command that could not be started at all.
pub const SPAWN_FAILURE_CODE: i32 = 127;

/// Outcome of one executor invocation.
///
/// In demo mode `executed` is false and there is no output or exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub description: String,
    pub command: String,
    pub executed: bool,
    pub output: Option<String>,
    pub exit_code: Option<i32>,
}

impl StepResult {
    /// A simulated command counts as success.
    pub fn success(&self) -> bool {
        self.exit_code.map_or(true, |code| code == 0)
    }

    pub fn code(&self) -> i32 {
        self.exit_code.unwrap_or(0)
    }
}

pub struct StepExecutor<'a> {
    system: &'a dyn SystemCommand,
    logger: &'a Logger,
    demo_mode: bool,
}

impl<'a> StepExecutor<'a> {
    pub fn new(system: &'a dyn SystemCommand, logger: &'a Logger, demo_mode: bool) -> Self {
        Self {
            system,
            logger,
            demo_mode,
        }
    }

    pub fn is_demo(&self) -> bool {
        self.demo_mode
    }

    /// Run (or simulate) one command.
    ///
    /// Never fails: whether a non-zero exit is fatal is the caller's call.
    pub fn run(&self, spec: &CommandSpec, description: &str) -> StepResult {
        let command = spec.to_string();
        self.logger.info(&format!("About to execute: {}", description));
        self.logger.info(&format!("Command: {}", command));

        if self.demo_mode {
            self.logger.info(&format!("Would execute: {}", description));
            self.logger.demo(&format!("Would execute: {}", command));
            return StepResult {
                description: description.to_string(),
                command,
                executed: false,
                output: None,
                exit_code: None,
            };
        }

        let CommandOutput { code, output } = match self.system.execute(spec) {
            Ok(out) => out,
            Err(e) => CommandOutput {
                code: SPAWN_FAILURE_CODE,
                output: format!("{:#}", e),
            },
        };

        if !output.trim().is_empty() {
            self.logger.info(&format!("Output: {}", output.trim_end()));
        }
        self.logger.info(&format!(
            "Finished: {} (exit code {})",
            description, code
        ));

        StepResult {
            description: description.to_string(),
            command,
            executed: true,
            output: Some(output),
            exit_code: Some(code),
        }
    }

    /// Run a command the pipeline cannot do without.
    ///
    /// A non-zero exit becomes a [`CommandFailure`] carrying the caller's
    /// source location, for the failure handler to report.
    #[track_caller]
    pub fn require(&self, spec: &CommandSpec, description: &str) -> Result<StepResult> {
        let caller = Location::caller();
        let result = self.run(spec, description);
        if !result.success() {
            return Err(CommandFailure {
                location: format!("{}:{}", caller.file(), caller.line()),
                command: result.command.clone(),
                code: result.code(),
            }
            .into());
        }
        Ok(result)
    }
}
