// Provision module - the fixed build pipeline, one submodule per area
pub mod error;
pub mod executor;

mod domain;
mod finish;
mod packages;
mod software;
mod system;
mod users;

use crate::config::collector::{Prompter, prompt_label};
use crate::config::{RunConfig, Settings};
use crate::logging::Logger;
use crate::utils::exec::CommandSpec;
use anyhow::Result;
use error::Abort;
use executor::StepExecutor;
use std::time::Duration;

const APT_HINT: &str = "Check network connectivity and that the packages are available \
                        in the configured apt sources";

/// Everything a step may read or use. Built once the configuration is
/// confirmed and passed through every step in turn.
pub struct Context<'a> {
    pub config: &'a RunConfig,
    pub settings: &'a Settings,
    pub logger: &'a Logger,
    pub exec: StepExecutor<'a>,
    pub prompter: &'a mut dyn Prompter,
    /// Blocking delay, swappable so tests do not wait out the reboot countdown
    pub sleep: fn(Duration),
}

impl<'a> Context<'a> {
    pub fn is_demo(&self) -> bool {
        self.config.demo_mode
    }

    /// Ask the operator something, with the demo suffix when applicable.
    pub fn ask(&mut self, text: &str) -> Result<String> {
        let label = prompt_label(text, self.config.demo_mode);
        self.prompter.read_line(&label)
    }

    /// Report an anticipated, run-ending failure and build the error to return.
    pub fn fatal(&self, message: String, hint: &str) -> anyhow::Error {
        self.logger.error(&message);
        self.logger.plain(&format!("Hint: {}", hint));
        Abort::Fatal {
            message,
            hint: hint.to_string(),
        }
        .into()
    }

    /// Success narration; demo runs say it was simulated.
    pub fn done(&self, message: &str) {
        if self.is_demo() {
            self.logger.demo(&format!("Simulated: {}", message));
        } else {
            self.logger.plain(&format!("✓ {}", message));
        }
    }

    /// Run a command whose failure is logged but does not stop the step.
    pub fn attempt(&self, spec: &CommandSpec, description: &str) -> bool {
        let result = self.exec.run(spec, description);
        if !result.success() {
            self.logger.error(&format!(
                "{} failed (exit code {}), continuing",
                description,
                result.code()
            ));
        }
        result.success()
    }

    /// `apt-get install` the given packages; failure ends the run.
    pub fn install_packages(&self, packages: &[String], what: &str) -> Result<()> {
        if packages.is_empty() {
            self.logger.info(&format!("No packages configured for {}, skipping", what));
            return Ok(());
        }

        let spec = CommandSpec::new("apt-get", &["install", "-y"])
            .args(packages.iter().cloned())
            .with_env("DEBIAN_FRONTEND", "noninteractive");
        let result = self.exec.run(&spec, &format!("Install {}", what));
        if !result.success() {
            return Err(self.fatal(
                format!("Failed to install {} (exit code {})", what, result.code()),
                APT_HINT,
            ));
        }
        self.done(&format!("{} installed", what));
        Ok(())
    }
}

/// One named unit of the pipeline.
pub struct PipelineStep {
    pub name: &'static str,
    pub title: &'static str,
    pub action: fn(&mut Context<'_>) -> Result<()>,
}

/// The provisioning sequence. Order matters and is not configurable.
pub const STEPS: &[PipelineStep] = &[
    PipelineStep {
        name: "account-creation",
        title: "Emergency Account",
        action: system::create_emergency_account,
    },
    PipelineStep {
        name: "hostname",
        title: "Hostname",
        action: system::set_hostname,
    },
    PipelineStep {
        name: "sudo-install",
        title: "Sudo Installation",
        action: packages::install_sudo,
    },
    PipelineStep {
        name: "ssh-install",
        title: "SSH Server Installation",
        action: packages::install_ssh,
    },
    PipelineStep {
        name: "service-config",
        title: "Service Configuration",
        action: system::configure_services,
    },
    PipelineStep {
        name: "domain-packages",
        title: "Domain Integration Packages",
        action: packages::install_domain_packages,
    },
    PipelineStep {
        name: "domain-join",
        title: "Domain Join",
        action: domain::join_domain,
    },
    PipelineStep {
        name: "mkhomedir-config",
        title: "Home Directory Creation",
        action: domain::enable_mkhomedir,
    },
    PipelineStep {
        name: "user-config",
        title: "User and Sudoer Configuration",
        action: users::configure_users,
    },
    PipelineStep {
        name: "extra-packages",
        title: "Additional Packages",
        action: packages::install_extra_packages,
    },
    PipelineStep {
        name: "optional-software",
        title: "Optional Software",
        action: software::install_optional_software,
    },
    PipelineStep {
        name: "completion-summary",
        title: "Summary",
        action: finish::print_summary,
    },
    PipelineStep {
        name: "reboot-prompt",
        title: "Reboot",
        action: finish::prompt_reboot,
    },
];

/// Run every step in order. The first error ends the run.
pub fn run_pipeline(ctx: &mut Context<'_>) -> Result<()> {
    let total = STEPS.len();
    for (index, step) in STEPS.iter().enumerate() {
        ctx.logger.blank();
        ctx.logger.plain(&format!("=== Step {}/{}: {} ===", index + 1, total, step.title));
        ctx.logger.info(&format!("Starting step: {}", step.name));
        if ctx.is_demo() {
            ctx.logger.demo("Demo mode: no changes will be made in this step");
        }

        (step.action)(ctx)?;

        ctx.logger.info(&format!("Finished step: {}", step.name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSystem, ScriptedPrompter, SharedBuffer};
    use std::fs;
    use tempfile::TempDir;

    fn settings(temp: &TempDir) -> Settings {
        Settings {
            passwd_file: temp.path().join("passwd"),
            reboot_delay_secs: 0,
            ..Settings::default()
        }
    }

    fn config(demo: bool) -> RunConfig {
        RunConfig {
            hostname: "test01".into(),
            domain_admin: "itadmin@corp.local".into(),
            domain_name: "corp.local".into(),
            it_admins: vec!["jdoe@corp.local".into()],
            main_user: "asmith@corp.local".into(),
            emergency_password: if demo {
                None
            } else {
                Some(crate::config::Secret::new("Emerg3ncy!"))
            },
            demo_mode: demo,
        }
    }

    fn logger(temp: &TempDir, demo: bool) -> (Logger, SharedBuffer) {
        let out = SharedBuffer::default();
        let logger = Logger::with_console(
            &temp.path().join("logs"),
            demo,
            Box::new(out.clone()),
            Box::new(SharedBuffer::default()),
            false,
        )
        .unwrap();
        (logger, out)
    }

    fn no_sleep(_: Duration) {}

    /// Descriptions of every executor invocation, in order.
    fn executed_descriptions(log: &str) -> Vec<String> {
        log.lines()
            .filter_map(|l| l.split("[INFO] About to execute: ").nth(1))
            .map(str::to_string)
            .collect()
    }

    fn run(demo: bool, system: &RecordingSystem, answers: &[&str]) -> (Result<()>, String, String) {
        let temp = TempDir::new().unwrap();
        let settings = settings(&temp);
        let config = config(demo);
        let (logger, out) = logger(&temp, demo);
        let mut prompter = ScriptedPrompter::new(answers.iter().copied());
        let mut ctx = Context {
            config: &config,
            settings: &settings,
            logger: &logger,
            exec: StepExecutor::new(system, &logger, demo),
            prompter: &mut prompter,
            sleep: no_sleep,
        };
        let result = run_pipeline(&mut ctx);
        let log = fs::read_to_string(logger.path()).unwrap();
        (result, log, out.contents())
    }

    #[test]
    fn test_step_order() {
        let names: Vec<&str> = STEPS.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "account-creation",
                "hostname",
                "sudo-install",
                "ssh-install",
                "service-config",
                "domain-packages",
                "domain-join",
                "mkhomedir-config",
                "user-config",
                "extra-packages",
                "optional-software",
                "completion-summary",
                "reboot-prompt",
            ]
        );
    }

    #[test]
    fn test_demo_and_live_run_the_same_actions() {
        let demo_system = RecordingSystem::new();
        let (demo_result, demo_log, demo_out) = run(true, &demo_system, &["n", "n", "n", "y"]);
        demo_result.unwrap();
        assert!(demo_system.calls().is_empty());

        let live_system = RecordingSystem::new();
        let (live_result, live_log, live_out) = run(false, &live_system, &["n", "n", "n", "y"]);
        live_result.unwrap();

        let demo_steps = executed_descriptions(&demo_log);
        assert!(!demo_steps.is_empty());
        assert_eq!(demo_steps, executed_descriptions(&live_log));
        assert_eq!(live_system.calls().len(), demo_steps.len());

        let demo_lines = demo_out.lines().filter(|l| l.starts_with("[DEMO] Would execute:"));
        assert_eq!(demo_lines.count(), demo_steps.len());
        assert!(!live_out.contains("[DEMO]"));
        assert!(demo_log.contains("Would execute: systemctl reboot"));
    }

    #[test]
    fn test_every_step_announced() {
        let system = RecordingSystem::new();
        let (result, log, _) = run(true, &system, &[]);
        result.unwrap();
        for step in STEPS {
            assert!(log.contains(&format!("Starting step: {}", step.name)));
            assert!(log.contains(&format!("Finished step: {}", step.name)));
        }
    }

    #[test]
    fn test_package_failure_stops_pipeline() {
        let system = RecordingSystem::new().fail_on("openssh-server", 100, "E: broken");
        let (result, log, _) = run(false, &system, &[]);

        let err = result.unwrap_err();
        assert!(matches!(err.downcast_ref::<Abort>(), Some(Abort::Fatal { .. })));
        assert!(log.contains("[ERROR] Failed to install SSH server"));
        assert!(!log.contains("Starting step: service-config"));
    }

    #[test]
    fn test_required_command_failure_propagates() {
        let system = RecordingSystem::new().fail_on("hostnamectl", 1, "");
        let (result, log, _) = run(false, &system, &[]);

        let err = result.unwrap_err();
        let failure = err
            .downcast_ref::<crate::provision::error::CommandFailure>()
            .unwrap();
        assert_eq!(failure.command, "hostnamectl set-hostname test01");
        assert!(failure.location.contains("system.rs"));
        assert!(!log.contains("Starting step: sudo-install"));
    }
}
