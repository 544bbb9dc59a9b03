use crate::commands::utils;
use crate::config::collector::{ConfigCollector, Prompter, TerminalPrompter};
use crate::config::{self, Settings};
use crate::failure::{DiagnosticViewer, Failure, FailureHandler, GuiTextViewer};
use crate::logging::Logger;
use crate::provision::error::Abort;
use crate::provision::executor::StepExecutor;
use crate::provision::{self, Context};
use crate::utils::exec::{LocalSystem, SystemCommand};
use anyhow::Result;
use std::io;
use std::time::Duration;

/// Everything a provisioning run talks to.
pub struct Session<'a> {
    pub settings: &'a Settings,
    pub logger: &'a Logger,
    pub system: &'a dyn SystemCommand,
    pub prompter: &'a mut dyn Prompter,
    pub viewer: &'a dyn DiagnosticViewer,
    pub demo_mode: bool,
    pub sleep: fn(Duration),
}

/// Entry point for a provisioning run on this machine. Returns the exit code.
pub fn handle_provision(demo_mode: bool) -> i32 {
    if !demo_mode && !nix::unistd::geteuid().is_root() {
        eprintln!("Error: This script must be run as root (use sudo)");
        eprintln!();
        utils::write_usage(&mut io::stderr()).ok();
        return 1;
    }

    let settings = match config::config_manager::load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return 1;
        }
    };

    // Without a log file there is no diagnostic trail, so stop here
    let logger = match Logger::init(settings.log_dir_for(demo_mode), demo_mode) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Error: Cannot create log file: {:#}", e);
            return 1;
        }
    };

    let viewer = GuiTextViewer::new(&settings.viewers);
    let mut prompter = TerminalPrompter;
    run_session(Session {
        settings: &settings,
        logger: &logger,
        system: &LocalSystem,
        prompter: &mut prompter,
        viewer: &viewer,
        demo_mode,
        sleep: std::thread::sleep,
    })
}

/// Banner, configuration, pipeline, and the error boundary around them.
pub fn run_session(session: Session<'_>) -> i32 {
    let Session {
        settings,
        logger,
        system,
        prompter,
        viewer,
        demo_mode,
        sleep,
    } = session;

    utils::print_banner(logger, demo_mode);
    logger.info(&format!("Log file: {}", logger.path().display()));

    match provision_host(settings, logger, system, prompter, demo_mode, sleep) {
        Ok(()) => {
            logger.info("Run finished");
            0
        }
        Err(err) => exit_code_for(&err, logger, viewer),
    }
}

fn provision_host(
    settings: &Settings,
    logger: &Logger,
    system: &dyn SystemCommand,
    prompter: &mut dyn Prompter,
    demo_mode: bool,
    sleep: fn(Duration),
) -> Result<()> {
    let config = ConfigCollector::new(logger, &mut *prompter, &settings.emergency_user, demo_mode)
        .collect()?;

    let mut ctx = Context {
        config: &config,
        settings,
        logger,
        exec: StepExecutor::new(system, logger, demo_mode),
        prompter,
        sleep,
    };
    provision::run_pipeline(&mut ctx)
}

fn exit_code_for(err: &anyhow::Error, logger: &Logger, viewer: &dyn DiagnosticViewer) -> i32 {
    match err.downcast_ref::<Abort>() {
        Some(Abort::Cancelled) => {
            logger.plain("Provisioning cancelled. No changes were made.");
            0
        }
        Some(abort) => {
            logger.plain(&format!(
                "Provisioning aborted. Log file: {}",
                logger.path().display()
            ));
            abort.exit_code()
        }
        None => FailureHandler::new(logger, viewer).handle(&Failure::from_error(err)),
    }
}
