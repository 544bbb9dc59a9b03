use crate::config::{RunConfig, Secret};
use crate::logging::Logger;
use crate::provision::error::Abort;
use anyhow::{Context, Result, bail};
use std::io::{self, Write};

const DEMO_SUFFIX: &str = " [DEMO - no changes will be made]";

/// Consecutive empty password entries tolerated before giving up.
const MAX_EMPTY_PASSWORDS: u32 = 3;

/// Where operator answers come from.
pub trait Prompter {
    /// Show `label` and read one line, trimmed. End of input reads as "".
    fn read_line(&mut self, label: &str) -> Result<String>;

    /// Like `read_line` but without echoing what is typed. Fails when there
    /// is no interactive source to read a secret from.
    fn read_secret(&mut self, label: &str) -> Result<Secret>;
}

/// Reads answers from the controlling terminal.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn read_line(&mut self, label: &str) -> Result<String> {
        print!("{}", label);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin()
            .read_line(&mut input)
            .context("Failed to read from terminal")?;
        Ok(input.trim().to_string())
    }

    fn read_secret(&mut self, label: &str) -> Result<Secret> {
        let term = console::Term::stderr();
        if !term.is_term() {
            bail!("Cannot read password: no terminal");
        }
        term.write_str(label)?;
        let value = term
            .read_secure_line()
            .context("Failed to read password from terminal")?;
        Ok(Secret::new(value))
    }
}

/// Prompt text as shown to the operator. Demo runs get a suffix so nobody
/// mistakes a rehearsal for the real thing.
pub fn prompt_label(text: &str, demo_mode: bool) -> String {
    if demo_mode {
        format!("{}{}: ", text, DEMO_SUFFIX)
    } else {
        format!("{}: ", text)
    }
}

/// Only an explicit `y`/`Y` counts as yes.
pub fn is_yes(answer: &str) -> bool {
    answer == "y" || answer == "Y"
}

/// Walks the operator through every run parameter.
///
/// Demo and live runs ask the same questions and enforce the same rules; the
/// only differences are the prompt suffix and that demo never asks for the
/// emergency password.
pub struct ConfigCollector<'a> {
    logger: &'a Logger,
    prompter: &'a mut dyn Prompter,
    emergency_user: &'a str,
    demo_mode: bool,
}

impl<'a> ConfigCollector<'a> {
    pub fn new(
        logger: &'a Logger,
        prompter: &'a mut dyn Prompter,
        emergency_user: &'a str,
        demo_mode: bool,
    ) -> Self {
        Self {
            logger,
            prompter,
            emergency_user,
            demo_mode,
        }
    }

    /// Gather and confirm the run configuration.
    ///
    /// Fails with [`Abort::MissingField`] on an empty required answer and with
    /// [`Abort::Cancelled`] if the summary is not confirmed.
    pub fn collect(mut self) -> Result<RunConfig> {
        self.logger.blank();
        self.logger.plain("=== Configuration ===");

        let hostname = self.required("Enter hostname for this machine", "Hostname")?;
        let domain_admin =
            self.required("Enter domain admin account (user@domain)", "Domain admin account")?;
        let domain_name = self.required("Enter domain name (e.g. corp.local)", "Domain name")?;
        let it_admins = self.it_admins()?;
        let main_user =
            self.required("Enter main user account (user@domain)", "Main user account")?;

        let emergency_password = if self.demo_mode {
            self.logger.info("Demo mode: emergency account password not collected");
            None
        } else {
            Some(self.emergency_password()?)
        };

        let config = RunConfig {
            hostname,
            domain_admin,
            domain_name,
            it_admins,
            main_user,
            emergency_password,
            demo_mode: self.demo_mode,
        };

        self.confirm(&config)?;
        Ok(config)
    }

    fn ask(&mut self, text: &str) -> Result<String> {
        let label = prompt_label(text, self.demo_mode);
        self.prompter.read_line(&label)
    }

    fn required(&mut self, text: &str, field: &'static str) -> Result<String> {
        let value = self.ask(text)?;
        if value.is_empty() {
            self.logger.error(&format!("{} is required", field));
            return Err(Abort::MissingField(field).into());
        }
        self.logger.info(&format!("{}: {}", field, value));
        Ok(value)
    }

    fn it_admins(&mut self) -> Result<Vec<String>> {
        self.logger
            .plain("Enter IT admin usernames (user@domain), one per line. Empty line to finish.");

        let mut admins = Vec::new();
        loop {
            let entry = self.ask("IT admin username")?;
            if entry.is_empty() {
                break;
            }
            self.logger.info(&format!("IT admin added: {}", entry));
            admins.push(entry);
        }

        if admins.is_empty() {
            self.logger.warn("No IT admin users specified");
        } else {
            self.logger.info(&format!("IT admins: {}", admins.join(", ")));
        }
        Ok(admins)
    }

    fn emergency_password(&mut self) -> Result<Secret> {
        let first_label = prompt_label(
            &format!("Enter password for emergency account '{}'", self.emergency_user),
            self.demo_mode,
        );
        let confirm_label = prompt_label("Confirm password", self.demo_mode);

        let mut empty = 0;
        loop {
            let first = self.prompter.read_secret(&first_label)?;
            let second = self.prompter.read_secret(&confirm_label)?;

            if first.is_empty() {
                empty += 1;
                if empty >= MAX_EMPTY_PASSWORDS {
                    let message = "No emergency account password entered".to_string();
                    let hint = "Run hostprep from an interactive terminal";
                    self.logger.error(&message);
                    self.logger.plain(&format!("Hint: {}", hint));
                    return Err(Abort::Fatal {
                        message,
                        hint: hint.to_string(),
                    }
                    .into());
                }
                self.logger.error("Password cannot be empty, please try again");
                continue;
            }
            empty = 0;
            if first == second {
                self.logger.info("Emergency account password set");
                return Ok(first);
            }
            self.logger.error("Passwords do not match, please try again");
        }
    }

    fn confirm(&mut self, config: &RunConfig) -> Result<()> {
        let admins = if config.it_admins.is_empty() {
            "(none)".to_string()
        } else {
            config.it_admins.join(", ")
        };
        let password = match config.emergency_password {
            Some(_) => "password set",
            None => "password not collected in demo mode",
        };

        self.logger.blank();
        self.logger.plain("=== Configuration Summary ===");
        self.logger.plain(&format!("Hostname:          {}", config.hostname));
        self.logger.plain(&format!("Domain admin:      {}", config.domain_admin));
        self.logger.plain(&format!("Domain:            {}", config.domain_name));
        self.logger.plain(&format!("IT admins:         {}", admins));
        self.logger.plain(&format!("Main user:         {}", config.main_user));
        self.logger.plain(&format!(
            "Emergency account: {} ({})",
            self.emergency_user, password
        ));
        self.logger.plain(&format!(
            "Mode:              {}",
            if config.demo_mode { "DEMO" } else { "LIVE" }
        ));
        self.logger.blank();

        let answer = self.ask("Proceed with these settings? (y/N)")?;
        if !is_yes(&answer) {
            self.logger.info("Provisioning cancelled by user");
            return Err(Abort::Cancelled.into());
        }
        self.logger.info("Configuration confirmed");
        Ok(())
    }
}
