use crate::config::collector::is_yes;
use crate::provision::Context;
use crate::utils::exec::CommandSpec;
use anyhow::Result;
use std::time::Duration;

const RULE: &str = "==========================================";

pub fn print_summary(ctx: &mut Context<'_>) -> Result<()> {
    let config = ctx.config;
    let admins = if config.it_admins.is_empty() {
        "(none)".to_string()
    } else {
        config.it_admins.join(", ")
    };

    ctx.logger.plain(RULE);
    if ctx.is_demo() {
        ctx.logger.plain("  DEMO COMPLETE - no changes were made");
    } else {
        ctx.logger.plain("  PROVISIONING COMPLETE");
    }
    ctx.logger.plain(RULE);
    ctx.logger.plain(&format!("Hostname:          {}", config.hostname));
    ctx.logger.plain(&format!("Domain:            {}", config.domain_name));
    ctx.logger.plain(&format!("IT admins:         {}", admins));
    ctx.logger.plain(&format!("Main user:         {}", config.main_user));
    ctx.logger.plain(&format!("Emergency account: {}", ctx.settings.emergency_user));
    ctx.logger.plain(&format!(
        "Log file:          {}",
        ctx.logger.path().display()
    ));
    ctx.logger.info("Provisioning pipeline completed");
    Ok(())
}

/// Offer to reboot. The countdown is the one place Ctrl+C is expected.
pub fn prompt_reboot(ctx: &mut Context<'_>) -> Result<()> {
    let reboot = CommandSpec::new("systemctl", &["reboot"]);
    let answer = ctx.ask("Reboot now to apply all changes? (y/N)")?;
    if !is_yes(&answer) {
        ctx.logger.info("Reboot deferred by operator");
        if ctx.is_demo() {
            ctx.logger.demo(&format!("A live run would reboot with: {}", reboot));
        }
        ctx.logger.plain("Reboot the machine before the first domain login.");
        return Ok(());
    }

    let delay = ctx.settings.reboot_delay_secs;
    ctx.logger.plain(&format!(
        "Rebooting in {} seconds. Press Ctrl+C to cancel.",
        delay
    ));
    for remaining in (1..=delay).rev() {
        ctx.logger.plain(&format!("{}...", remaining));
        (ctx.sleep)(Duration::from_secs(1));
    }

    ctx.exec.require(&reboot, "Reboot the machine")?;
    Ok(())
}
