use crate::provision::Context;
use crate::utils::exec::CommandSpec;
use anyhow::Result;

/// Give every IT admin and the main user login access, a home directory and
/// administrative rights.
///
/// Individual failures are logged and skipped: every user gets an attempt.
/// Group membership is applied twice, through `adduser` and `usermod`; the
/// second is not skipped when the first succeeds.
pub fn configure_users(ctx: &mut Context<'_>) -> Result<()> {
    let config = ctx.config;
    let group = ctx.settings.admin_group.as_str();
    let mut configured = 0;
    let mut failures = 0;

    for user in config.admin_users() {
        ctx.logger.plain(&format!("Configuring {}", user));

        let steps = [
            (
                CommandSpec::new("realm", &["permit", user]),
                format!("Permit {} to log in", user),
            ),
            (
                CommandSpec::new("mkhomedir_helper", &[user]),
                format!("Create home directory for {}", user),
            ),
            (
                CommandSpec::new("adduser", &[user, group]),
                format!("Add {} to {} group (adduser)", user, group),
            ),
            (
                CommandSpec::new("usermod", &["-aG", group, user]),
                format!("Add {} to {} group (usermod)", user, group),
            ),
        ];

        let mut ok = true;
        for (spec, description) in &steps {
            ok &= ctx.attempt(spec, description);
        }

        if ok {
            ctx.done(&format!("{} configured as administrator", user));
        } else {
            failures += 1;
            ctx.logger.warn(&format!("{} configured with errors, see log", user));
        }
        configured += 1;
    }

    ctx.logger.info(&format!(
        "Processed {} user(s), {} with errors",
        configured, failures
    ));
    Ok(())
}
