use crate::provision::Context;
use crate::utils::exec::CommandSpec;
use anyhow::Result;

const JOIN_HINT: &str = "Verify the domain admin credentials, that DNS resolves the domain, \
                         and that a domain controller is reachable from this network";

/// Join the Active Directory domain with realmd.
///
/// `realm` asks for the admin password itself, so the terminal stays attached.
pub fn join_domain(ctx: &mut Context<'_>) -> Result<()> {
    let admin = ctx.config.domain_admin.as_str();
    let domain = ctx.config.domain_name.as_str();

    ctx.logger.plain(&format!(
        "Joining {} as {}. You will be prompted for the account password.",
        domain, admin
    ));

    let spec = CommandSpec::new("realm", &["join", "--verbose"])
        .arg(format!("--user={}", admin))
        .arg(domain)
        .interactive();
    let result = ctx.exec.run(&spec, &format!("Join domain {}", domain));
    if !result.success() {
        return Err(ctx.fatal(
            format!("Failed to join domain {} (exit code {})", domain, result.code()),
            JOIN_HINT,
        ));
    }

    ctx.done(&format!("Joined domain {}", domain));
    Ok(())
}

/// Have PAM create home directories on first domain login.
pub fn enable_mkhomedir(ctx: &mut Context<'_>) -> Result<()> {
    ctx.exec.require(
        &CommandSpec::new("pam-auth-update", &["--enable", "mkhomedir"]),
        "Enable automatic home directory creation",
    )?;
    ctx.done("Home directory creation enabled");
    Ok(())
}
